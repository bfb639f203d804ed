//! # TraitScope Common Library
//!
//! Shared code for the TraitScope scoring workspace including:
//! - Trait enumeration and score level buckets
//! - Archetype catalog (5 fixed behavioral archetypes)
//! - Item → trait definition table and the versioned reverse-scored item table
//! - Configuration loading (TOML bootstrap with priority resolution)
//! - Logging initialization

pub mod archetypes;
pub mod config;
pub mod definitions;
pub mod error;
pub mod logging;
pub mod traits;

pub use archetypes::{ArchetypeCatalog, ArchetypeDefinition, ArchetypeId};
pub use definitions::{DefinitionSet, ReverseScoredItems, TraitDefinitionTable};
pub use error::{Error, Result};
pub use traits::{ScoreLevel, Trait};
