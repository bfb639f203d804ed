//! Data models shared by the pipeline stages

pub mod profile;
pub mod response_table;

pub use profile::{ArchetypeInsights, ArchetypeScore, PersonTraitProfile, TraitInsight, TraitScore};
pub use response_table::{
    EncodedResponseMatrix, NormalizedResponseTable, RawCell, RawResponseTable, TableInput,
};
