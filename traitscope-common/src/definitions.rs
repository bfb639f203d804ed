//! Item definition tables
//!
//! Two read-only tables drive the scoring pipeline:
//! - [`TraitDefinitionTable`]: questionnaire statement → 1-2 trait codes
//! - [`ReverseScoredItems`]: the single, versioned list of negatively phrased
//!   statements whose encoded codes are mirrored
//!
//! Both are loaded together as a [`DefinitionSet`], either from the embedded
//! default file or from an external TOML file with the same schema:
//!
//! ```toml
//! [reverse_scored]
//! version = "1"
//! items = ["I procrastinate"]
//!
//! [[items]]
//! question = "I meet deadlines"
//! traits = ["A"]
//! ```
//!
//! Statements listed more than once have their trait codes merged. A
//! statement may map to at most two traits after merging.

use crate::traits::Trait;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Embedded default definition file
const DEFAULT_DEFINITIONS: &str = include_str!("../data/default_definitions.toml");

/// Maximum number of traits a single item may load on
pub const MAX_TRAITS_PER_ITEM: usize = 2;

/// One questionnaire statement and the traits it measures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub question: String,
    pub traits: Vec<Trait>,
}

/// Item → trait lookup table
///
/// Entry order follows the definition file (first occurrence wins the slot).
#[derive(Debug, Clone, Default)]
pub struct TraitDefinitionTable {
    entries: Vec<ItemDefinition>,
    index: HashMap<String, usize>,
}

impl TraitDefinitionTable {
    /// Build a table from (question, traits) pairs
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a question is blank, has no traits,
    /// or maps to more than [`MAX_TRAITS_PER_ITEM`] traits after merging.
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<Trait>)>,
        S: Into<String>,
    {
        let mut table = Self::default();

        for (question, traits) in entries {
            let question = question.into().trim().to_string();
            if question.is_empty() {
                return Err(Error::InvalidInput(
                    "definition entry has an empty question".to_string(),
                ));
            }
            if traits.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "item '{}' maps to no traits",
                    question
                )));
            }

            let slot = match table.index.get(&question) {
                Some(&i) => i,
                None => {
                    table.entries.push(ItemDefinition {
                        question: question.clone(),
                        traits: Vec::new(),
                    });
                    let i = table.entries.len() - 1;
                    table.index.insert(question.clone(), i);
                    i
                }
            };

            let entry = &mut table.entries[slot];
            for t in traits {
                if !entry.traits.contains(&t) {
                    entry.traits.push(t);
                }
            }
            if entry.traits.len() > MAX_TRAITS_PER_ITEM {
                return Err(Error::InvalidInput(format!(
                    "item '{}' maps to {} traits (max {})",
                    question,
                    entry.traits.len(),
                    MAX_TRAITS_PER_ITEM
                )));
            }
        }

        Ok(table)
    }

    /// Traits measured by an item, if the item is defined
    pub fn traits_for(&self, question: &str) -> Option<&[Trait]> {
        self.index
            .get(question.trim())
            .map(|&i| self.entries[i].traits.as_slice())
    }

    pub fn contains(&self, question: &str) -> bool {
        self.index.contains_key(question.trim())
    }

    /// Items mapped to a trait, in table order
    pub fn items_for_trait(&self, t: Trait) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.traits.contains(&t))
            .map(|e| e.question.as_str())
            .collect()
    }

    /// Traits with at least one item, in canonical trait order
    pub fn traits_covered(&self) -> Vec<Trait> {
        let covered: BTreeSet<Trait> = self
            .entries
            .iter()
            .flat_map(|e| e.traits.iter().copied())
            .collect();
        covered.into_iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical versioned list of reverse-scored items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReverseScoredItems {
    pub version: String,
    pub items: BTreeSet<String>,
}

impl ReverseScoredItems {
    pub fn new(version: impl Into<String>, items: impl IntoIterator<Item = String>) -> Self {
        Self {
            version: version.into(),
            items: items.into_iter().map(|s| s.trim().to_string()).collect(),
        }
    }

    pub fn contains(&self, question: &str) -> bool {
        self.items.contains(question.trim())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// On-disk schema of a definition file
#[derive(Debug, Deserialize)]
struct DefinitionFile {
    #[serde(default)]
    reverse_scored: Option<ReverseScoredSection>,
    #[serde(default)]
    items: Vec<ItemSection>,
}

#[derive(Debug, Deserialize)]
struct ReverseScoredSection {
    version: String,
    #[serde(default)]
    items: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ItemSection {
    question: String,
    traits: Vec<String>,
}

/// Trait table plus reverse-scored list, loaded as one unit
#[derive(Debug, Clone)]
pub struct DefinitionSet {
    pub traits: TraitDefinitionTable,
    pub reverse_scored: ReverseScoredItems,
}

impl DefinitionSet {
    pub fn new(traits: TraitDefinitionTable, reverse_scored: ReverseScoredItems) -> Self {
        Self {
            traits,
            reverse_scored,
        }
    }

    /// Definition set compiled into the binary
    ///
    /// # Errors
    ///
    /// Only fails if the embedded file is malformed.
    pub fn embedded() -> Result<Self> {
        Self::from_toml_str(DEFAULT_DEFINITIONS)
    }

    /// Parse a definition file from TOML text
    ///
    /// Trait entries accept codes ("RT") or names ("Risk Taking").
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: DefinitionFile = toml::from_str(content)?;

        let mut entries = Vec::with_capacity(file.items.len());
        for item in file.items {
            let mut traits = Vec::with_capacity(item.traits.len());
            for raw in &item.traits {
                let t = Trait::parse(raw).ok_or_else(|| {
                    Error::Parse(format!(
                        "unknown trait code '{}' for item '{}'",
                        raw, item.question
                    ))
                })?;
                traits.push(t);
            }
            entries.push((item.question, traits));
        }
        let traits = TraitDefinitionTable::from_entries(entries)?;

        let reverse_scored = match file.reverse_scored {
            Some(section) => ReverseScoredItems::new(section.version, section.items),
            None => ReverseScoredItems::new("0", Vec::new()),
        };

        debug!(
            items = traits.len(),
            reverse_scored = reverse_scored.len(),
            version = %reverse_scored.version,
            "Parsed definition set"
        );

        Ok(Self::new(traits, reverse_scored))
    }

    /// Load a definition file from disk
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file does not exist, [`Error::Io`]
    /// on read failure, [`Error::Parse`] / [`Error::InvalidInput`] on bad content.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "definition file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let set = Self::from_toml_str(&content)?;
        info!(path = %path.display(), items = set.traits.len(), "Loaded definition file");
        Ok(set)
    }

    /// External file when given, embedded defaults otherwise
    pub fn load_or_embedded(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::embedded(),
        }
    }
}
