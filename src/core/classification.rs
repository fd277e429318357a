//! Classification of content items by their type tag.
//!
//! The policy is plain data handed to the builder and the reclassifier.
//! Changing it between runs and reclassifying a stored map changes which
//! items are targeted without rebuilding the map.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// What the processor does with an item of a given type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemClass {
    /// Completed automatically
    Skippable,

    /// Needs real work later; listed but never transitioned
    Deferred,

    /// Neither targeted nor listed
    Ignored,
}

/// Type sets that drive classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationPolicy {
    /// Types eligible for automated completion
    #[serde(default = "default_skippable_types")]
    pub skippable_types: BTreeSet<String>,

    /// Types that are reported as work for later
    #[serde(default = "default_deferred_types")]
    pub deferred_types: BTreeSet<String>,
}

fn default_skippable_types() -> BTreeSet<String> {
    ["lecture", "discussionPrompt", "supplement"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_deferred_types() -> BTreeSet<String> {
    [
        "exam",
        "gradedLti",
        "gradedProgramming",
        "peer",
        "phasedPeer",
        "staffGraded",
        "ungradedLti",
        "ungradedProgramming",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self {
            skippable_types: default_skippable_types(),
            deferred_types: default_deferred_types(),
        }
    }
}

impl ClassificationPolicy {
    pub fn new<S, D>(skippable: S, deferred: D) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            skippable_types: skippable.into_iter().map(Into::into).collect(),
            deferred_types: deferred.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_skippable(&self, item_type: &str) -> bool {
        classify(item_type, &self.skippable_types)
    }

    /// Skippable wins when a type appears in both sets
    pub fn class_of(&self, item_type: &str) -> ItemClass {
        if self.is_skippable(item_type) {
            ItemClass::Skippable
        } else if self.deferred_types.contains(item_type) {
            ItemClass::Deferred
        } else {
            ItemClass::Ignored
        }
    }
}

/// Whether `item_type` belongs to the skippable set
pub fn classify(item_type: &str, skippable_types: &BTreeSet<String>) -> bool {
    skippable_types.contains(item_type)
}
