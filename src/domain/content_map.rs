//! Content map: the persisted, ordered tree of modules, lessons and items.
//!
//! One map exists per (user, course, optional specialization). The tree
//! mirrors the order of the remote hierarchy and is never re-sorted; item
//! statuses are mutated in place as the processor drives them.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::paths::{COURSES_DIR, SPECS_DIR};
use crate::core::classification::ClassificationPolicy;

/// Identity of a content map: who it belongs to and what it covers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey {
    pub user_id: String,
    pub course_slug: String,
    pub specialization_slug: Option<String>,
}

impl ContentKey {
    /// Key for a course processed on its own
    pub fn course(user_id: impl Into<String>, course_slug: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            course_slug: course_slug.into(),
            specialization_slug: None,
        }
    }

    /// Key for a course processed as part of a specialization
    pub fn in_specialization(
        user_id: impl Into<String>,
        course_slug: impl Into<String>,
        specialization_slug: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            course_slug: course_slug.into(),
            specialization_slug: Some(specialization_slug.into()),
        }
    }

    /// Document path relative to the progress root.
    ///
    /// `{user}/courses/{course}.json` or `{user}/specs/{spec}/{course}.json`
    pub fn relative_path(&self) -> PathBuf {
        let file_name = format!("{}.json", self.course_slug);
        let user_dir = PathBuf::from(&self.user_id);
        match &self.specialization_slug {
            Some(spec) => user_dir.join(SPECS_DIR).join(spec).join(file_name),
            None => user_dir.join(COURSES_DIR).join(file_name),
        }
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.specialization_slug {
            Some(spec) => write!(f, "{}/{}", spec, self.course_slug),
            None => write!(f, "{}", self.course_slug),
        }
    }
}

/// Completion state of a skippable item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting to be completed
    Queued,

    /// A completion call is in flight (or a previous run died during one)
    Processing,

    /// The service confirmed completion
    Completed,

    /// The completion attempt did not succeed
    Failed,
}

impl ItemStatus {
    /// Terminal statuses are never revisited by the processor
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A single content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,

    pub name: String,

    /// Content-type tag reported by the service (e.g. "lecture")
    #[serde(rename = "type")]
    pub item_type: String,

    /// Whether the active policy targets this item for completion
    #[serde(default)]
    pub skippable: bool,

    /// Present once the item has ever been skippable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
}

impl Item {
    /// Skippable and waiting for a completion attempt
    pub fn is_queued(&self) -> bool {
        self.skippable && self.status == Some(ItemStatus::Queued)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

/// Position of an item inside the tree (module, lesson, item indexes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemPosition {
    pub module: usize,
    pub lesson: usize,
    pub item: usize,
}

/// Persisted progress document for one course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMap {
    pub user_id: String,

    pub course_slug: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization_slug: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub modules: Vec<Module>,
}

impl ContentMap {
    /// Create an empty map for an identity key
    pub fn new(key: &ContentKey) -> Self {
        let now = Utc::now();
        Self {
            user_id: key.user_id.clone(),
            course_slug: key.course_slug.clone(),
            specialization_slug: key.specialization_slug.clone(),
            created_at: now,
            updated_at: now,
            modules: Vec::new(),
        }
    }

    /// Identity key of this map
    pub fn key(&self) -> ContentKey {
        ContentKey {
            user_id: self.user_id.clone(),
            course_slug: self.course_slug.clone(),
            specialization_slug: self.specialization_slug.clone(),
        }
    }

    /// Iterate every item in tree order
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.modules
            .iter()
            .flat_map(|m| m.lessons.iter())
            .flat_map(|l| l.items.iter())
    }

    fn items_mut(&mut self) -> impl Iterator<Item = &mut Item> {
        self.modules
            .iter_mut()
            .flat_map(|m| m.lessons.iter_mut())
            .flat_map(|l| l.items.iter_mut())
    }

    /// Find an item by id (first match in tree order)
    pub fn find_item(&self, item_id: &str) -> Option<&Item> {
        self.items().find(|i| i.id == item_id)
    }

    /// Get the item at a position
    pub fn item_at(&self, pos: ItemPosition) -> Option<&Item> {
        self.modules
            .get(pos.module)?
            .lessons
            .get(pos.lesson)?
            .items
            .get(pos.item)
    }

    /// Set the status of every skippable item with this id.
    ///
    /// An item referenced from several lessons appears once per lesson; all
    /// copies share one status. Returns false when no skippable item
    /// matches; non-skippable items are never given a status this way.
    pub fn update_item_status(&mut self, item_id: &str, status: ItemStatus) -> bool {
        let mut updated = false;
        for item in self.items_mut().filter(|i| i.id == item_id && i.skippable) {
            item.status = Some(status);
            updated = true;
        }
        updated
    }

    /// Positions of all queued items, in map order
    pub fn queued_positions(&self) -> Vec<ItemPosition> {
        let mut positions = Vec::new();
        for (m, module) in self.modules.iter().enumerate() {
            for (l, lesson) in module.lessons.iter().enumerate() {
                for (i, item) in lesson.items.iter().enumerate() {
                    if item.is_queued() {
                        positions.push(ItemPosition {
                            module: m,
                            lesson: l,
                            item: i,
                        });
                    }
                }
            }
        }
        positions
    }

    /// Recompute `skippable` for every item against a policy.
    ///
    /// Items that become skippable without a status are queued. Items that
    /// stop being skippable keep whatever status they had, so completion
    /// history survives policy changes. Returns the number of items whose
    /// skippable flag flipped.
    pub fn reclassify(&mut self, policy: &ClassificationPolicy) -> usize {
        let mut changed = 0;
        for item in self.items_mut() {
            let should_skip = policy.is_skippable(&item.item_type);
            if item.skippable == should_skip {
                continue;
            }
            item.skippable = should_skip;
            changed += 1;
            if should_skip && item.status.is_none() {
                item.status = Some(ItemStatus::Queued);
            }
        }
        changed
    }

    /// Put items left in `processing` back into the queue.
    ///
    /// Returns how many items were re-queued.
    pub fn requeue_processing(&mut self) -> usize {
        let mut requeued = 0;
        for item in self.items_mut() {
            if item.skippable && item.status == Some(ItemStatus::Processing) {
                item.status = Some(ItemStatus::Queued);
                requeued += 1;
            }
        }
        requeued
    }

    /// Give every skippable item without a status the `queued` status.
    ///
    /// Hand-edited or older documents can lack it; returns how many were fixed.
    pub fn normalize(&mut self) -> usize {
        let mut fixed = 0;
        for item in self.items_mut() {
            if item.skippable && item.status.is_none() {
                item.status = Some(ItemStatus::Queued);
                fixed += 1;
            }
        }
        fixed
    }

    /// Refresh the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
