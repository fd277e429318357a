//! Domain types for courscape.
//!
//! This module contains the core data structures:
//! - ContentMap: Persisted module/lesson/item tree with item statuses
//! - CourseHierarchy: Id-indexed hierarchy as delivered by the service
//! - ProgressSummary: Aggregate counts over a map
//! - Reports: Per-course and per-specialization outcomes

pub mod content_map;
pub mod hierarchy;
pub mod report;
pub mod summary;

// Re-export commonly used types
pub use content_map::{ContentKey, ContentMap, Item, ItemPosition, ItemStatus, Lesson, Module};
pub use hierarchy::{CourseHierarchy, HierarchyItem, HierarchyLesson, HierarchyModule};
pub use report::{
    BatchReport, ContentReport, CourseFailure, CourseReport, SpecializationReport, SuccessPolicy,
};
pub use summary::{progress_percent, summarize, ProgressSummary};
