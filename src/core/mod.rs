//! Core processing logic.
//!
//! This module contains:
//! - Classification: Item type policy (skippable / deferred / ignored)
//! - Builder: Hierarchy to content map conversion
//! - ProgressStore: Per-course JSON documents and run sessions
//! - SkipList: Excluded courses and specializations
//! - CourseProcessor: Traversal and completion engine

pub mod builder;
pub mod classification;
pub mod processor;
pub mod progress_store;
pub mod skip_list;

// Re-export commonly used types
pub use builder::build_content_map;
pub use classification::{classify, ClassificationPolicy, ItemClass};
pub use processor::{CourseProcessor, ProcessError, ProcessorSettings};
pub use progress_store::{ProgressLock, ProgressSession, ProgressStore, StoreError};
pub use skip_list::SkipList;
