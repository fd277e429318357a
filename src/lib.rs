//! courscape - Resumable course walker
//!
//! Walks a learning platform's course structure (modules, lessons, items)
//! and marks eligible items as completed, surviving interruption across
//! runs.
//!
//! # Architecture
//!
//! The system is built around a persisted content map per course:
//! - The remote hierarchy is converted into an ordered module/lesson/item tree
//! - Each skippable item moves through queued, processing, completed or failed
//! - Every transition is written to disk before the next remote call
//! - Later runs resume from the stored map and only touch queued items
//!
//! # Modules
//!
//! - `adapters`: Content service and identity traits, Coursera client
//! - `core`: Classification, map builder, progress store, processor
//! - `domain`: Data structures (ContentMap, CourseHierarchy, reports)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Process a course
//! courscape run --course machine-learning
//!
//! # Process every course of a specialization, starting over
//! courscape run --spec deep-learning --reset-progress
//!
//! # Show stored progress
//! courscape status
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{ContentService, CourseraClient, IdentityProvider, ServiceError};
pub use core::{ClassificationPolicy, CourseProcessor, ProcessError, ProcessorSettings, ProgressStore};
pub use domain::{ContentKey, ContentMap, ContentReport, CourseReport, ItemStatus, ProgressSummary};
