//! Adapter interfaces for the remote learning platform.
//!
//! The processor only talks to the platform through these traits. Transport
//! failures are caught inside the adapter and surfaced as `ServiceError`,
//! never as panics.

pub mod coursera;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::CourseHierarchy;

// Re-export the Coursera adapter
pub use coursera::{CourseraClient, SessionCookie};

/// Errors surfaced by a content service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported item type: {0}")]
    UnsupportedItemType(String),
}

impl ServiceError {
    /// Failures worth trying again on a later run
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Source of course structure and the completion call
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Human-readable service name
    fn name(&self) -> &str;

    /// Fetch the module/lesson/item hierarchy of a course
    async fn get_course_data(&self, course_slug: &str) -> Result<CourseHierarchy, ServiceError>;

    /// Ordered course slugs of a specialization
    async fn get_specialization_courses(&self, spec_slug: &str)
        -> Result<Vec<String>, ServiceError>;

    /// Mark one item completed. `Ok(true)` means the service confirmed it.
    async fn bypass_item(
        &self,
        item_id: &str,
        item_type: &str,
        course_id: &str,
        course_slug: &str,
        user_id: &str,
    ) -> Result<bool, ServiceError>;
}

/// Resolves the authenticated user
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_user_id(&self) -> Result<String, ServiceError>;
}
