//! Course processor: walks content maps and completes skippable items.
//!
//! Execution is strictly sequential. For every queued item the processor
//! persists `processing`, makes one completion call, then persists the
//! terminal status, so the progress file on disk is the checkpoint a later
//! run resumes from. Items already completed or failed are never revisited.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::{ContentService, IdentityProvider, ServiceError};
use crate::domain::{
    BatchReport, ContentKey, ContentReport, CourseFailure, CourseHierarchy, CourseReport, Item,
    ItemPosition, ItemStatus, SpecializationReport, SuccessPolicy,
};

use super::builder::build_content_map;
use super::classification::{ClassificationPolicy, ItemClass};
use super::progress_store::{ProgressSession, ProgressStore, StoreError};
use super::skip_list::SkipList;

/// Errors that stop a single course or specialization
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Processor is not set up: no user id")]
    NotSetUp,

    #[error("Nothing to process: no course or specialization given")]
    NoTarget,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No modules found in course data for {0}")]
    MissingStructure(String),

    #[error("Content service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Progress store error: {0}")]
    Store(#[from] StoreError),
}

impl ProcessError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::MissingStructure(_) | Self::Service(ServiceError::NotFound(_))
        )
    }

    pub fn is_transient(&self) -> bool {
        match self {
            Self::Service(e) => e.is_transient(),
            Self::Store(StoreError::Locked(_)) => true,
            _ => false,
        }
    }

    fn from_service(slug: &str, error: ServiceError) -> Self {
        match error {
            ServiceError::NotFound(_) => Self::NotFound(slug.to_string()),
            other => Self::Service(other),
        }
    }
}

/// Knobs for a processing run
#[derive(Debug, Clone, Default)]
pub struct ProcessorSettings {
    /// Which item types are completed automatically
    pub policy: ClassificationPolicy,

    /// How course and specialization success is judged
    pub success_policy: SuccessPolicy,

    /// Put items stuck in `processing` by an interrupted run back in the queue
    pub requeue_stale: bool,

    /// Ignore stored progress and rebuild every map
    pub reset_progress: bool,

    /// Reclassify resumed maps against `policy` before walking them
    pub update_types: bool,
}

impl ProcessorSettings {
    pub fn new(policy: ClassificationPolicy) -> Self {
        Self {
            policy,
            requeue_stale: true,
            ..Default::default()
        }
    }
}

/// Walks courses and specializations against a content service
pub struct CourseProcessor<S> {
    service: S,
    store: ProgressStore,
    settings: ProcessorSettings,
    skip_list: SkipList,
    user_id: Option<String>,
}

impl<S: ContentService> CourseProcessor<S> {
    pub fn new(service: S, store: ProgressStore, settings: ProcessorSettings) -> Self {
        Self {
            service,
            store,
            settings,
            skip_list: SkipList::new(),
            user_id: None,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn skip_list(&self) -> &SkipList {
        &self.skip_list
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Resolve the user and register skip lists. Returns false when no
    /// user id could be obtained.
    #[instrument(skip_all)]
    pub async fn setup<I>(
        &mut self,
        identity: &I,
        skip_courses: &[String],
        skip_specs: &[String],
    ) -> bool
    where
        I: IdentityProvider + ?Sized,
    {
        self.skip_list.add_courses(skip_courses);
        self.skip_list.add_specializations(skip_specs);

        match identity.get_user_id().await {
            Ok(user_id) if !user_id.trim().is_empty() => {
                debug!(%user_id, "Resolved user");
                self.user_id = Some(user_id);
                true
            }
            Ok(_) => {
                error!("Content service returned an empty user id");
                false
            }
            Err(e) => {
                error!(error = %e, "Error getting user ID");
                false
            }
        }
    }

    /// Process a specialization (takes precedence) or a single course
    pub async fn process_content(
        &self,
        course_slug: Option<&str>,
        spec_slug: Option<&str>,
    ) -> Result<ContentReport, ProcessError> {
        if let Some(spec_slug) = spec_slug {
            if self.skip_list.skips_specialization(spec_slug) {
                info!("Skipping specialization: {}", spec_slug);
                return Ok(ContentReport::Skipped {
                    slug: spec_slug.to_string(),
                });
            }
            return self
                .process_specialization(spec_slug)
                .await
                .map(ContentReport::Specialization);
        }

        if let Some(course_slug) = course_slug {
            if self.skip_list.skips_course(course_slug) {
                info!("Skipping course: {}", course_slug);
                return Ok(ContentReport::Skipped {
                    slug: course_slug.to_string(),
                });
            }
            return self
                .process_course(course_slug, None)
                .await
                .map(ContentReport::Course);
        }

        Err(ProcessError::NoTarget)
    }

    /// Process every course of a specialization, continuing past failures
    #[instrument(skip(self), fields(spec = %spec_slug))]
    pub async fn process_specialization(
        &self,
        spec_slug: &str,
    ) -> Result<SpecializationReport, ProcessError> {
        if self.user_id.is_none() {
            return Err(ProcessError::NotSetUp);
        }

        info!("[Specialization] {}", spec_slug);
        let course_slugs = self
            .service
            .get_specialization_courses(spec_slug)
            .await
            .map_err(|e| {
                error!(error = %e, "Error getting specialization courses");
                ProcessError::from_service(spec_slug, e)
            })?;

        if course_slugs.is_empty() {
            error!("No courses found in specialization");
            return Err(ProcessError::NotFound(spec_slug.to_string()));
        }

        info!("Found {} courses", course_slugs.len());
        let mut report = SpecializationReport::new(spec_slug);

        for (i, course_slug) in course_slugs.iter().enumerate() {
            if self.skip_list.skips_course(course_slug) {
                info!("Skipping course: {}", course_slug);
                report.skipped.push(course_slug.clone());
                continue;
            }

            info!("  Course {}/{}: {}", i + 1, course_slugs.len(), course_slug);
            match self.process_course(course_slug, Some(spec_slug)).await {
                Ok(course_report) => report.courses.push(course_report),
                Err(e) => {
                    error!(course = %course_slug, error = %e, "Course failed");
                    report.failures.push(CourseFailure {
                        course_slug: course_slug.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Process one course, optionally within a specialization namespace
    #[instrument(skip(self), fields(course = %course_slug))]
    pub async fn process_course(
        &self,
        course_slug: &str,
        spec_slug: Option<&str>,
    ) -> Result<CourseReport, ProcessError> {
        let user_id = self.user_id.as_deref().ok_or(ProcessError::NotSetUp)?;

        let hierarchy = self
            .service
            .get_course_data(course_slug)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to get course data for {}", course_slug);
                ProcessError::from_service(course_slug, e)
            })?;

        if !hierarchy.has_modules() {
            error!("No modules found in course data");
            return Err(ProcessError::MissingStructure(course_slug.to_string()));
        }

        debug!(
            "Found {} modules, {} lessons, {} items",
            hierarchy.modules().len(),
            hierarchy.lesson_count(),
            hierarchy.item_count()
        );

        let key = match spec_slug {
            Some(spec) => ContentKey::in_specialization(user_id, course_slug, spec),
            None => ContentKey::course(user_id, course_slug),
        };

        let policy = &self.settings.policy;
        let mut session = self
            .store
            .open(&key, self.settings.reset_progress, || {
                build_content_map(&key, &hierarchy, policy)
            })
            .await?;

        let mut report = CourseReport {
            course_slug: course_slug.to_string(),
            specialization_slug: spec_slug.map(str::to_string),
            resumed: session.is_resumed(),
            attempted: 0,
            completed: 0,
            failed: 0,
            requeued: 0,
            save_failures: 0,
            summary: session.summary(),
        };

        if session.is_resumed() {
            if self.settings.requeue_stale {
                report.requeued = session.requeue_processing();
                if report.requeued > 0 {
                    warn!(
                        requeued = report.requeued,
                        "Re-queued items left in processing by an interrupted run"
                    );
                    self.persist(&mut session, &mut report).await;
                }
            }

            if self.settings.update_types && !session.update_skippable_status(policy).await {
                report.save_failures += 1;
            }
        } else {
            self.persist(&mut session, &mut report).await;
        }

        info!(summary = %session.summary(), "Starting content processing...");
        self.traverse(&mut session, &hierarchy, user_id, &mut report)
            .await;

        report.summary = session.summary();
        info!(summary = %report.summary, "Finished course");
        Ok(report)
    }

    /// Process specializations, then courses, counting outcomes. Failures of
    /// one target never stop the batch.
    pub async fn process_targets(&self, courses: &[String], specs: &[String]) -> BatchReport {
        let mut batch = BatchReport::new();
        let policy = self.settings.success_policy;

        let specs: Vec<&str> = trimmed(specs);
        if !specs.is_empty() {
            info!("Processing {} specializations", specs.len());
        }
        for (i, spec) in specs.iter().copied().enumerate() {
            info!(run_id = %batch.run_id, "Specialization {}/{}: {}", i + 1, specs.len(), spec);
            let outcome = self.process_content(None, Some(spec)).await;
            self.record_outcome(&mut batch, outcome, policy);
        }

        let courses: Vec<&str> = trimmed(courses);
        if !courses.is_empty() {
            info!("Processing {} courses", courses.len());
        }
        for (i, course) in courses.iter().copied().enumerate() {
            info!(run_id = %batch.run_id, "Course {}/{}: {}", i + 1, courses.len(), course);
            let outcome = self.process_content(Some(course), None).await;
            self.record_outcome(&mut batch, outcome, policy);
        }

        info!(
            "Processed {} items successfully, {} failed, {} skipped",
            batch.processed, batch.failed, batch.skipped
        );
        batch
    }

    fn record_outcome(
        &self,
        batch: &mut BatchReport,
        outcome: Result<ContentReport, ProcessError>,
        policy: SuccessPolicy,
    ) {
        match outcome {
            Ok(ContentReport::Skipped { .. }) => batch.record_skipped(),
            Ok(report) => batch.record(report.is_success(policy)),
            Err(e) => {
                error!(error = %e, transient = e.is_transient(), "Processing failed");
                batch.record(false);
            }
        }
    }

    /// Drive every queued item of the session through one completion attempt.
    ///
    /// Only lessons with queued work are walked. Deferred items in those
    /// lessons are listed inline as work to do by hand.
    async fn traverse(
        &self,
        session: &mut ProgressSession<'_>,
        hierarchy: &CourseHierarchy,
        user_id: &str,
        report: &mut CourseReport,
    ) {
        let active_lessons: HashSet<(usize, usize)> = session
            .queued_positions()
            .into_iter()
            .map(|pos| (pos.module, pos.lesson))
            .collect();
        let module_count = session.map().modules.len();

        for m in 0..module_count {
            let mut module_announced = false;
            let lesson_count = session.map().modules[m].lessons.len();

            for l in 0..lesson_count {
                if !active_lessons.contains(&(m, l)) {
                    continue;
                }

                let module = &session.map().modules[m];
                if !module_announced {
                    info!("    [Module {}/{}] {}", m + 1, module_count, module.name);
                    module_announced = true;
                }
                let lesson = &module.lessons[l];
                info!("      [Lesson] {}", lesson.name);
                let item_count = lesson.items.len();

                for i in 0..item_count {
                    let pos = ItemPosition {
                        module: m,
                        lesson: l,
                        item: i,
                    };
                    // Re-read: a shared item may have been settled in an earlier lesson
                    let Some(item) = session.map().item_at(pos).cloned() else {
                        continue;
                    };

                    if item.is_queued() {
                        self.complete_item(session, hierarchy, user_id, &item, report)
                            .await;
                    } else if !item.skippable
                        && self.settings.policy.class_of(&item.item_type) == ItemClass::Deferred
                    {
                        info!("        ⚠ Work later: [{}] {}", item.item_type, item.name);
                    }
                }
            }
        }
    }

    /// One completion attempt: persist `processing`, call the service,
    /// persist the terminal status
    async fn complete_item(
        &self,
        session: &mut ProgressSession<'_>,
        hierarchy: &CourseHierarchy,
        user_id: &str,
        item: &Item,
        report: &mut CourseReport,
    ) {
        self.set_status(session, item, ItemStatus::Processing, report)
            .await;

        report.attempted += 1;
        let confirmed = match self
            .service
            .bypass_item(
                &item.id,
                &item.item_type,
                &hierarchy.course_id,
                &report.course_slug,
                user_id,
            )
            .await
        {
            Ok(confirmed) => confirmed,
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "Completion call failed");
                false
            }
        };

        let status = if confirmed {
            ItemStatus::Completed
        } else {
            ItemStatus::Failed
        };
        self.set_status(session, item, status, report).await;

        if confirmed {
            report.completed += 1;
            info!("        ✓ [{}] {}", item.item_type, item.name);
        } else {
            report.failed += 1;
            error!("        ✗ Failed to process [{}] {}", item.item_type, item.name);
        }
        debug!(item_id = %item.id, item_type = %item.item_type, "Item details");
    }

    async fn set_status(
        &self,
        session: &mut ProgressSession<'_>,
        item: &Item,
        status: ItemStatus,
        report: &mut CourseReport,
    ) {
        if !session.update_item_status(&item.id, status) {
            warn!(item_id = %item.id, ?status, "No skippable item to update");
        }
        self.persist(session, report).await;
    }

    async fn persist(&self, session: &mut ProgressSession<'_>, report: &mut CourseReport) {
        if !session.save().await {
            report.save_failures += 1;
        }
    }
}

fn trimmed(entries: &[String]) -> Vec<&str> {
    entries
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .collect()
}
