//! Shared fixtures: an in-memory content service and hierarchy builders.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use courscape::adapters::{ContentService, IdentityProvider, ServiceError};
use courscape::core::{ClassificationPolicy, CourseProcessor, ProcessorSettings, ProgressStore};
use courscape::domain::{CourseHierarchy, HierarchyItem, HierarchyLesson, HierarchyModule};
use tempfile::TempDir;

pub const USER_ID: &str = "1001";

#[derive(Default)]
struct FakeState {
    courses: HashMap<String, CourseHierarchy>,
    specializations: HashMap<String, Vec<String>>,
    rejected_items: HashSet<String>,
    erroring_items: HashSet<String>,
    unavailable_courses: HashSet<String>,
    calls: Vec<String>,
}

/// Content service backed by in-memory hierarchies. Clones share state.
#[derive(Clone, Default)]
pub struct FakeService {
    state: Arc<Mutex<FakeState>>,
    user_id: Option<String>,
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            user_id: Some(USER_ID.to_string()),
        }
    }

    /// A service whose identity lookup fails
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_course(self, slug: &str, hierarchy: CourseHierarchy) -> Self {
        self.state.lock().unwrap().courses.insert(slug.to_string(), hierarchy);
        self
    }

    pub fn with_specialization(self, slug: &str, courses: &[&str]) -> Self {
        self.state.lock().unwrap().specializations.insert(
            slug.to_string(),
            courses.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// Completion calls for this item return `Ok(false)`
    pub fn rejecting(self, item_id: &str) -> Self {
        self.state.lock().unwrap().rejected_items.insert(item_id.to_string());
        self
    }

    /// Completion calls for this item return a transient error
    pub fn erroring(self, item_id: &str) -> Self {
        self.state.lock().unwrap().erroring_items.insert(item_id.to_string());
        self
    }

    /// Course data requests for this course fail transiently
    pub fn unavailable(self, course_slug: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .unavailable_courses
            .insert(course_slug.to_string());
        self
    }

    pub fn accept_all(&self) {
        let mut state = self.state.lock().unwrap();
        state.rejected_items.clear();
        state.erroring_items.clear();
    }

    /// Item ids passed to `bypass_item`, in call order
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }
}

#[async_trait]
impl ContentService for FakeService {
    fn name(&self) -> &str {
        "fake"
    }

    async fn get_course_data(&self, course_slug: &str) -> Result<CourseHierarchy, ServiceError> {
        let state = self.state.lock().unwrap();
        if state.unavailable_courses.contains(course_slug) {
            return Err(ServiceError::Transient(format!("{} timed out", course_slug)));
        }
        state
            .courses
            .get(course_slug)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(course_slug.to_string()))
    }

    async fn get_specialization_courses(
        &self,
        spec_slug: &str,
    ) -> Result<Vec<String>, ServiceError> {
        self.state
            .lock()
            .unwrap()
            .specializations
            .get(spec_slug)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(spec_slug.to_string()))
    }

    async fn bypass_item(
        &self,
        item_id: &str,
        _item_type: &str,
        _course_id: &str,
        _course_slug: &str,
        _user_id: &str,
    ) -> Result<bool, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(item_id.to_string());
        if state.erroring_items.contains(item_id) {
            return Err(ServiceError::Transient(format!("{} timed out", item_id)));
        }
        Ok(!state.rejected_items.contains(item_id))
    }
}

#[async_trait]
impl IdentityProvider for FakeService {
    async fn get_user_id(&self) -> Result<String, ServiceError> {
        self.user_id
            .clone()
            .ok_or_else(|| ServiceError::Unauthorized("no session".to_string()))
    }
}

/// Hierarchy with one lesson per module. Each entry is
/// `(module name, [(item id, type)])`.
pub fn hierarchy(course_id: &str, modules: &[(&str, Vec<(&str, &str)>)]) -> CourseHierarchy {
    let mut hierarchy = CourseHierarchy::new(course_id);
    for (m, (module_name, items)) in modules.iter().enumerate() {
        let lesson_id = format!("{}-l{}", course_id, m + 1);
        hierarchy.add_module(HierarchyModule {
            id: format!("{}-m{}", course_id, m + 1),
            name: module_name.to_string(),
            lesson_ids: vec![lesson_id.clone()],
        });
        hierarchy.add_lesson(HierarchyLesson {
            id: lesson_id,
            name: format!("Lesson {}", m + 1),
            item_ids: items.iter().map(|(id, _)| id.to_string()).collect(),
        });
        for (id, item_type) in items.iter() {
            hierarchy.add_item(HierarchyItem {
                id: id.to_string(),
                name: Some(format!("Item {}", id)),
                type_name: Some(item_type.to_string()),
            });
        }
    }
    hierarchy
}

/// Two modules, each `[A: lecture, B: supplement, C: exam]`
pub fn two_module_course(course_id: &str) -> CourseHierarchy {
    hierarchy(
        course_id,
        &[
            ("Week 1", vec![("a1", "lecture"), ("b1", "supplement"), ("c1", "exam")]),
            ("Week 2", vec![("a2", "lecture"), ("b2", "supplement"), ("c2", "exam")]),
        ],
    )
}

/// Skippable = {lecture, supplement}
pub fn lecture_supplement_policy() -> ClassificationPolicy {
    ClassificationPolicy::new(["lecture", "supplement"], ["exam"])
}

pub fn settings() -> ProcessorSettings {
    ProcessorSettings::new(lecture_supplement_policy())
}

/// Processor with a resolved user, storing progress under `temp`
pub async fn processor(
    service: &FakeService,
    temp: &TempDir,
    settings: ProcessorSettings,
) -> CourseProcessor<FakeService> {
    let store = ProgressStore::new(temp.path());
    let mut processor = CourseProcessor::new(service.clone(), store, settings);
    assert!(processor.setup(service, &[], &[]).await);
    processor
}
