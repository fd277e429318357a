//! Course hierarchy as delivered by the content service.
//!
//! The service returns three flat collections: modules in order, plus
//! lessons and items addressed by id. Modules list lesson ids and lessons
//! list item ids. The hierarchy keeps each record once in an arena and
//! resolves references through id indexes, so an item referenced from
//! several lessons is never duplicated.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyModule {
    pub id: String,
    pub name: String,
    /// Ordered references into the lesson arena
    pub lesson_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyLesson {
    pub id: String,
    pub name: String,
    /// Ordered references into the item arena
    pub item_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyItem {
    pub id: String,
    pub name: Option<String>,
    /// Content-type tag, if the service reported one
    pub type_name: Option<String>,
}

/// Id-indexed course hierarchy
#[derive(Debug, Clone, Default)]
pub struct CourseHierarchy {
    /// Service-side course id (some completion endpoints want it instead of the slug)
    pub course_id: String,

    modules: Vec<HierarchyModule>,
    lessons: Vec<HierarchyLesson>,
    items: Vec<HierarchyItem>,
    lesson_index: HashMap<String, usize>,
    item_index: HashMap<String, usize>,
}

impl CourseHierarchy {
    pub fn new(course_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            ..Default::default()
        }
    }

    /// Append a module (modules keep insertion order)
    pub fn add_module(&mut self, module: HierarchyModule) {
        self.modules.push(module);
    }

    /// Add a lesson to the arena. A later lesson with the same id wins.
    pub fn add_lesson(&mut self, lesson: HierarchyLesson) {
        match self.lesson_index.get(&lesson.id) {
            Some(&idx) => self.lessons[idx] = lesson,
            None => {
                self.lesson_index.insert(lesson.id.clone(), self.lessons.len());
                self.lessons.push(lesson);
            }
        }
    }

    /// Add an item to the arena. A later item with the same id wins.
    pub fn add_item(&mut self, item: HierarchyItem) {
        match self.item_index.get(&item.id) {
            Some(&idx) => self.items[idx] = item,
            None => {
                self.item_index.insert(item.id.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    pub fn modules(&self) -> &[HierarchyModule] {
        &self.modules
    }

    /// Resolve a lesson reference; dangling ids yield None
    pub fn lesson(&self, id: &str) -> Option<&HierarchyLesson> {
        self.lesson_index.get(id).map(|&idx| &self.lessons[idx])
    }

    /// Resolve an item reference; dangling ids yield None
    pub fn item(&self, id: &str) -> Option<&HierarchyItem> {
        self.item_index.get(id).map(|&idx| &self.items[idx])
    }

    pub fn has_modules(&self) -> bool {
        !self.modules.is_empty()
    }

    pub fn lesson_count(&self) -> usize {
        self.lessons.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
