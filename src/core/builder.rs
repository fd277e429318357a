//! Builds a content map from a course hierarchy.

use tracing::debug;

use crate::domain::{
    ContentKey, ContentMap, CourseHierarchy, Item, ItemStatus, Lesson, Module,
};

use super::classification::ClassificationPolicy;

/// Type recorded for items the service sent without a type tag
pub const UNKNOWN_TYPE: &str = "unknown";

/// Name recorded for items the service sent without a name
pub const UNNAMED_ITEM: &str = "Unnamed";

/// Convert a hierarchy into a content map.
///
/// Modules, lessons and items keep the order of the hierarchy's reference
/// lists. Dangling lesson or item ids are skipped. Lessons left without
/// items and modules left without lessons are dropped. Skippable items
/// start `queued`; everything else carries no status.
pub fn build_content_map(
    key: &ContentKey,
    hierarchy: &CourseHierarchy,
    policy: &ClassificationPolicy,
) -> ContentMap {
    let mut map = ContentMap::new(key);

    for source_module in hierarchy.modules() {
        let mut module = Module {
            id: source_module.id.clone(),
            name: source_module.name.clone(),
            lessons: Vec::new(),
        };

        for lesson_id in &source_module.lesson_ids {
            let Some(source_lesson) = hierarchy.lesson(lesson_id) else {
                debug!(%lesson_id, "Skipping dangling lesson reference");
                continue;
            };

            let items: Vec<Item> = source_lesson
                .item_ids
                .iter()
                .filter_map(|item_id| hierarchy.item(item_id))
                .map(|source_item| {
                    let item_type = source_item
                        .type_name
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
                    let skippable = policy.is_skippable(&item_type);
                    Item {
                        id: source_item.id.clone(),
                        name: source_item
                            .name
                            .clone()
                            .unwrap_or_else(|| UNNAMED_ITEM.to_string()),
                        item_type,
                        skippable,
                        status: skippable.then_some(ItemStatus::Queued),
                    }
                })
                .collect();

            if !items.is_empty() {
                module.lessons.push(Lesson {
                    id: source_lesson.id.clone(),
                    name: source_lesson.name.clone(),
                    items,
                });
            }
        }

        if !module.lessons.is_empty() {
            map.modules.push(module);
        }
    }

    map
}
