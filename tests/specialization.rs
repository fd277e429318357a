//! Specialization Integration Tests
//!
//! Tests for walking every course of a specialization in its own progress
//! namespace.

mod common;

use common::{hierarchy, processor, settings, two_module_course, FakeService, USER_ID};
use courscape::core::{CourseProcessor, ProgressStore};
use courscape::domain::{ContentKey, ContentReport, ItemStatus, SuccessPolicy};
use tempfile::TempDir;

fn spec_service() -> FakeService {
    FakeService::new()
        .with_course("algebra", two_module_course("algebra"))
        .with_course(
            "geometry",
            hierarchy("geometry", &[("Week 1", vec![("g1", "lecture"), ("g2", "exam")])]),
        )
        .with_specialization("math", &["algebra", "geometry"])
}

#[tokio::test]
async fn test_specialization_progress_is_segregated() {
    let temp = TempDir::new().unwrap();
    let service = spec_service();
    let processor = processor(&service, &temp, settings()).await;

    processor.process_course("algebra", None).await.unwrap();
    let report = processor.process_specialization("math").await.unwrap();

    // The standalone run does not count as progress inside the specialization
    assert_eq!(report.courses.len(), 2);
    assert!(!report.courses[0].resumed);
    assert_eq!(report.courses[0].attempted, 4);
    assert_eq!(service.call_count(), 4 + 4 + 1);

    let user_dir = temp.path().join(USER_ID);
    assert!(user_dir.join("courses").join("algebra.json").exists());
    assert!(user_dir.join("specs").join("math").join("algebra.json").exists());
    assert!(user_dir.join("specs").join("math").join("geometry.json").exists());

    let store = ProgressStore::new(temp.path());
    let map = store
        .load(&ContentKey::in_specialization(USER_ID, "geometry", "math"))
        .await
        .unwrap();
    assert_eq!(map.specialization_slug.as_deref(), Some("math"));
    assert_eq!(map.find_item("g1").unwrap().status, Some(ItemStatus::Completed));
}

#[tokio::test]
async fn test_specialization_continues_past_course_failures() {
    let temp = TempDir::new().unwrap();
    let service = spec_service().with_specialization("math", &["algebra", "missing", "geometry"]);
    let processor = processor(&service, &temp, settings()).await;

    let report = processor.process_specialization("math").await.unwrap();

    assert_eq!(report.courses.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].course_slug, "missing");
    assert!(report.is_success(SuccessPolicy::Lenient));
    assert!(!report.is_success(SuccessPolicy::Strict));
}

#[tokio::test]
async fn test_specialization_skips_listed_courses() {
    let temp = TempDir::new().unwrap();
    let service = spec_service();
    let store = ProgressStore::new(temp.path());
    let mut processor = CourseProcessor::new(service.clone(), store, settings());
    assert!(processor.setup(&service, &["geometry".to_string()], &[]).await);

    let report = processor.process_specialization("math").await.unwrap();

    assert_eq!(report.skipped, vec!["geometry"]);
    assert_eq!(report.courses.len(), 1);
    assert!(!service.calls().contains(&"g1".to_string()));
}

#[tokio::test]
async fn test_skip_listed_specialization() {
    let temp = TempDir::new().unwrap();
    let service = spec_service();
    let store = ProgressStore::new(temp.path());
    let mut processor = CourseProcessor::new(service.clone(), store, settings());
    assert!(processor.setup(&service, &[], &["math".to_string()]).await);

    let report = processor.process_content(None, Some("math")).await.unwrap();

    assert!(matches!(report, ContentReport::Skipped { .. }));
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn test_specialization_takes_precedence_over_course() {
    let temp = TempDir::new().unwrap();
    let service = spec_service();
    let processor = processor(&service, &temp, settings()).await;

    let report = processor
        .process_content(Some("algebra"), Some("math"))
        .await
        .unwrap();

    assert!(matches!(report, ContentReport::Specialization(ref r) if r.courses.len() == 2));
    assert!(!temp.path().join(USER_ID).join("courses").join("algebra.json").exists());
}

#[tokio::test]
async fn test_empty_or_unknown_specialization_is_not_found() {
    let temp = TempDir::new().unwrap();
    let service = spec_service().with_specialization("empty", &[]);
    let processor = processor(&service, &temp, settings()).await;

    assert!(processor.process_specialization("empty").await.unwrap_err().is_not_found());
    assert!(processor.process_specialization("unknown").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_list_reports_every_document() {
    let temp = TempDir::new().unwrap();
    let service = spec_service();
    let processor = processor(&service, &temp, settings()).await;
    processor.process_course("algebra", None).await.unwrap();
    processor.process_specialization("math").await.unwrap();

    let store = ProgressStore::new(temp.path());
    let maps = store.list(Some(USER_ID)).await.unwrap();
    assert_eq!(maps.len(), 3);
    assert!(store.list(Some("someone-else")).await.unwrap().is_empty());
}
