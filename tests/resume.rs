//! Resume Integration Tests
//!
//! Tests for picking up stored progress: no-op resumes, interrupted runs,
//! resets and policy changes.

mod common;

use common::{processor, settings, two_module_course, FakeService, USER_ID};
use courscape::core::{build_content_map, ClassificationPolicy, ProgressStore};
use courscape::domain::{ContentKey, ItemStatus};
use tempfile::TempDir;

fn key() -> ContentKey {
    ContentKey::course(USER_ID, "algebra")
}

#[tokio::test]
async fn test_resume_of_finished_course_is_noop() {
    let temp = TempDir::new().unwrap();
    let service = FakeService::new().with_course("algebra", two_module_course("algebra"));
    let processor = processor(&service, &temp, settings()).await;
    processor.process_course("algebra", None).await.unwrap();

    let store = ProgressStore::new(temp.path());
    let before = store.load(&key()).await.unwrap();
    let calls_before = service.call_count();

    let report = processor.process_course("algebra", None).await.unwrap();
    let after = store.load(&key()).await.unwrap();

    assert!(report.resumed);
    assert_eq!(report.attempted, 0);
    assert_eq!(service.call_count(), calls_before);
    assert_eq!(before.modules, after.modules);
    assert_eq!(before.created_at, after.created_at);
}

#[tokio::test]
async fn test_interrupted_item_is_requeued() {
    let temp = TempDir::new().unwrap();
    let service = FakeService::new().with_course("algebra", two_module_course("algebra"));
    let store = ProgressStore::new(temp.path());

    // Simulate a run that died while completing b1
    {
        let policy = common::lecture_supplement_policy();
        let hierarchy = two_module_course("algebra");
        let mut session = store
            .open(&key(), false, || build_content_map(&key(), &hierarchy, &policy))
            .await
            .unwrap();
        session.update_item_status("a1", ItemStatus::Completed);
        session.update_item_status("b1", ItemStatus::Processing);
        assert!(session.save().await);
    }

    let processor = processor(&service, &temp, settings()).await;
    let report = processor.process_course("algebra", None).await.unwrap();

    assert!(report.resumed);
    assert_eq!(report.requeued, 1);
    assert_eq!(service.calls(), vec!["b1", "a2", "b2"]);
    assert_eq!(report.summary.completed, 4);
}

#[tokio::test]
async fn test_interrupted_item_left_alone_without_requeue() {
    let temp = TempDir::new().unwrap();
    let service = FakeService::new().with_course("algebra", two_module_course("algebra"));
    let store = ProgressStore::new(temp.path());

    {
        let policy = common::lecture_supplement_policy();
        let hierarchy = two_module_course("algebra");
        let mut session = store
            .open(&key(), false, || build_content_map(&key(), &hierarchy, &policy))
            .await
            .unwrap();
        session.update_item_status("b1", ItemStatus::Processing);
        assert!(session.save().await);
    }

    let mut settings = settings();
    settings.requeue_stale = false;
    let processor = processor(&service, &temp, settings).await;
    let report = processor.process_course("algebra", None).await.unwrap();

    assert_eq!(report.requeued, 0);
    assert!(!service.calls().contains(&"b1".to_string()));
    // Still counted as outstanding work
    assert_eq!(report.summary.queued, 1);
    assert_eq!(report.summary.completed, 3);
}

#[tokio::test]
async fn test_reset_progress_rebuilds_map() {
    let temp = TempDir::new().unwrap();
    let service = FakeService::new()
        .with_course("algebra", two_module_course("algebra"))
        .rejecting("a1");
    let first = processor(&service, &temp, settings()).await;
    first.process_course("algebra", None).await.unwrap();

    service.accept_all();
    let mut settings = settings();
    settings.reset_progress = true;
    let second = processor(&service, &temp, settings).await;
    let report = second.process_course("algebra", None).await.unwrap();

    assert!(!report.resumed);
    assert_eq!(report.attempted, 4);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.summary.completed, 4);
}

#[tokio::test]
async fn test_update_types_preserves_history() {
    let temp = TempDir::new().unwrap();
    let service = FakeService::new().with_course("algebra", two_module_course("algebra"));
    let first = processor(&service, &temp, settings()).await;
    first.process_course("algebra", None).await.unwrap();

    // Supplements are no longer skippable, exams now are
    let store = ProgressStore::new(temp.path());
    let policy = ClassificationPolicy::new(["lecture", "exam"], ["supplement"]);
    {
        let mut session = store
            .open(&key(), false, || unreachable!("map already stored"))
            .await
            .unwrap();
        assert!(session.update_skippable_status(&policy).await);
    }

    let map = store.load(&key()).await.unwrap();
    let b1 = map.find_item("b1").unwrap();
    assert!(!b1.skippable);
    assert_eq!(b1.status, Some(ItemStatus::Completed));
    let c1 = map.find_item("c1").unwrap();
    assert!(c1.skippable);
    assert_eq!(c1.status, Some(ItemStatus::Queued));
}

#[tokio::test]
async fn test_update_types_during_run_completes_new_items() {
    let temp = TempDir::new().unwrap();
    let service = FakeService::new().with_course("algebra", two_module_course("algebra"));
    let first = processor(&service, &temp, settings()).await;
    first.process_course("algebra", None).await.unwrap();

    let mut settings = courscape::core::ProcessorSettings::new(ClassificationPolicy::new(
        ["lecture", "supplement", "exam"],
        Vec::<String>::new(),
    ));
    settings.update_types = true;
    let second = processor(&service, &temp, settings).await;
    let report = second.process_course("algebra", None).await.unwrap();

    assert!(report.resumed);
    assert_eq!(report.attempted, 2);
    assert_eq!(report.summary.total_skippable, 6);
    assert_eq!(report.summary.completed, 6);
    assert_eq!(&service.calls()[4..], &["c1".to_string(), "c2".to_string()]);
}

#[tokio::test]
async fn test_concurrent_session_is_rejected() {
    let temp = TempDir::new().unwrap();
    let service = FakeService::new().with_course("algebra", two_module_course("algebra"));
    let store = ProgressStore::new(temp.path());

    let policy = common::lecture_supplement_policy();
    let hierarchy = two_module_course("algebra");
    let _held = store
        .open(&key(), false, || build_content_map(&key(), &hierarchy, &policy))
        .await
        .unwrap();

    let processor = processor(&service, &temp, settings()).await;
    let err = processor.process_course("algebra", None).await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn test_shared_item_is_settled_once_across_runs() {
    let temp = TempDir::new().unwrap();
    // `x` is referenced from both lessons
    let shared = common::hierarchy(
        "shared",
        &[
            ("Week 1", vec![("x", "lecture"), ("y", "supplement")]),
            ("Week 2", vec![("x", "lecture"), ("z", "lecture")]),
        ],
    );
    let service = FakeService::new().with_course("shared", shared);
    let mut settings = settings();
    settings.success_policy = courscape::domain::SuccessPolicy::Strict;
    let processor = processor(&service, &temp, settings).await;

    let first = processor.process_course("shared", None).await.unwrap();
    assert_eq!(first.attempted, 3);
    assert_eq!(service.calls(), vec!["x", "y", "z"]);
    assert_eq!(first.summary.queued, 0);
    assert_eq!(first.summary.completed, first.summary.total_skippable);

    for _ in 0..2 {
        let report = processor.process_course("shared", None).await.unwrap();
        assert!(report.resumed);
        assert_eq!(report.attempted, 0);
        assert!(report.is_success(courscape::domain::SuccessPolicy::Strict));
    }
    assert_eq!(service.call_count(), 3);

    let store = ProgressStore::new(temp.path());
    let map = store
        .load(&ContentKey::course(USER_ID, "shared"))
        .await
        .unwrap();
    let statuses: Vec<_> = map.items().filter(|i| i.id == "x").map(|i| i.status).collect();
    assert_eq!(statuses, vec![Some(ItemStatus::Completed); 2]);
}
