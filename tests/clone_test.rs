mod common;

use std::collections::HashMap;

use timetable_backend::db::repository;
use timetable_backend::models::{DayOfWeek, NewVersionRequest};
use timetable_backend::services::{EnrollmentLedger, VersionCloner};

use common::*;

fn metadata(name: &str) -> NewVersionRequest {
    NewVersionRequest {
        name: name.to_string(),
        display_name: name.to_string(),
        start_date: "2026-09-01".to_string(),
        end_date: "2027-02-28".to_string(),
        description: String::new(),
        order: 1,
    }
}

#[tokio::test]
async fn copied_version_is_inactive_and_complete() {
    let pool = test_pool().await;
    let v = seed_version(&pool, "source").await;
    let kim = seed_teacher(&pool, &v.id, "Kim").await;
    let lee = seed_teacher(&pool, &v.id, "Lee").await;
    let room = seed_classroom(&pool, "101").await;

    let a = seed_offering(
        &pool,
        &v.id,
        &kim.id,
        &room.id,
        "Algebra",
        vec![block(DayOfWeek::Monday, "09:00", "10:00")],
        10,
    )
    .await;
    seed_offering(
        &pool,
        &v.id,
        &lee.id,
        &room.id,
        "History",
        vec![block(DayOfWeek::Tuesday, "09:00", "10:00")],
        10,
    )
    .await;

    let ann = seed_student(&pool, "Ann").await;
    EnrollmentLedger::new(pool.clone())
        .add_enrollment(&ann.id, &a.id, None)
        .await
        .expect("enroll");

    let stats = VersionCloner::new(pool.clone())
        .copy_version(&v.id, metadata("copy"))
        .await
        .expect("copy");

    assert!(!stats.version.is_active);
    assert_eq!(stats.teachers_copied, 2);
    assert_eq!(stats.offerings_copied, 2);
    assert_eq!(stats.enrollments_copied, 1);

    // The source version is untouched.
    let source_offerings = repository::fetch_offerings_by_version(&pool, &v.id)
        .await
        .expect("fetch");
    assert_eq!(source_offerings.len(), 2);
}

#[tokio::test]
async fn copied_offerings_resolve_to_equivalent_teachers() {
    let pool = test_pool().await;
    let v = seed_version(&pool, "source").await;
    let kim = seed_teacher(&pool, &v.id, "Kim").await;
    let room = seed_classroom(&pool, "101").await;
    seed_offering(
        &pool,
        &v.id,
        &kim.id,
        &room.id,
        "Algebra",
        vec![block(DayOfWeek::Monday, "09:00", "10:00")],
        10,
    )
    .await;

    let stats = VersionCloner::new(pool.clone())
        .copy_version(&v.id, metadata("copy"))
        .await
        .expect("copy");
    let new_version_id = stats.version.id;

    let source_teachers: HashMap<String, _> =
        repository::fetch_teachers_by_version(&pool, &v.id)
            .await
            .expect("fetch")
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();

    let copied = repository::fetch_offerings_by_version(&pool, &new_version_id)
        .await
        .expect("fetch");
    assert_eq!(copied.len(), 1);
    for offering in &copied {
        // Round trip: the rewritten teacher id resolves to a teacher in the
        // new version with identical name and subjects.
        let teacher = repository::find_teacher_by_id(&pool, &offering.teacher_id)
            .await
            .expect("find")
            .expect("copied teacher exists");
        assert_eq!(teacher.version_id, new_version_id);
        let original = &source_teachers[&teacher.name];
        assert_eq!(teacher.subjects, original.subjects);
        assert_ne!(teacher.id, original.id);
    }
}

#[tokio::test]
async fn copied_enrollments_are_remapped_to_new_offering_ids() {
    let pool = test_pool().await;
    let v = seed_version(&pool, "source").await;
    let kim = seed_teacher(&pool, &v.id, "Kim").await;
    let room = seed_classroom(&pool, "101").await;
    let a = seed_offering(
        &pool,
        &v.id,
        &kim.id,
        &room.id,
        "Algebra",
        vec![block(DayOfWeek::Monday, "09:00", "10:00")],
        10,
    )
    .await;
    let ann = seed_student(&pool, "Ann").await;
    EnrollmentLedger::new(pool.clone())
        .add_enrollment(&ann.id, &a.id, None)
        .await
        .expect("enroll");

    let stats = VersionCloner::new(pool.clone())
        .copy_version(&v.id, metadata("copy"))
        .await
        .expect("copy");

    let copied_offerings =
        repository::fetch_offerings_by_version(&pool, &stats.version.id)
            .await
            .expect("fetch");
    let new_offering_id = &copied_offerings[0].id;

    let records = repository::fetch_enrollments_by_version(&pool, &stats.version.id)
        .await
        .expect("fetch");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].student_id, ann.id);
    assert_eq!(&records[0].class_offering_ids, &vec![new_offering_id.clone()]);
    assert!(!records[0].contains_offering(&a.id), "old id must be rewritten");
}

#[tokio::test]
async fn bulk_init_creates_only_the_missing_records() {
    let pool = test_pool().await;
    let v = seed_version(&pool, "v").await;
    let kim = seed_teacher(&pool, &v.id, "Kim").await;
    let room = seed_classroom(&pool, "101").await;
    let offering = seed_offering(
        &pool,
        &v.id,
        &kim.id,
        &room.id,
        "Algebra",
        vec![block(DayOfWeek::Monday, "09:00", "10:00")],
        10,
    )
    .await;

    let ann = seed_student(&pool, "Ann").await;
    let ben = seed_student(&pool, "Ben").await;
    let cay = seed_student(&pool, "Cay").await;

    // Ann already has a real record; it must not be overwritten.
    EnrollmentLedger::new(pool.clone())
        .add_enrollment(&ann.id, &offering.id, None)
        .await
        .expect("enroll");

    let ids = vec![
        ann.id.clone(),
        ben.id.clone(),
        cay.id.clone(),
        cay.id.clone(), // duplicate input must not double-create
    ];
    let created = VersionCloner::new(pool.clone())
        .bulk_initialize_empty_timetables(&v.id, &ids)
        .await
        .expect("bulk init");
    assert_eq!(created, 2);

    let ann_record = repository::find_enrollment_by_student_version(&pool, &ann.id, &v.id)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(ann_record.class_offering_ids, vec![offering.id.clone()]);

    let ben_record = repository::find_enrollment_by_student_version(&pool, &ben.id, &v.id)
        .await
        .expect("find")
        .expect("exists");
    assert!(ben_record.class_offering_ids.is_empty());

    // Re-running is a no-op.
    let created_again = VersionCloner::new(pool.clone())
        .bulk_initialize_empty_timetables(&v.id, &ids)
        .await
        .expect("bulk init again");
    assert_eq!(created_again, 0);
}
