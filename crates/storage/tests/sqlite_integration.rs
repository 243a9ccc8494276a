use chrono::Duration;
use drivetrack_core::model::{
    ContentId, ContentUnit, Course, CourseId, ProgressEvent, Quiz, QuizId, StudentId,
};
use drivetrack_core::time::fixed_now;
use storage::repository::{ContentRepository, CourseRepository, ProgressLedger, QuizRepository};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn progress_event(content: u64, percent: u8, delta: u32) -> ProgressEvent {
    ProgressEvent::progress(
        StudentId::new(1),
        CourseId::new(1),
        ContentId::new(content),
        percent,
        delta,
        fixed_now(),
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_accumulates_time_and_overwrites_percent() {
    let repo = connect("memdb_accumulate").await;

    let first = repo.apply_event(&progress_event(10, 40, 120)).await.unwrap();
    assert_eq!(first.percent_complete(), 40);
    assert_eq!(first.time_spent_seconds(), 120);
    assert_eq!(first.attempts(), 1);
    assert!(!first.is_completed());

    let second = repo.apply_event(&progress_event(10, 75, 60)).await.unwrap();
    assert_eq!(second.percent_complete(), 75);
    assert_eq!(second.time_spent_seconds(), 180);
    assert_eq!(second.attempts(), 2);
    assert!(!second.is_completed());

    let fetched = repo
        .get(StudentId::new(1), CourseId::new(1), ContentId::new(10))
        .await
        .unwrap()
        .expect("row exists");
    assert_eq!(fetched, second);
}

#[tokio::test]
async fn sqlite_keeps_completion_once_set() {
    let repo = connect("memdb_completion").await;
    let now = fixed_now();

    let completed = repo.apply_event(&progress_event(10, 100, 30)).await.unwrap();
    assert!(completed.is_completed());
    assert_eq!(completed.completed_at(), Some(now));

    let later_event = ProgressEvent::progress(
        StudentId::new(1),
        CourseId::new(1),
        ContentId::new(10),
        20,
        10,
        now + Duration::hours(2),
    )
    .unwrap();
    let after = repo.apply_event(&later_event).await.unwrap();

    assert_eq!(after.percent_complete(), 20);
    assert!(after.is_completed());
    assert_eq!(after.completed_at(), Some(now));
    assert_eq!(after.first_viewed_at(), now);
    assert_eq!(after.last_accessed_at(), now + Duration::hours(2));
}

#[tokio::test]
async fn sqlite_quiz_scores_overwrite_without_clearing() {
    let repo = connect("memdb_quiz").await;
    let now = fixed_now();

    let scored = repo
        .apply_event(&ProgressEvent::quiz_score(
            StudentId::new(1),
            CourseId::new(1),
            QuizId::new(20),
            55,
            now,
        ))
        .await
        .unwrap();
    assert_eq!(scored.quiz_score(), Some(55));
    assert!(scored.is_completed());
    assert_eq!(scored.percent_complete(), 100);

    let rescored = repo
        .apply_event(&ProgressEvent::quiz_score(
            StudentId::new(1),
            CourseId::new(1),
            QuizId::new(20),
            90,
            now + Duration::days(1),
        ))
        .await
        .unwrap();
    assert_eq!(rescored.quiz_score(), Some(90));
    assert_eq!(rescored.attempts(), 2);
    assert_eq!(rescored.completed_at(), Some(now));

    // an event without a score leaves the stored score in place
    let touched = repo
        .apply_event(
            &ProgressEvent::progress(
                StudentId::new(1),
                CourseId::new(1),
                ContentId::new(20),
                100,
                15,
                now + Duration::days(2),
            )
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(touched.quiz_score(), Some(90));
}

#[tokio::test]
async fn sqlite_windowed_listings_filter_by_last_access() {
    let repo = connect("memdb_windows").await;
    let now = fixed_now();

    repo.apply_event(&progress_event(10, 50, 60)).await.unwrap();
    repo.apply_event(
        &ProgressEvent::progress(
            StudentId::new(1),
            CourseId::new(1),
            ContentId::new(11),
            30,
            20,
            now + Duration::days(1),
        )
        .unwrap(),
    )
    .await
    .unwrap();
    repo.apply_event(
        &ProgressEvent::progress(
            StudentId::new(2),
            CourseId::new(1),
            ContentId::new(10),
            10,
            5,
            now,
        )
        .unwrap(),
    )
    .await
    .unwrap();

    let mine_today = repo
        .list_student_between(StudentId::new(1), now, now + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(mine_today.len(), 1);
    assert_eq!(mine_today[0].content_id(), ContentId::new(10));

    let class_today = repo
        .list_course_between(CourseId::new(1), now, now + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(class_today.len(), 2);
    assert_eq!(class_today[0].student_id(), StudentId::new(1));
    assert_eq!(class_today[1].student_id(), StudentId::new(2));

    let mine_all = repo
        .list_for_course(StudentId::new(1), CourseId::new(1))
        .await
        .unwrap();
    assert_eq!(mine_all.len(), 2);
}

#[tokio::test]
async fn sqlite_catalog_round_trips_with_derived_unit_list() {
    let repo = connect("memdb_catalog").await;

    let course = Course::new(CourseId::new(1), "Highway Code", vec![]).unwrap();
    repo.upsert_course(&course).await.unwrap();

    repo.upsert_content_unit(
        &ContentUnit::new(ContentId::new(11), CourseId::new(1), "Signals").unwrap(),
    )
    .await
    .unwrap();
    repo.upsert_content_unit(
        &ContentUnit::new(ContentId::new(10), CourseId::new(1), "Mirrors").unwrap(),
    )
    .await
    .unwrap();

    let fetched = repo
        .get_course(CourseId::new(1))
        .await
        .unwrap()
        .expect("course exists");
    assert_eq!(fetched.title(), "Highway Code");
    assert_eq!(
        fetched.content_unit_ids(),
        &[ContentId::new(10), ContentId::new(11)]
    );

    let quiz = Quiz::new(QuizId::new(20), Some(CourseId::new(1)), "Signs").unwrap();
    repo.upsert_quiz(&quiz).await.unwrap();
    let unlinked = Quiz::new(QuizId::new(21), None, "Placement").unwrap();
    repo.upsert_quiz(&unlinked).await.unwrap();

    assert_eq!(repo.get_quiz(QuizId::new(21)).await.unwrap(), Some(unlinked));
    assert_eq!(
        repo.list_quizzes_for_course(CourseId::new(1)).await.unwrap(),
        vec![quiz]
    );

    let unit = repo
        .get_content_unit(ContentId::new(10))
        .await
        .unwrap()
        .expect("unit exists");
    assert_eq!(unit.title(), "Mirrors");
}
