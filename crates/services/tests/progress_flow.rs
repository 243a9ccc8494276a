use drivetrack_core::model::{ContentId, ContentUnit, Course, CourseId, Quiz, QuizId, StudentId};
use drivetrack_core::time::{Clock, fixed_now, utc_date};
use services::AppServices;
use storage::repository::{ContentRepository, CourseRepository, QuizRepository, Storage};

async fn seeded_services() -> (AppServices, Storage) {
    let storage = Storage::in_memory();
    let services = AppServices::from_storage(&storage, Clock::fixed(fixed_now()));

    let unit_ids: Vec<ContentId> = (1..=4).map(ContentId::new).collect();
    let course = Course::new(CourseId::new(1), "Highway Code", unit_ids.clone()).unwrap();
    storage.courses.upsert_course(&course).await.unwrap();
    for (idx, id) in unit_ids.iter().enumerate() {
        storage
            .content
            .upsert_content_unit(
                &ContentUnit::new(*id, CourseId::new(1), format!("Unit {}", idx + 1)).unwrap(),
            )
            .await
            .unwrap();
    }
    storage
        .quizzes
        .upsert_quiz(&Quiz::new(QuizId::new(20), Some(CourseId::new(1)), "Signs").unwrap())
        .await
        .unwrap();

    (services, storage)
}

#[tokio::test]
async fn recorded_percent_is_reflected_in_lesson_progress() {
    let (services, _storage) = seeded_services().await;
    let tracker = services.tracker();
    let reports = services.reports();

    tracker
        .record_progress(StudentId::new(1), CourseId::new(1), ContentId::new(1), 40, 120)
        .await
        .unwrap();

    let rows = reports
        .lesson_progress(StudentId::new(1), CourseId::new(1))
        .await
        .unwrap();
    let touched = rows
        .iter()
        .find(|r| r.content_id == ContentId::new(1))
        .unwrap();
    assert_eq!(touched.percent_complete, 40);
    assert_eq!(touched.time_spent_seconds, 120);
    assert!(!touched.is_completed);

    tracker
        .record_progress(StudentId::new(1), CourseId::new(1), ContentId::new(1), 75, 60)
        .await
        .unwrap();

    let rows = reports
        .lesson_progress(StudentId::new(1), CourseId::new(1))
        .await
        .unwrap();
    let touched = rows
        .iter()
        .find(|r| r.content_id == ContentId::new(1))
        .unwrap();
    assert_eq!(touched.percent_complete, 75);
    assert_eq!(touched.time_spent_seconds, 180);
    assert_eq!(touched.attempts, 2);
}

#[tokio::test]
async fn time_accumulates_across_any_percent_sequence() {
    let (services, _storage) = seeded_services().await;
    let tracker = services.tracker();

    let deltas = [30_u32, 0, 120, 45, 15];
    let percents = [10_u8, 90, 5, 100, 60];
    let mut record = None;
    for (delta, percent) in deltas.iter().zip(percents) {
        record = Some(
            tracker
                .record_progress(
                    StudentId::new(1),
                    CourseId::new(1),
                    ContentId::new(2),
                    percent,
                    *delta,
                )
                .await
                .unwrap(),
        );
    }

    let record = record.unwrap();
    assert_eq!(
        record.time_spent_seconds(),
        u64::from(deltas.iter().sum::<u32>())
    );
    // completion happened mid-sequence and survived the later lower percent
    assert!(record.is_completed());
    assert_eq!(record.percent_complete(), 60);
}

#[tokio::test]
async fn course_summary_scenario_matches_expected_rollup() {
    let (services, _storage) = seeded_services().await;
    let tracker = services.tracker();
    let reports = services.reports();

    tracker
        .record_completion(StudentId::new(1), CourseId::new(1), ContentId::new(1))
        .await
        .unwrap();
    tracker
        .record_completion(StudentId::new(1), CourseId::new(1), ContentId::new(2))
        .await
        .unwrap();
    tracker
        .record_quiz_score(StudentId::new(1), QuizId::new(20), 80)
        .await
        .unwrap();

    let summary = reports
        .course_summary(StudentId::new(1), CourseId::new(1))
        .await
        .unwrap();

    assert_eq!(summary.total_lessons, 4);
    assert_eq!(summary.completed_lessons, 2);
    assert_eq!(summary.overall_progress_percent, 50.0);
    assert_eq!(summary.total_quizzes, 1);
    assert_eq!(summary.completed_quizzes, 1);
    assert_eq!(summary.average_quiz_score, Some(80.0));
    assert_eq!(summary.last_activity_at, fixed_now());

    let percent = reports
        .overall_progress_percent(StudentId::new(1), CourseId::new(1))
        .await
        .unwrap();
    assert_eq!(percent, 50.0);
}

#[tokio::test]
async fn daily_views_bucket_todays_activity() {
    let (services, _storage) = seeded_services().await;
    let tracker = services.tracker();
    let reports = services.reports();
    let today = utc_date(fixed_now());

    tracker
        .record_progress(StudentId::new(1), CourseId::new(1), ContentId::new(1), 100, 600)
        .await
        .unwrap();
    tracker
        .record_progress(StudentId::new(1), CourseId::new(1), ContentId::new(2), 50, 300)
        .await
        .unwrap();

    let days = reports
        .daily_progress(StudentId::new(1), CourseId::new(1), 7)
        .await
        .unwrap();
    assert_eq!(days.len(), 8);
    let today_bucket = days.last().unwrap();
    assert_eq!(today_bucket.date, today);
    assert_eq!(today_bucket.lessons_completed, 1);
    assert_eq!(today_bucket.time_spent_seconds, 900);
    assert_eq!(today_bucket.average_percent, 75.0);

    let analytics = reports
        .student_daily_analytics(StudentId::new(1), today)
        .await
        .unwrap();
    assert_eq!(analytics.total_time_spent_seconds, 900);
    assert_eq!(analytics.lessons_completed, 1);
    assert_eq!(analytics.total_attempts, 2);

    let class = reports
        .class_daily_analytics(CourseId::new(1), today)
        .await
        .unwrap();
    assert_eq!(class.len(), 1);
    assert_eq!(class[0].student_id, StudentId::new(1));
}

#[tokio::test]
async fn replayed_completion_calls_do_not_corrupt_the_ledger() {
    let (services, _storage) = seeded_services().await;
    let tracker = services.tracker();

    let first = tracker
        .record_completion(StudentId::new(1), CourseId::new(1), ContentId::new(3))
        .await
        .unwrap();
    let replay = tracker
        .record_completion(StudentId::new(1), CourseId::new(1), ContentId::new(3))
        .await
        .unwrap();

    assert_eq!(replay.completed_at(), first.completed_at());
    assert_eq!(replay.attempts(), 0);
    assert!(replay.is_completed());
}
