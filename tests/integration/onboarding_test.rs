//! Integration tests for the onboarding gate and sleep routine.

use chrono::{NaiveDate, NaiveTime};
use routinely::routines::types::DayOfWeek;
use routinely::storage::{Database, SessionRoutine};
use routinely::{
    OnboardingStep, ProgressSubject, RoutineError, RoutineItem, RoutineService, SleepRoutine,
    TimeOfDay,
};

fn date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2025, 2, 12)
}

fn time(h: u32, m: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(h, m, 0)
}

fn full_session_week(service: &RoutineService, session_id: &str) {
    let routines: Vec<SessionRoutine> = DayOfWeek::ALL
        .iter()
        .flat_map(|&day| {
            [
                SessionRoutine::new(day, TimeOfDay::Morning)
                    .with_item(RoutineItem::new("Sunlight", "habit")),
                SessionRoutine::new(day, TimeOfDay::Night)
                    .with_item(RoutineItem::new("Lights out", "habit")),
            ]
        })
        .collect();
    service.upsert_session_routines(session_id, &routines).unwrap();
}

#[test]
fn test_session_walks_through_onboarding() {
    let service = RoutineService::new(Database::open_in_memory().unwrap());
    let subject = ProgressSubject::session("visitor");

    let status = service.onboarding_status(&subject, date()).unwrap();
    assert!(!status.is_complete);
    assert_eq!(status.current_step, OnboardingStep::WeeklyRoutine);

    full_session_week(&service, "visitor");
    let status = service.onboarding_status(&subject, date()).unwrap();
    assert!(status.is_complete);
    assert_eq!(status.current_step, OnboardingStep::SleepRoutine);

    service
        .set_sleep_routine(
            &subject,
            &SleepRoutine::new(time(22, 30), time(6, 30)).with_pre_bed_item("Journal"),
        )
        .unwrap();
    let status = service.onboarding_status(&subject, date()).unwrap();
    assert!(status.sleep_complete);
    assert_eq!(status.current_step, OnboardingStep::Complete);
    assert!(status.missing_requirements.is_empty());
}

#[test]
fn test_sleep_routine_is_scoped_by_subject_kind() {
    let service = RoutineService::new(Database::open_in_memory().unwrap());
    let owner = ProgressSubject::owner("same-id");
    let session = ProgressSubject::session("same-id");

    service
        .set_sleep_routine(&owner, &SleepRoutine::new(time(23, 0), None))
        .unwrap();

    assert!(service.get_sleep_routine(&session).unwrap().is_none());

    let progress = service.sleep_progress(&owner).unwrap();
    assert!(!progress.is_complete);
    assert_eq!(progress.missing_requirements, vec!["wake time", "pre-bed item"]);
}

#[test]
fn test_blank_pre_bed_item_is_rejected() {
    let service = RoutineService::new(Database::open_in_memory().unwrap());
    let result = service.set_sleep_routine(
        &ProgressSubject::owner("u"),
        &SleepRoutine::default().with_pre_bed_item("   "),
    );
    assert!(matches!(result, Err(RoutineError::Validation(_))));
}
