//! Integration tests for weekly completion through the service.

use chrono::NaiveDate;
use routinely::routines::types::DayOfWeek;
use routinely::routines::SlotStatus;
use routinely::storage::{Database, DatabaseError, SessionRoutine};
use routinely::{
    ProgressSubject, RoutineDefinition, RoutineError, RoutineItem, RoutineService, Schedule,
    TimeOfDay,
};

const OWNER: &str = "owner-7";

// Week of Sunday 2025-06-01 through Saturday 2025-06-07
fn reference_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2025, 6, 4)
}

fn service() -> RoutineService {
    RoutineService::new(Database::open_in_memory().unwrap())
}

fn slot(days: impl IntoIterator<Item = u8>, time: TimeOfDay, item: &str) -> RoutineDefinition {
    RoutineDefinition::new(OWNER, Schedule::weekly(days), Some(time))
        .with_item(RoutineItem::new(item, "habit"))
}

#[test]
fn test_no_definitions() {
    let service = service();
    let progress = service
        .weekly_progress(&ProgressSubject::owner(OWNER), reference_date())
        .unwrap();

    assert!(!progress.is_complete);
    assert_eq!(progress.total_slots_filled, 0);
    assert_eq!(progress.missing_requirements.len(), 14);
    assert_eq!(progress.missing_requirements[0], "Sunday morning");
    assert_eq!(progress.missing_requirements[1], "Sunday night");
    assert_eq!(progress.missing_requirements[13], "Saturday night");
}

#[test]
fn test_every_morning_and_night() {
    let service = service();
    service
        .upsert_definitions(
            OWNER,
            &[
                slot(0..7, TimeOfDay::Morning, "Make bed"),
                slot(0..7, TimeOfDay::Night, "Brush teeth"),
            ],
        )
        .unwrap();

    let progress = service
        .weekly_progress(&ProgressSubject::owner(OWNER), reference_date())
        .unwrap();

    assert!(progress.is_complete);
    assert_eq!(progress.total_slots_filled, 14);
    assert!(progress.missing_requirements.is_empty());
    assert_eq!(progress.week_start, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
}

#[test]
fn test_one_night_missing() {
    let service = service();
    service
        .upsert_definitions(
            OWNER,
            &[
                slot(0..7, TimeOfDay::Morning, "Make bed"),
                slot([0, 1, 2, 3, 4, 6], TimeOfDay::Night, "Brush teeth"),
            ],
        )
        .unwrap();

    let progress = service
        .weekly_progress(&ProgressSubject::owner(OWNER), reference_date())
        .unwrap();

    assert!(!progress.is_complete);
    assert_eq!(progress.missing_requirements, vec!["Friday night"]);
    assert_eq!(progress.complete_days(), 6);
    assert_eq!(
        progress.day(DayOfWeek::Friday).slot(TimeOfDay::Night),
        SlotStatus::Missing
    );
}

#[test]
fn test_optional_slots_never_gate() {
    let service = service();
    service
        .upsert_definitions(
            OWNER,
            &[
                slot(0..7, TimeOfDay::Midday, "Walk"),
                slot(0..7, TimeOfDay::Workout, "Run"),
            ],
        )
        .unwrap();

    let progress = service
        .weekly_progress(&ProgressSubject::owner(OWNER), reference_date())
        .unwrap();

    assert_eq!(progress.total_slots_filled, 14);
    assert!(!progress.is_complete);
    assert_eq!(progress.missing_requirements.len(), 14);
}

#[test]
fn test_monthly_and_yearly_rules_use_the_concrete_dates() {
    let service = service();
    let first_of_month =
        RoutineDefinition::new(OWNER, Schedule::monthly([1]), Some(TimeOfDay::Morning))
            .with_item(RoutineItem::new("Review budget", "finance"));
    let anniversary =
        RoutineDefinition::new(OWNER, Schedule::yearly(["06-07"]), Some(TimeOfDay::Night))
            .with_item(RoutineItem::new("Call home", "family"));
    service
        .upsert_definitions(OWNER, &[first_of_month, anniversary])
        .unwrap();

    let subject = ProgressSubject::owner(OWNER);
    let progress = service.weekly_progress(&subject, reference_date()).unwrap();

    // 2025-06-01 is Sunday, 2025-06-07 is Saturday
    assert_eq!(progress.day(DayOfWeek::Sunday).slot(TimeOfDay::Morning), SlotStatus::Complete);
    assert_eq!(progress.day(DayOfWeek::Monday).slot(TimeOfDay::Morning), SlotStatus::Missing);
    assert_eq!(progress.day(DayOfWeek::Saturday).slot(TimeOfDay::Night), SlotStatus::Complete);
    assert_eq!(progress.total_slots_filled, 2);

    let next_week = service
        .weekly_progress(&subject, NaiveDate::from_ymd_opt(2025, 6, 10))
        .unwrap();
    assert_eq!(next_week.total_slots_filled, 0);
}

#[test]
fn test_archived_definitions_do_not_count() {
    let service = service();
    service
        .upsert_definitions(OWNER, &[slot(0..7, TimeOfDay::Morning, "Stretch")])
        .unwrap();
    let id = service.list_definitions(OWNER).unwrap()[0].id;
    service.archive_definition(OWNER, id).unwrap();

    let progress = service
        .weekly_progress(&ProgressSubject::owner(OWNER), reference_date())
        .unwrap();
    assert_eq!(progress.total_slots_filled, 0);
    assert_eq!(service.list_definitions(OWNER).unwrap().len(), 1);
}

#[test]
fn test_empty_definition_is_not_complete() {
    let service = service();
    service
        .upsert_definitions(
            OWNER,
            &[RoutineDefinition::new(OWNER, Schedule::weekly([3]), Some(TimeOfDay::Morning))],
        )
        .unwrap();

    let progress = service
        .weekly_progress(&ProgressSubject::owner(OWNER), reference_date())
        .unwrap();
    assert_eq!(
        progress.day(DayOfWeek::Wednesday).slot(TimeOfDay::Morning),
        SlotStatus::Empty
    );
    assert!(progress
        .missing_requirements
        .contains(&"Wednesday morning".to_string()));
}

#[test]
fn test_session_and_owner_shapes_agree() {
    let service = service();

    let mut routines = Vec::new();
    for day in DayOfWeek::ALL {
        routines.push(
            SessionRoutine::new(day, TimeOfDay::Morning)
                .with_item(RoutineItem::new("Make bed", "habit")),
        );
        if day != DayOfWeek::Tuesday {
            routines.push(
                SessionRoutine::new(day, TimeOfDay::Night)
                    .with_item(RoutineItem::new("Brush teeth", "habit")),
            );
        }
    }
    service.upsert_session_routines("session-9", &routines).unwrap();
    service
        .upsert_definitions(
            OWNER,
            &[
                slot(0..7, TimeOfDay::Morning, "Make bed"),
                slot([0, 1, 3, 4, 5, 6], TimeOfDay::Night, "Brush teeth"),
            ],
        )
        .unwrap();

    let session = service
        .weekly_progress(&ProgressSubject::session("session-9"), reference_date())
        .unwrap();
    let owner = service
        .weekly_progress(&ProgressSubject::owner(OWNER), reference_date())
        .unwrap();

    assert_eq!(session, owner);
    assert_eq!(session.missing_requirements, vec!["Tuesday night"]);
}

#[test]
fn test_progress_is_stable_across_reads() {
    let service = service();
    service
        .upsert_definitions(OWNER, &[slot([1, 3, 5], TimeOfDay::Morning, "Journal")])
        .unwrap();

    let subject = ProgressSubject::owner(OWNER);
    let first = service.weekly_progress(&subject, reference_date()).unwrap();
    let second = service.weekly_progress(&subject, reference_date()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_corrupt_stored_slot_fails_instead_of_under_reporting() {
    let service = service();
    service
        .upsert_definitions(
            OWNER,
            &[
                slot(0..7, TimeOfDay::Morning, "Make bed"),
                slot(0..7, TimeOfDay::Night, "Brush teeth"),
            ],
        )
        .unwrap();

    service
        .database()
        .connection()
        .execute(
            "UPDATE routine_definitions SET time_of_day = 'evening' WHERE time_of_day = 'night'",
            [],
        )
        .unwrap();

    let owner = ProgressSubject::owner(OWNER);
    assert!(matches!(
        service.weekly_progress(&owner, reference_date()),
        Err(RoutineError::Store(DatabaseError::DeserializationError(_)))
    ));
    assert!(matches!(
        service.onboarding_status(&owner, reference_date()),
        Err(RoutineError::Store(_))
    ));
}
