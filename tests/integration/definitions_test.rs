//! Integration tests for definition upserts and item deletion.

use chrono::NaiveDate;
use routinely::routines::types::{Classification, DayOfWeek};
use routinely::routines::SlotStatus;
use routinely::storage::{Database, SessionRoutine};
use routinely::{
    ItemSelector, ProgressSubject, RoutineDefinition, RoutineError, RoutineItem, RoutineService,
    Schedule, TimeOfDay,
};

const OWNER: &str = "owner-3";

fn date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2025, 6, 4)
}

fn service() -> RoutineService {
    RoutineService::new(Database::open_in_memory().unwrap())
}

fn weekday_mornings() -> RoutineDefinition {
    RoutineDefinition::new(OWNER, Schedule::weekly(1..=5), Some(TimeOfDay::Morning))
        .with_item(RoutineItem::new("Meditate", "mind").with_classification(Classification::Good))
        .with_item(RoutineItem::new("Coffee", "drink"))
}

#[test]
fn test_upsert_twice_matches_upsert_once() {
    let once = service();
    once.upsert_definitions(OWNER, &[weekday_mornings()]).unwrap();

    let twice = service();
    twice.upsert_definitions(OWNER, &[weekday_mornings()]).unwrap();
    let summary = twice.upsert_definitions(OWNER, &[weekday_mornings()]).unwrap();
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.updated, 1);

    let subject = ProgressSubject::owner(OWNER);
    assert_eq!(
        once.weekly_progress(&subject, date()).unwrap(),
        twice.weekly_progress(&subject, date()).unwrap()
    );
    assert_eq!(twice.list_definitions(OWNER).unwrap().len(), 1);
}

#[test]
fn test_items_merge_by_name() {
    let service = service();
    service.upsert_definitions(OWNER, &[weekday_mornings()]).unwrap();

    let update = RoutineDefinition::new(OWNER, Schedule::weekly([5, 4, 3, 2, 1]), Some(TimeOfDay::Morning))
        .with_item(RoutineItem::new("coffee", "tea instead").with_classification(Classification::Bad))
        .with_item(RoutineItem::new("Cold shower", "body"));
    service.upsert_definitions(OWNER, &[update]).unwrap();

    let definitions = service.list_definitions(OWNER).unwrap();
    assert_eq!(definitions.len(), 1);

    let names: Vec<&str> = definitions[0].items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains(&"Meditate"));
    assert!(names.contains(&"Cold shower"));

    let coffee = definitions[0]
        .items
        .iter()
        .find(|i| i.same_name("Coffee"))
        .unwrap();
    assert_eq!(coffee.classification, Classification::Bad);
}

#[test]
fn test_invalid_payload_is_rejected_whole() {
    let service = service();

    let bad_schedule =
        RoutineDefinition::new(OWNER, Schedule::monthly([32]), Some(TimeOfDay::Night))
            .with_item(RoutineItem::new("Pay rent", "finance"));
    let result = service.upsert_definitions(OWNER, &[weekday_mornings(), bad_schedule]);

    assert!(matches!(result, Err(RoutineError::Validation(_))));
    assert!(service.list_definitions(OWNER).unwrap().is_empty());
}

#[test]
fn test_json_payload_with_mismatched_config_is_rejected() {
    let payload = r#"[{
        "scheduleType": "weekly",
        "scheduleConfig": {"daysOfMonth": [1, 15]},
        "timeOfDay": "morning",
        "items": [{"name": "Water"}]
    }]"#;
    assert!(serde_json::from_str::<Vec<RoutineDefinition>>(payload).is_err());

    let bad_slot = r#"[{
        "scheduleType": "weekly",
        "scheduleConfig": {"daysOfWeek": [1]},
        "timeOfDay": "evening",
        "items": []
    }]"#;
    assert!(serde_json::from_str::<Vec<RoutineDefinition>>(bad_slot).is_err());
}

#[test]
fn test_json_payload_round_trips_through_store() {
    let payload = r#"[{
        "scheduleType": "weekly",
        "scheduleConfig": {"daysOfWeek": [0, 6]},
        "timeOfDay": "night",
        "items": [
            {"name": "Read", "itemType": "mind", "durationMinutes": 20},
            {"name": "Stretch", "itemType": "body", "isOptional": true, "order": 1}
        ]
    }]"#;
    let definitions: Vec<RoutineDefinition> = serde_json::from_str(payload).unwrap();

    let service = service();
    service.upsert_definitions(OWNER, &definitions).unwrap();

    let stored = &service.list_definitions(OWNER).unwrap()[0];
    assert_eq!(stored.schedule, Schedule::weekly([0, 6]));
    assert_eq!(stored.time_of_day, Some(TimeOfDay::Night));
    assert_eq!(stored.items[0].duration_minutes, Some(20.0));
    assert!(stored.items[1].is_optional);
}

#[test]
fn test_delete_item_on_one_day_of_shared_definition() {
    let service = service();
    service.upsert_definitions(OWNER, &[weekday_mornings()]).unwrap();

    let owner = ProgressSubject::owner(OWNER);
    service
        .delete_item(
            &owner,
            &ItemSelector::new(DayOfWeek::Wednesday, TimeOfDay::Morning, "meditate"),
        )
        .unwrap();

    let progress = service.weekly_progress(&owner, date()).unwrap();
    let names = |day: DayOfWeek| -> Vec<String> {
        progress.day(day).slots[TimeOfDay::Morning.index()]
            .items
            .iter()
            .map(|i| i.name.clone())
            .collect()
    };

    assert_eq!(names(DayOfWeek::Wednesday), vec!["Coffee"]);
    assert_eq!(names(DayOfWeek::Tuesday), vec!["Meditate", "Coffee"]);
    assert_eq!(names(DayOfWeek::Thursday), vec!["Meditate", "Coffee"]);
    assert_eq!(
        progress.day(DayOfWeek::Sunday).slot(TimeOfDay::Morning),
        SlotStatus::Missing
    );

    assert!(matches!(
        service.delete_item(
            &owner,
            &ItemSelector::new(DayOfWeek::Wednesday, TimeOfDay::Morning, "Meditate"),
        ),
        Err(RoutineError::NotFound(_))
    ));
}

#[test]
fn test_delete_last_item_leaves_empty_slot() {
    let service = service();
    let session = ProgressSubject::session("anon");
    service
        .upsert_session_routines(
            "anon",
            &[SessionRoutine::new(DayOfWeek::Monday, TimeOfDay::Night)
                .with_item(RoutineItem::new("Journal", "mind"))],
        )
        .unwrap();

    service
        .delete_item(
            &session,
            &ItemSelector::new(DayOfWeek::Monday, TimeOfDay::Night, "Journal"),
        )
        .unwrap();

    let progress = service.weekly_progress(&session, date()).unwrap();
    assert_eq!(
        progress.day(DayOfWeek::Monday).slot(TimeOfDay::Night),
        SlotStatus::Empty
    );
}

#[test]
fn test_last_modified_moves_on_write() {
    let service = service();
    let owner = ProgressSubject::owner(OWNER);
    assert!(service.last_modified(&owner).unwrap().is_none());

    service.upsert_definitions(OWNER, &[weekday_mornings()]).unwrap();
    let first = service.last_modified(&owner).unwrap().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(5));
    service
        .delete_item(
            &owner,
            &ItemSelector::new(DayOfWeek::Monday, TimeOfDay::Morning, "Coffee"),
        )
        .unwrap();
    let second = service.last_modified(&owner).unwrap().unwrap();

    assert!(second > first);
}
