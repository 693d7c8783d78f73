//! Notification responses and profile summaries written through the manager.

use std::sync::Arc;

use aeryth::assistant::Assistant;
use aeryth::model::{ChatLogEntry, EventStatus, StatusBook};
use aeryth::reminders::{
    record_response, AlarmEdge, NotificationAction, ReminderScheduler, TokioAlarmSink,
};
use aeryth::storage::settings::StorageSettings;
use aeryth::storage::{fields, PersistenceManager};
use chrono::NaiveDate;
use serde_json::json;

fn manager(dir: &std::path::Path) -> PersistenceManager {
    PersistenceManager::new(StorageSettings {
        data_dir: Some(dir.to_path_buf()),
        ..StorageSettings::default()
    })
    .unwrap()
}

fn scheduler() -> ReminderScheduler {
    let (sink, _fired) = TokioAlarmSink::new();
    ReminderScheduler::new(Arc::new(sink))
}

#[tokio::test]
async fn responses_update_event_status() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());
    let scheduler = scheduler();
    let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();

    let status = record_response(
        &manager,
        &scheduler,
        "run",
        AlarmEdge::Start,
        day,
        NotificationAction::Started,
    )
    .await
    .unwrap();
    assert_eq!(status, Some(EventStatus::InProgress));

    record_response(
        &manager,
        &scheduler,
        "run",
        AlarmEdge::End,
        day,
        NotificationAction::Completed,
    )
    .await
    .unwrap();
    record_response(
        &manager,
        &scheduler,
        "read",
        AlarmEdge::Start,
        day,
        NotificationAction::Skipped,
    )
    .await
    .unwrap();

    let book: StatusBook = manager
        .load_typed(fields::EVENT_STATUSES, StatusBook::new())
        .await;
    assert_eq!(book["run"]["2024-05-06"], EventStatus::Completed);
    assert_eq!(book["read"]["2024-05-06"], EventStatus::Skipped);

    let chats: Vec<ChatLogEntry> = manager
        .load_typed(fields::NOTIFICATION_CHATS, Vec::new())
        .await;
    let texts: Vec<&str> = chats.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["Started", "Completed", "Skipped"]);
    manager.shutdown().await;
}

#[tokio::test]
async fn snooze_rearms_without_status_change() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());
    let scheduler = scheduler();
    let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();

    let status = record_response(
        &manager,
        &scheduler,
        "run",
        AlarmEdge::Start,
        day,
        NotificationAction::Snooze(15),
    )
    .await
    .unwrap();
    assert_eq!(status, None);
    assert_eq!(scheduler.armed(), vec!["aeryth-run-start"]);
    assert_eq!(manager.load(fields::EVENT_STATUSES, json!({})).await, json!({}));

    let chats: Vec<ChatLogEntry> = manager
        .load_typed(fields::NOTIFICATION_CHATS, Vec::new())
        .await;
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].text, "Snoozed for 15 min");
    manager.shutdown().await;
}

#[tokio::test]
async fn responses_keep_unmodelled_history() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());
    let scheduler = scheduler();
    let foreign_chat = json!({
        "routineId": "gym",
        "role": "aeryth",
        "text": "hi",
        "timestamp": 1714550400
    });
    manager
        .save(
            fields::EVENT_STATUSES,
            json!({"gym": {"2024-05-01": "completed", "2024-05-02": "snoozed"}}),
        )
        .await;
    manager
        .save(fields::NOTIFICATION_CHATS, json!([foreign_chat.clone()]))
        .await;

    let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
    record_response(
        &manager,
        &scheduler,
        "run",
        AlarmEdge::Start,
        day,
        NotificationAction::Started,
    )
    .await
    .unwrap();

    let book = manager.load(fields::EVENT_STATUSES, json!({})).await;
    assert_eq!(
        book,
        json!({
            "gym": {"2024-05-01": "completed", "2024-05-02": "snoozed"},
            "run": {"2024-05-06": "in-progress"}
        })
    );
    let chats = manager.load(fields::NOTIFICATION_CHATS, json!([])).await;
    let chats = chats.as_array().unwrap();
    assert_eq!(chats.len(), 2);
    assert_eq!(chats[0], foreign_chat);
    assert_eq!(chats[1]["text"], json!("Started"));
    manager.shutdown().await;
}

#[tokio::test]
async fn profile_summary_is_stored() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());

    manager
        .save(
            fields::SETTINGS,
            json!({"aerythTone": "Coach (Motivational)", "userInfo": {"name": "Ada"}}),
        )
        .await;
    manager
        .save(
            fields::ROUTINES,
            json!([{"id": "r1", "name": "Swim", "startTime": "06:00", "endTime": "07:00"}]),
        )
        .await;

    let summary = Assistant::offline().refresh_profile(&manager).await;
    assert_eq!(
        summary,
        "Ada. Prefers a motivational tone. Keeps routines: Swim (06:00-07:00)."
    );
    assert_eq!(manager.load(fields::PROFILE_SUMMARY, json!(null)).await, json!(summary));
    manager.shutdown().await;
}
