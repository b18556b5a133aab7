use std::collections::HashMap;
use tasknest_core::{
    route_fired_reminder, AddTaskRequest, AlarmRoute, CommandQueueScheduler, FiredReminder,
    FixedClock, InMemoryKeyValueStore, NotificationId, Priority, ReminderCommand, ReminderState,
    TaskStore, TaskStoreError, DEFAULT_SNOOZE_DELAY_MS, SNOOZED_REMINDER_TITLE, TASK_ID_DATA_KEY,
};

const NOW: i64 = 1_700_000_000_000;
const HOUR: i64 = 60 * 60 * 1000;

fn fired_event(task_id: &str, title: &str, handle: &NotificationId) -> FiredReminder {
    FiredReminder {
        handle: Some(handle.clone()),
        body: Some(title.to_string()),
        data: HashMap::from([(TASK_ID_DATA_KEY.to_string(), task_id.to_string())]),
    }
}

fn due_in_an_hour(title: &str) -> AddTaskRequest {
    AddTaskRequest {
        title: title.to_string(),
        priority: Priority::High,
        due_date: Some(NOW + HOUR),
        ..AddTaskRequest::default()
    }
}

#[test]
fn fired_reminder_routes_to_snooze_ten_minutes_later() {
    let kv = InMemoryKeyValueStore::new();
    let scheduler = CommandQueueScheduler::new();
    let clock = FixedClock::new(NOW);
    let mut store = TaskStore::load(&kv, &scheduler, &clock);

    let task = store.add(due_in_an_hour("Buy milk")).unwrap();
    let handle = task.notification_id.clone().unwrap();
    scheduler.drain();

    clock.advance(HOUR);
    assert_eq!(store.reminder_state(&task.id), Some(ReminderState::Fired));

    let route = route_fired_reminder(&fired_event(task.id.as_str(), "Buy milk", &handle))
        .expect("payload carries taskId");
    assert_eq!(route.task_title, "Buy milk");

    let snoozed = store.snooze_reminder(&route).unwrap();
    let expected_fire_at = NOW + HOUR + DEFAULT_SNOOZE_DELAY_MS;

    let commands = scheduler.drain();
    assert_eq!(commands.len(), 1);
    match &commands[0] {
        ReminderCommand::Schedule {
            handle: scheduled,
            fire_at_ms,
            payload,
        } => {
            assert_eq!(*scheduled, handle, "snooze reuses the fired handle");
            assert_eq!(*fire_at_ms, expected_fire_at);
            assert_eq!(payload.task_id, task.id);
            assert_eq!(payload.title, SNOOZED_REMINDER_TITLE);
            assert_eq!(payload.body, "Buy milk");
        }
        other => panic!("unexpected command: {other:?}"),
    }
    assert_eq!(snoozed.notification_id, Some(handle));
    assert_eq!(snoozed.due_date, Some(expected_fire_at));
    assert_eq!(store.reminder_state(&task.id), Some(ReminderState::Scheduled));
}

#[test]
fn snooze_uses_configured_delay() {
    let kv = InMemoryKeyValueStore::new();
    let scheduler = CommandQueueScheduler::new();
    let clock = FixedClock::new(NOW);
    let mut store = TaskStore::load(&kv, &scheduler, &clock).with_snooze_delay_ms(60_000);

    let task = store.add(due_in_an_hour("stretch")).unwrap();
    clock.advance(HOUR);
    let route = AlarmRoute {
        task_id: task.id.clone(),
        task_title: task.title.clone(),
        notification_id: task.notification_id.clone(),
    };

    let snoozed = store.snooze_reminder(&route).unwrap();
    assert_eq!(snoozed.due_date, Some(NOW + HOUR + 60_000));
}

#[test]
fn stop_cancels_handle_and_clears_task_reminder() {
    let kv = InMemoryKeyValueStore::new();
    let scheduler = CommandQueueScheduler::new();
    let clock = FixedClock::new(NOW);
    let mut store = TaskStore::load(&kv, &scheduler, &clock);

    let task = store.add(due_in_an_hour("meds")).unwrap();
    let handle = task.notification_id.clone().unwrap();
    scheduler.drain();
    clock.advance(HOUR);

    let route = route_fired_reminder(&fired_event(task.id.as_str(), "meds", &handle)).unwrap();
    let stopped = store.stop_reminder(&route).unwrap();

    assert!(stopped.notification_id.is_none());
    assert_eq!(
        scheduler.drain(),
        vec![ReminderCommand::Cancel { handle }]
    );
    assert_eq!(
        store.reminder_state(&task.id),
        Some(ReminderState::Unscheduled)
    );

    let err = store.snooze_reminder(&route).unwrap_err();
    assert!(matches!(err, TaskStoreError::Reminder(_)));
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn stop_after_delete_still_cancels_residual_handle() {
    let kv = InMemoryKeyValueStore::new();
    let scheduler = CommandQueueScheduler::new();
    let clock = FixedClock::new(NOW);
    let mut store = TaskStore::load(&kv, &scheduler, &clock);

    let task = store.add(due_in_an_hour("ghost")).unwrap();
    let handle = task.notification_id.clone().unwrap();
    store.delete(&task.id).unwrap();
    scheduler.drain();

    let route = AlarmRoute {
        task_id: task.id.clone(),
        task_title: "ghost".to_string(),
        notification_id: Some(handle.clone()),
    };
    let err = store.stop_reminder(&route).unwrap_err();
    assert!(matches!(err, TaskStoreError::NotFound(_)));
    assert_eq!(
        scheduler.drain(),
        vec![ReminderCommand::Cancel { handle }]
    );
}

#[test]
fn snooze_for_deleted_task_schedules_nothing() {
    let kv = InMemoryKeyValueStore::new();
    let scheduler = CommandQueueScheduler::new();
    let clock = FixedClock::new(NOW);
    let mut store = TaskStore::load(&kv, &scheduler, &clock);

    let task = store.add(due_in_an_hour("gone")).unwrap();
    store.delete(&task.id).unwrap();
    scheduler.drain();

    let route = AlarmRoute {
        task_id: task.id.clone(),
        task_title: "gone".to_string(),
        notification_id: task.notification_id.clone(),
    };
    assert!(matches!(
        store.snooze_reminder(&route),
        Err(TaskStoreError::NotFound(_))
    ));
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn stopping_an_old_alarm_keeps_the_newer_reminder() {
    let kv = InMemoryKeyValueStore::new();
    let scheduler = CommandQueueScheduler::new();
    let clock = FixedClock::new(NOW);
    let mut store = TaskStore::load(&kv, &scheduler, &clock);

    let task = store.add(due_in_an_hour("review")).unwrap();
    let old_handle = task.notification_id.clone().unwrap();
    let edited = store
        .edit(
            &task.id,
            tasknest_core::EditTaskRequest {
                title: "review".to_string(),
                priority: Priority::High,
                due_date: Some(NOW + 2 * HOUR),
            },
        )
        .unwrap();
    scheduler.drain();

    let route = AlarmRoute {
        task_id: task.id.clone(),
        task_title: "review".to_string(),
        notification_id: Some(old_handle.clone()),
    };
    let after = store.stop_reminder(&route).unwrap();

    assert_eq!(after.notification_id, edited.notification_id);
    assert_eq!(
        scheduler.drain(),
        vec![ReminderCommand::Cancel { handle: old_handle }]
    );
}

#[test]
fn snoozing_an_old_alarm_keeps_the_newer_reminder() {
    let kv = InMemoryKeyValueStore::new();
    let scheduler = CommandQueueScheduler::new();
    let clock = FixedClock::new(NOW);
    let mut store = TaskStore::load(&kv, &scheduler, &clock);

    let task = store.add(due_in_an_hour("review")).unwrap();
    let old_handle = task.notification_id.clone().unwrap();
    clock.advance(HOUR);
    let edited = store
        .edit(
            &task.id,
            tasknest_core::EditTaskRequest {
                title: "review".to_string(),
                priority: Priority::High,
                due_date: Some(NOW + 5 * HOUR),
            },
        )
        .unwrap();
    let new_handle = edited.notification_id.clone().unwrap();
    assert_ne!(new_handle, old_handle);
    scheduler.drain();

    let route = route_fired_reminder(&fired_event(task.id.as_str(), "review", &old_handle))
        .unwrap();
    let after = store.snooze_reminder(&route).unwrap();

    assert_eq!(after.notification_id, Some(new_handle));
    assert_eq!(after.due_date, Some(NOW + 5 * HOUR));
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(store.get(&task.id), Some(&edited));
}

#[test]
fn snoozed_reminder_survives_reload() {
    let kv = InMemoryKeyValueStore::new();
    let scheduler = CommandQueueScheduler::new();
    let clock = FixedClock::new(NOW);

    let task_id = {
        let mut store = TaskStore::load(&kv, &scheduler, &clock);
        let task = store.add(due_in_an_hour("plants")).unwrap();
        clock.advance(HOUR);
        let route = AlarmRoute {
            task_id: task.id.clone(),
            task_title: task.title.clone(),
            notification_id: task.notification_id.clone(),
        };
        store.snooze_reminder(&route).unwrap();
        task.id
    };

    let reloaded = TaskStore::load(&kv, &scheduler, &clock);
    assert_eq!(
        reloaded.reminder_state(&task_id),
        Some(ReminderState::Scheduled)
    );
}
