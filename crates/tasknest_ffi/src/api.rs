//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose task, reminder and theme use-cases to Dart via FRB.
//! - Hand reminder commands back to Dart, which owns the platform
//!   notification API.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Store access is serialized through one process-wide lock.
//! - A stored list that cannot be read fails the call; it is never replaced
//!   by the empty fallback list.
//! - Every mutation response lists the reminder commands Dart must execute,
//!   in order, before the next call.

use log::warn;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};
use tasknest_core::db::open_db;
use tasknest_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    route_fired_reminder, AddTaskRequest, AlarmRoute, CommandQueueScheduler, CoreConfig,
    EditTaskRequest, FiredReminder, KeyValueStore, NotificationId, Priority, ReminderCommand,
    SqliteKeyValueStore, SystemClock, Task, TaskId, TaskStore, TaskStoreResult, ThemePreference,
    ThemeService, REMINDER_CHANNEL_ID, TASK_ID_DATA_KEY,
};

static CONFIG: OnceLock<CoreConfig> = OnceLock::new();
static STORE_LOCK: Mutex<()> = Mutex::new(());

type BridgeTaskStore<'conn, 'queue> =
    TaskStore<SqliteKeyValueStore<'conn>, &'queue CommandQueueScheduler, SystemClock>;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Task row as rendered by the list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    pub completed: bool,
    /// `low|medium|high`.
    pub priority: String,
    pub image_uri: Option<String>,
    pub due_epoch_ms: Option<i64>,
    pub notification_id: Option<String>,
}

/// Notification instruction Dart executes against the platform API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderCommandItem {
    /// `schedule|cancel`.
    pub kind: String,
    pub notification_id: String,
    pub channel_id: String,
    /// Set for `schedule` only.
    pub fire_at_epoch_ms: Option<i64>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub task_id: Option<String>,
}

/// Response envelope for task list reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub ok: bool,
    pub items: Vec<TaskItem>,
    pub message: String,
    /// Non-fatal issues (such as a corrupt stored list).
    pub warnings: Vec<String>,
}

/// Response envelope for task and reminder mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskActionResponse {
    pub ok: bool,
    pub task: Option<TaskItem>,
    pub message: String,
    pub reminder_commands: Vec<ReminderCommandItem>,
    pub warnings: Vec<String>,
}

impl TaskActionResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            task: None,
            message: message.into(),
            reminder_commands: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Alarm screen parameters derived from a fired notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRouteItem {
    pub task_id: String,
    pub task_title: String,
    pub notification_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeResponse {
    /// `light|dark`.
    pub theme: String,
    /// Empty on success; write failure description otherwise.
    pub message: String,
}

/// Lists all tasks in insertion order.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_list() -> TaskListResponse {
    match with_task_store(|store| store.tasks().iter().map(to_task_item).collect::<Vec<_>>()) {
        Ok(call) => TaskListResponse {
            ok: true,
            message: format!("{} task(s).", call.value.len()),
            items: call.value,
            warnings: call.warnings,
        },
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error op=tasks_list error={err}");
            TaskListResponse {
                ok: false,
                items: Vec::new(),
                message: format!("tasks_list failed: {err}"),
                warnings: Vec::new(),
            }
        }
    }
}

/// Creates a task; schedules a reminder when `due_epoch_ms` is ahead.
///
/// # FFI contract
/// - `priority`: `low|medium|high`; empty means `medium`.
/// - Blank titles return `ok=false` and leave the list unchanged.
#[flutter_rust_bridge::frb(sync)]
pub fn task_add(
    title: String,
    image_uri: Option<String>,
    priority: String,
    due_epoch_ms: Option<i64>,
) -> TaskActionResponse {
    let priority = match parse_priority(&priority) {
        Ok(priority) => priority,
        Err(message) => return TaskActionResponse::failure(message),
    };
    let request = AddTaskRequest {
        title,
        image_uri: image_uri.filter(|uri| !uri.trim().is_empty()),
        priority,
        due_date: due_epoch_ms,
    };
    task_action("task_add", "Task created.", |store| store.add(request))
}

/// Flips a task's completed flag.
#[flutter_rust_bridge::frb(sync)]
pub fn task_toggle(task_id: String) -> TaskActionResponse {
    let Some(id) = TaskId::parse(&task_id) else {
        return TaskActionResponse::failure("task_toggle failed: task id must not be blank");
    };
    task_action("task_toggle", "Task updated.", |store| store.toggle(&id))
}

/// Replaces title, priority and due date; the reminder is re-synced.
#[flutter_rust_bridge::frb(sync)]
pub fn task_edit(
    task_id: String,
    title: String,
    priority: String,
    due_epoch_ms: Option<i64>,
) -> TaskActionResponse {
    let Some(id) = TaskId::parse(&task_id) else {
        return TaskActionResponse::failure("task_edit failed: task id must not be blank");
    };
    let priority = match parse_priority(&priority) {
        Ok(priority) => priority,
        Err(message) => return TaskActionResponse::failure(message),
    };
    let request = EditTaskRequest {
        title,
        priority,
        due_date: due_epoch_ms,
    };
    task_action("task_edit", "Task updated.", |store| store.edit(&id, request))
}

/// Deletes a task and cancels its reminder.
#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(task_id: String) -> TaskActionResponse {
    let Some(id) = TaskId::parse(&task_id) else {
        return TaskActionResponse::failure("task_delete failed: task id must not be blank");
    };
    task_action("task_delete", "Task deleted.", |store| store.delete(&id))
}

/// Interprets a fired notification for navigation to the alarm screen.
///
/// Returns `None` for notifications that do not belong to a task.
#[flutter_rust_bridge::frb(sync)]
pub fn reminder_route(
    task_id: Option<String>,
    body: Option<String>,
    notification_id: Option<String>,
) -> Option<AlarmRouteItem> {
    let mut data = HashMap::new();
    if let Some(task_id) = task_id {
        data.insert(TASK_ID_DATA_KEY.to_string(), task_id);
    }
    let event = FiredReminder {
        handle: notification_id.map(NotificationId::new),
        body,
        data,
    };
    route_fired_reminder(&event).map(|route| AlarmRouteItem {
        task_id: route.task_id.to_string(),
        task_title: route.task_title,
        notification_id: route.notification_id.map(|id| id.to_string()),
    })
}

/// Snoozes a fired reminder by the configured delay.
#[flutter_rust_bridge::frb(sync)]
pub fn reminder_snooze(
    task_id: String,
    task_title: String,
    notification_id: Option<String>,
) -> TaskActionResponse {
    let Some(route) = to_alarm_route(task_id, task_title, notification_id) else {
        return TaskActionResponse::failure("reminder_snooze failed: task id must not be blank");
    };
    task_action("reminder_snooze", "Reminder snoozed.", |store| {
        store.snooze_reminder(&route)
    })
}

/// Dismisses a fired reminder.
#[flutter_rust_bridge::frb(sync)]
pub fn reminder_stop(
    task_id: String,
    task_title: String,
    notification_id: Option<String>,
) -> TaskActionResponse {
    let Some(route) = to_alarm_route(task_id, task_title, notification_id) else {
        return TaskActionResponse::failure("reminder_stop failed: task id must not be blank");
    };
    task_action("reminder_stop", "Reminder stopped.", |store| {
        store.stop_reminder(&route)
    })
}

/// Returns the active theme (`light|dark`).
///
/// `system_theme` is the platform color scheme used when nothing is stored.
#[flutter_rust_bridge::frb(sync)]
pub fn theme_get(system_theme: Option<String>) -> ThemeResponse {
    with_theme_service(system_theme, |service| (service.current(), None))
}

/// Flips and persists the theme.
#[flutter_rust_bridge::frb(sync)]
pub fn theme_toggle(system_theme: Option<String>) -> ThemeResponse {
    with_theme_service(system_theme, |service| {
        let (theme, write_error) = service.toggle();
        (theme, write_error.map(|err| format!("theme_toggle not saved: {err}")))
    })
}

struct StoreCall<T> {
    value: T,
    commands: Vec<ReminderCommandItem>,
    warnings: Vec<String>,
}

fn resolve_config() -> &'static CoreConfig {
    CONFIG.get_or_init(CoreConfig::from_env)
}

fn with_task_store<T>(
    f: impl FnOnce(&mut BridgeTaskStore<'_, '_>) -> T,
) -> Result<StoreCall<T>, String> {
    let _guard = STORE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let config = resolve_config();
    let conn = open_db(&config.db_path).map_err(|err| format!("task DB open failed: {err}"))?;
    let kv =
        SqliteKeyValueStore::try_new(&conn).map_err(|err| format!("task store init failed: {err}"))?;
    run_store_call(kv, config.snooze_delay_ms, f)
}

fn run_store_call<K: KeyValueStore, T>(
    kv: K,
    snooze_delay_ms: i64,
    f: impl FnOnce(&mut TaskStore<K, &CommandQueueScheduler, SystemClock>) -> T,
) -> Result<StoreCall<T>, String> {
    let scheduler = CommandQueueScheduler::new();
    let mut store =
        TaskStore::load(kv, &scheduler, SystemClock).with_snooze_delay_ms(snooze_delay_ms);
    if store.load_failed() {
        let reason = store
            .drain_recoverable_errors()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(format!("stored tasks are unreadable, nothing changed: {reason}"));
    }

    let value = f(&mut store);
    let warnings = store
        .drain_recoverable_errors()
        .iter()
        .map(ToString::to_string)
        .collect();
    let commands = scheduler.drain().into_iter().map(to_command_item).collect();

    Ok(StoreCall {
        value,
        commands,
        warnings,
    })
}

fn task_action(
    operation: &str,
    success_message: &str,
    f: impl FnOnce(&mut BridgeTaskStore<'_, '_>) -> TaskStoreResult<Task>,
) -> TaskActionResponse {
    to_action_response(operation, success_message, with_task_store(f))
}

fn to_action_response(
    operation: &str,
    success_message: &str,
    call: Result<StoreCall<TaskStoreResult<Task>>, String>,
) -> TaskActionResponse {
    match call {
        Ok(StoreCall {
            value: Ok(task),
            commands,
            warnings,
        }) => TaskActionResponse {
            ok: true,
            task: Some(to_task_item(&task)),
            message: success_message.to_string(),
            reminder_commands: commands,
            warnings,
        },
        Ok(StoreCall {
            value: Err(err),
            commands,
            warnings,
        }) => TaskActionResponse {
            ok: false,
            task: None,
            message: format!("{operation} failed: {err}"),
            reminder_commands: commands,
            warnings,
        },
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error op={operation} error={err}");
            TaskActionResponse::failure(format!("{operation} failed: {err}"))
        }
    }
}

fn with_theme_service(
    system_theme: Option<String>,
    f: impl FnOnce(&mut ThemeService<SqliteKeyValueStore<'_>>) -> (ThemePreference, Option<String>),
) -> ThemeResponse {
    let system_default = system_theme.as_deref().and_then(ThemePreference::parse);
    let _guard = STORE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

    let opened = open_db(&resolve_config().db_path)
        .map_err(|err| format!("theme DB open failed: {err}"));
    let conn = match opened {
        Ok(conn) => conn,
        Err(message) => {
            return ThemeResponse {
                theme: system_default.unwrap_or_default().to_string(),
                message,
            }
        }
    };
    let kv = match SqliteKeyValueStore::try_new(&conn) {
        Ok(kv) => kv,
        Err(err) => {
            return ThemeResponse {
                theme: system_default.unwrap_or_default().to_string(),
                message: format!("theme store init failed: {err}"),
            }
        }
    };

    let mut service = ThemeService::load(kv, system_default);
    let (theme, message) = f(&mut service);
    ThemeResponse {
        theme: theme.to_string(),
        message: message.unwrap_or_default(),
    }
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    if value.trim().is_empty() {
        return Ok(Priority::default());
    }
    Priority::parse(value)
        .ok_or_else(|| format!("unsupported priority `{value}`; expected low|medium|high"))
}

fn to_alarm_route(
    task_id: String,
    task_title: String,
    notification_id: Option<String>,
) -> Option<AlarmRoute> {
    Some(AlarmRoute {
        task_id: TaskId::parse(&task_id)?,
        task_title,
        notification_id: notification_id
            .filter(|id| !id.trim().is_empty())
            .map(NotificationId::new),
    })
}

fn to_task_item(task: &Task) -> TaskItem {
    TaskItem {
        id: task.id.to_string(),
        title: task.title.clone(),
        completed: task.completed,
        priority: task.priority.as_str().to_string(),
        image_uri: task.image_uri.clone(),
        due_epoch_ms: task.due_date,
        notification_id: task.notification_id.as_ref().map(ToString::to_string),
    }
}

fn to_command_item(command: ReminderCommand) -> ReminderCommandItem {
    match command {
        ReminderCommand::Schedule {
            handle,
            fire_at_ms,
            payload,
        } => ReminderCommandItem {
            kind: "schedule".to_string(),
            notification_id: handle.to_string(),
            channel_id: REMINDER_CHANNEL_ID.to_string(),
            fire_at_epoch_ms: Some(fire_at_ms),
            title: Some(payload.title),
            body: Some(payload.body),
            task_id: Some(payload.task_id.to_string()),
        },
        ReminderCommand::Cancel { handle } => ReminderCommandItem {
            kind: "cancel".to_string(),
            notification_id: handle.to_string(),
            channel_id: REMINDER_CHANNEL_ID.to_string(),
            fire_at_epoch_ms: None,
            title: None,
            body: None,
            task_id: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, init_logging, ping, reminder_route, reminder_stop, run_store_call,
        task_add, task_delete, task_edit, task_toggle, tasks_list, theme_get, theme_toggle,
        to_action_response, CONFIG,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tasknest_core::{
        AddTaskRequest, CoreConfig, KeyValueStore, StoreError, StoreResult,
        DEFAULT_SNOOZE_DELAY_MS,
    };

    static TEST_DB_DIR: OnceLock<tempfile::TempDir> = OnceLock::new();

    /// Points the bridge at a throwaway database before its first DB call.
    fn use_test_db() {
        let dir = TEST_DB_DIR.get_or_init(|| tempfile::tempdir().expect("temp dir"));
        let config = CONFIG.get_or_init(|| CoreConfig {
            db_path: dir.path().join("tasknest-ffi-test.sqlite3"),
            ..CoreConfig::default()
        });
        assert!(config.db_path.starts_with(dir.path()));
    }

    struct LockedStore {
        writes: AtomicUsize,
    }

    impl KeyValueStore for LockedStore {
        fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
            Err(StoreError::Backend("database is locked".to_string()))
        }

        fn set(&self, _key: &str, _value: &[u8]) -> StoreResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_millis() as i64
    }

    fn unique_title(prefix: &str) -> String {
        format!("{prefix}-{}", now_ms())
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "/tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn task_add_with_future_due_returns_schedule_command() {
        use_test_db();
        let title = unique_title("ffi-add");
        let response = task_add(title.clone(), None, "high".to_string(), Some(now_ms() + 3_600_000));
        assert!(response.ok, "{}", response.message);

        let task = response.task.expect("created task");
        assert_eq!(task.title, title);
        assert_eq!(task.priority, "high");
        let handle = task.notification_id.clone().expect("reminder scheduled");

        assert_eq!(response.reminder_commands.len(), 1);
        let command = &response.reminder_commands[0];
        assert_eq!(command.kind, "schedule");
        assert_eq!(command.notification_id, handle);
        assert_eq!(command.task_id.as_deref(), Some(task.id.as_str()));
        assert_eq!(command.channel_id, "alarms");

        let listed = tasks_list();
        assert!(listed.ok, "{}", listed.message);
        assert!(listed.items.iter().any(|item| item.id == task.id));

        let deleted = task_delete(task.id.clone());
        assert!(deleted.ok, "{}", deleted.message);
        assert_eq!(deleted.reminder_commands.len(), 1);
        assert_eq!(deleted.reminder_commands[0].kind, "cancel");
        assert_eq!(deleted.reminder_commands[0].notification_id, handle);
    }

    #[test]
    fn task_add_rejects_blank_title_and_unknown_priority() {
        use_test_db();
        let blank = task_add("   ".to_string(), None, String::new(), None);
        assert!(!blank.ok);
        assert!(blank.message.contains("blank"));
        assert!(blank.reminder_commands.is_empty());

        let bad_priority = task_add("x".to_string(), None, "urgent".to_string(), None);
        assert!(!bad_priority.ok);
        assert!(bad_priority.message.contains("priority"));
    }

    #[test]
    fn toggle_and_edit_round_trip_through_the_bridge() {
        use_test_db();
        let created = task_add(unique_title("ffi-edit"), None, String::new(), None);
        let id = created.task.expect("created task").id;

        let toggled = task_toggle(id.clone());
        assert!(toggled.task.expect("toggled").completed);

        let edited = task_edit(id.clone(), "renamed".to_string(), "low".to_string(), None);
        assert!(edited.ok, "{}", edited.message);
        let task = edited.task.expect("edited task");
        assert_eq!(task.title, "renamed");
        assert_eq!(task.priority, "low");
        assert!(task.completed);

        assert!(task_delete(id).ok);
    }

    #[test]
    fn unknown_task_id_reports_not_found() {
        use_test_db();
        let response = task_toggle("missing-task-id".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("not found"));
    }

    #[test]
    fn reminder_route_requires_task_id() {
        assert!(reminder_route(None, Some("x".to_string()), None).is_none());

        let route = reminder_route(
            Some("t-1".to_string()),
            Some("Buy milk".to_string()),
            Some("n-1".to_string()),
        )
        .expect("route with task id");
        assert_eq!(route.task_id, "t-1");
        assert_eq!(route.task_title, "Buy milk");
        assert_eq!(route.notification_id.as_deref(), Some("n-1"));
    }

    #[test]
    fn reminder_stop_for_unknown_task_still_cancels() {
        use_test_db();
        let response = reminder_stop(
            "missing-task-id".to_string(),
            "gone".to_string(),
            Some("stale-handle".to_string()),
        );
        assert!(!response.ok);
        assert_eq!(response.reminder_commands.len(), 1);
        assert_eq!(response.reminder_commands[0].kind, "cancel");
        assert_eq!(response.reminder_commands[0].notification_id, "stale-handle");
    }

    #[test]
    fn theme_toggle_flips_persisted_theme() {
        use_test_db();
        let before = theme_get(Some("light".to_string())).theme;
        let toggled = theme_toggle(Some("light".to_string()));
        assert!(toggled.message.is_empty(), "{}", toggled.message);
        assert_ne!(toggled.theme, before);
        assert_eq!(theme_get(None).theme, toggled.theme);
    }

    #[test]
    fn unreadable_store_refuses_mutation_without_writing() {
        let kv = LockedStore {
            writes: AtomicUsize::new(0),
        };
        let call = run_store_call(&kv, DEFAULT_SNOOZE_DELAY_MS, |store| {
            store.add(AddTaskRequest::new("should not be saved"))
        });
        assert!(call.is_err());
        assert_eq!(kv.writes.load(Ordering::SeqCst), 0);

        let response = to_action_response("task_add", "Task created.", call);
        assert!(!response.ok);
        assert!(response.message.contains("database is locked"));
        assert!(response.task.is_none());
        assert!(response.reminder_commands.is_empty());
    }
}
