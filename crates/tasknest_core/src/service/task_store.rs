//! Task store: the single owner of the task list.
//!
//! # Responsibility
//! - Apply add/toggle/edit/delete to the in-memory list and persist it.
//! - Keep exactly one outstanding reminder per task in sync with its due date.
//! - Handle snooze/stop of fired reminders.
//!
//! # Invariants
//! - `notification_id` is set iff the due date was in the future at the
//!   task's last write.
//! - Edit and delete cancel an outstanding reminder before anything else;
//!   edit cancels even when the due date is unchanged.
//! - Persistence and scheduler failures never roll back the in-memory list.
//!   They are logged and queued for `drain_recoverable_errors`.
//!
//! # See also
//! - `crate::model::reminder` for the reminder state machine

use crate::clock::{Clock, SystemClock};
use crate::model::reminder::{
    ReminderEvent, ReminderState, ReminderTransitionError, DEFAULT_SNOOZE_DELAY_MS,
};
use crate::model::task::{
    normalize_title, NotificationId, Priority, Task, TaskId, TaskValidationError,
};
use crate::notify::delivery::AlarmRoute;
use crate::notify::scheduler::{
    ReminderPayload, ReminderRequest, ReminderScheduler, SchedulerError, REMINDER_TITLE,
    SNOOZED_REMINDER_TITLE,
};
use crate::repo::kv_store::{KeyValueStore, StoreError};
use crate::repo::task_list_repo::{load_task_list, save_task_list, TaskListError, TaskListLoad};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller-visible failure of a task store operation. No state changed.
#[derive(Debug)]
pub enum TaskStoreError {
    Validation(TaskValidationError),
    NotFound(TaskId),
    Reminder(ReminderTransitionError),
}

impl Display for TaskStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::Reminder(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Reminder(err) => Some(err),
        }
    }
}

impl From<TaskValidationError> for TaskStoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ReminderTransitionError> for TaskStoreError {
    fn from(value: ReminderTransitionError) -> Self {
        Self::Reminder(value)
    }
}

/// Non-fatal failure captured while the in-memory list stayed authoritative.
#[derive(Debug)]
pub enum RecoverableError {
    /// Stored task list could not be read at startup.
    Load(StoreError),
    /// Stored task list was unreadable and has been replaced by an empty list.
    CorruptTaskList(String),
    /// Writing the task list failed; the next successful write catches up.
    Persistence(TaskListError),
    /// Scheduling or cancelling a reminder failed.
    Scheduler {
        task_id: TaskId,
        error: SchedulerError,
    },
}

impl Display for RecoverableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(err) => write!(f, "task list load failed: {err}"),
            Self::CorruptTaskList(message) => {
                write!(f, "stored task list is malformed: {message}")
            }
            Self::Persistence(err) => write!(f, "task list save failed: {err}"),
            Self::Scheduler { task_id, error } => {
                write!(f, "reminder for task {task_id} failed: {error}")
            }
        }
    }
}

impl Error for RecoverableError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            Self::CorruptTaskList(_) => None,
            Self::Persistence(err) => Some(err),
            Self::Scheduler { error, .. } => Some(error),
        }
    }
}

/// Input for `TaskStore::add`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddTaskRequest {
    pub title: String,
    pub image_uri: Option<String>,
    pub priority: Priority,
    /// Unix epoch milliseconds.
    pub due_date: Option<i64>,
}

impl AddTaskRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Input for `TaskStore::edit`. Image and completion are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditTaskRequest {
    pub title: String,
    pub priority: Priority,
    /// Unix epoch milliseconds; `None` removes the reminder.
    pub due_date: Option<i64>,
}

pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Owner of the task list and its reminder bookkeeping.
pub struct TaskStore<K, S, C = SystemClock> {
    kv: K,
    scheduler: S,
    clock: C,
    tasks: Vec<Task>,
    snooze_delay_ms: i64,
    load_failed: bool,
    recoverable: Vec<RecoverableError>,
}

impl<K: KeyValueStore, S: ReminderScheduler, C: Clock> TaskStore<K, S, C> {
    /// Loads the stored task list and returns a ready store.
    ///
    /// Missing data starts an empty list. Unreadable or malformed data also
    /// starts an empty list and queues a recoverable error.
    pub fn load(kv: K, scheduler: S, clock: C) -> Self {
        let mut recoverable = Vec::new();
        let tasks = match load_task_list(&kv) {
            Ok(TaskListLoad::Loaded(tasks)) => tasks,
            Ok(TaskListLoad::Missing) => Vec::new(),
            Ok(TaskListLoad::Malformed(message)) => {
                warn!("event=task_list_load module=task_store status=error error_code=malformed");
                recoverable.push(RecoverableError::CorruptTaskList(message));
                Vec::new()
            }
            Err(err) => {
                error!(
                    "event=task_list_load module=task_store status=error error_code=read_failed error={err}"
                );
                recoverable.push(RecoverableError::Load(err));
                Vec::new()
            }
        };
        let load_failed = matches!(recoverable.first(), Some(RecoverableError::Load(_)));
        info!(
            "event=task_list_load module=task_store status=ok tasks={}",
            tasks.len()
        );

        Self {
            kv,
            scheduler,
            clock,
            tasks,
            snooze_delay_ms: DEFAULT_SNOOZE_DELAY_MS,
            load_failed,
            recoverable,
        }
    }

    /// Overrides the snooze delay (default ten minutes).
    pub fn with_snooze_delay_ms(mut self, delay_ms: i64) -> Self {
        self.snooze_delay_ms = delay_ms.max(0);
        self
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == *id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// True when the stored list could not be read at startup.
    ///
    /// The in-memory list is empty in that case; callers that must not
    /// overwrite stored data should refuse to mutate.
    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    /// Reminder state of one task as of now.
    pub fn reminder_state(&self, id: &TaskId) -> Option<ReminderState> {
        let now = self.clock.now_ms();
        self.get(id).map(|task| ReminderState::of_task(task, now))
    }

    /// Returns and clears non-fatal failures collected since the last call.
    pub fn drain_recoverable_errors(&mut self) -> Vec<RecoverableError> {
        std::mem::take(&mut self.recoverable)
    }

    /// Creates a task, scheduling a reminder when the due date is ahead.
    ///
    /// # Errors
    /// - `Validation(EmptyTitle)` for a blank title; nothing is scheduled
    ///   or stored.
    pub fn add(&mut self, request: AddTaskRequest) -> TaskStoreResult<Task> {
        let mut task = Task::new(&request.title, request.priority)?;
        task.image_uri = request.image_uri;
        task.due_date = request.due_date;
        task.notification_id = self.request_reminder(&task.id, &task.title, task.due_date);

        info!(
            "event=task_add module=task_store status=ok task_id={} reminder={}",
            task.id,
            task.has_active_reminder()
        );
        self.tasks.push(task.clone());
        self.persist();
        Ok(task)
    }

    /// Flips `completed`. Reminders are not touched.
    pub fn toggle(&mut self, id: &TaskId) -> TaskStoreResult<Task> {
        let index = self.index_of(id)?;
        let task = &mut self.tasks[index];
        task.completed = !task.completed;
        let toggled = task.clone();

        info!(
            "event=task_toggle module=task_store status=ok task_id={} completed={}",
            toggled.id, toggled.completed
        );
        self.persist();
        Ok(toggled)
    }

    /// Replaces title, priority and due date.
    ///
    /// An outstanding reminder is always cancelled first; a replacement is
    /// scheduled only if the new due date is in the future.
    pub fn edit(&mut self, id: &TaskId, request: EditTaskRequest) -> TaskStoreResult<Task> {
        let title = normalize_title(&request.title)?;
        let index = self.index_of(id)?;

        if let Some(handle) = self.tasks[index].notification_id.take() {
            self.cancel_reminder(id, &handle);
        }
        let notification_id = self.request_reminder(id, &title, request.due_date);

        let task = &mut self.tasks[index];
        task.title = title;
        task.priority = request.priority;
        task.due_date = request.due_date;
        task.notification_id = notification_id;
        let edited = task.clone();

        info!(
            "event=task_edit module=task_store status=ok task_id={} reminder={}",
            edited.id,
            edited.has_active_reminder()
        );
        self.persist();
        Ok(edited)
    }

    /// Removes a task after cancelling its outstanding reminder.
    pub fn delete(&mut self, id: &TaskId) -> TaskStoreResult<Task> {
        let index = self.index_of(id)?;
        if let Some(handle) = self.tasks[index].notification_id.clone() {
            self.cancel_reminder(id, &handle);
        }
        let removed = self.tasks.remove(index);

        info!(
            "event=task_delete module=task_store status=ok task_id={}",
            removed.id
        );
        self.persist();
        Ok(removed)
    }

    /// Re-arms a fired reminder `snooze_delay` from now.
    ///
    /// The route's handle is reused when present. The task's due date moves
    /// to the snooze time so the stored record keeps describing the reminder
    /// that is actually outstanding.
    ///
    /// An alarm whose handle no longer matches the task's reminder (the task
    /// was edited after it fired) is ignored and the task is returned
    /// unchanged, so the newer reminder stays the only one outstanding.
    ///
    /// # Errors
    /// - `NotFound` when the task no longer exists; nothing is scheduled.
    /// - `Reminder` when the task has no reminder to snooze.
    pub fn snooze_reminder(&mut self, route: &AlarmRoute) -> TaskStoreResult<Task> {
        let index = self.index_of(&route.task_id)?;
        let now = self.clock.now_ms();

        let task = &self.tasks[index];
        if let (Some(routed), Some(current)) = (&route.notification_id, &task.notification_id) {
            if routed != current {
                debug!(
                    "event=reminder_snooze module=task_store status=skipped task_id={} reason=stale_alarm",
                    route.task_id
                );
                return Ok(task.clone());
            }
        }
        let state = delivered_state(task, now).apply(ReminderEvent::Snooze)?;
        let handle = route
            .notification_id
            .clone()
            .or_else(|| task.notification_id.clone());
        let fire_at_ms = now.saturating_add(self.snooze_delay_ms);
        let request = ReminderRequest {
            handle,
            fire_at_ms,
            payload: ReminderPayload {
                title: SNOOZED_REMINDER_TITLE.to_string(),
                body: task.title.clone(),
                task_id: task.id.clone(),
            },
        };

        let scheduled = match self.scheduler.schedule(request) {
            Ok(handle) => {
                state.apply(ReminderEvent::Schedule)?;
                Some(handle)
            }
            Err(err) => {
                self.record_scheduler_error(&route.task_id, "reminder_snooze", err);
                None
            }
        };

        let task = &mut self.tasks[index];
        if scheduled.is_some() {
            task.due_date = Some(fire_at_ms);
        }
        task.notification_id = scheduled;
        let snoozed = task.clone();

        info!(
            "event=reminder_snooze module=task_store status=ok task_id={} rescheduled={}",
            snoozed.id,
            snoozed.has_active_reminder()
        );
        self.persist();
        Ok(snoozed)
    }

    /// Dismisses a fired reminder.
    ///
    /// The route's handle is cancelled even when the task has since been
    /// deleted. The task's handle is cleared only when it refers to the
    /// fired reminder, so a newer reminder set by an edit survives.
    ///
    /// # Errors
    /// - `NotFound` when the task no longer exists (after cancelling).
    pub fn stop_reminder(&mut self, route: &AlarmRoute) -> TaskStoreResult<Task> {
        if let Some(handle) = &route.notification_id {
            self.cancel_reminder(&route.task_id, handle);
        }
        let index = self.index_of(&route.task_id)?;
        let now = self.clock.now_ms();

        let task = &self.tasks[index];
        let fired_handle = match (&route.notification_id, &task.notification_id) {
            (Some(routed), Some(current)) if routed == current => Some(current.clone()),
            (None, Some(current)) if ReminderState::of_task(task, now) == ReminderState::Fired => {
                Some(current.clone())
            }
            _ => None,
        };

        let Some(handle) = fired_handle else {
            debug!(
                "event=reminder_stop module=task_store status=skipped task_id={} reason=no_matching_reminder",
                route.task_id
            );
            return Ok(task.clone());
        };

        delivered_state(task, now).apply(ReminderEvent::Stop)?;
        if route.notification_id.is_none() {
            self.cancel_reminder(&route.task_id, &handle);
        }

        let task = &mut self.tasks[index];
        task.notification_id = None;
        let stopped = task.clone();

        info!(
            "event=reminder_stop module=task_store status=ok task_id={}",
            stopped.id
        );
        self.persist();
        Ok(stopped)
    }

    fn index_of(&self, id: &TaskId) -> TaskStoreResult<usize> {
        self.tasks
            .iter()
            .position(|task| task.id == *id)
            .ok_or_else(|| {
                debug!("event=task_lookup module=task_store status=not_found task_id={id}");
                TaskStoreError::NotFound(id.clone())
            })
    }

    /// Schedules a reminder for a due date strictly in the future.
    fn request_reminder(
        &mut self,
        task_id: &TaskId,
        title: &str,
        due_date: Option<i64>,
    ) -> Option<NotificationId> {
        let due = due_date?;
        if due <= self.clock.now_ms() {
            debug!(
                "event=reminder_schedule module=task_store status=skipped task_id={task_id} reason=due_not_in_future"
            );
            return None;
        }

        let request = ReminderRequest {
            handle: None,
            fire_at_ms: due,
            payload: ReminderPayload {
                title: REMINDER_TITLE.to_string(),
                body: title.to_string(),
                task_id: task_id.clone(),
            },
        };
        match self.scheduler.schedule(request) {
            Ok(handle) => {
                debug!(
                    "event=reminder_schedule module=task_store status=ok task_id={task_id} fire_at_ms={due}"
                );
                Some(handle)
            }
            Err(err) => {
                self.record_scheduler_error(task_id, "reminder_schedule", err);
                None
            }
        }
    }

    fn cancel_reminder(&mut self, task_id: &TaskId, handle: &NotificationId) {
        match self.scheduler.cancel(handle) {
            Ok(()) => debug!(
                "event=reminder_cancel module=task_store status=ok task_id={task_id}"
            ),
            Err(err) => self.record_scheduler_error(task_id, "reminder_cancel", err),
        }
    }

    fn record_scheduler_error(&mut self, task_id: &TaskId, event: &str, err: SchedulerError) {
        warn!("event={event} module=task_store status=error task_id={task_id} error={err}");
        self.recoverable.push(RecoverableError::Scheduler {
            task_id: task_id.clone(),
            error: err,
        });
    }

    fn persist(&mut self) {
        if let Err(err) = save_task_list(&self.kv, &self.tasks) {
            error!("event=task_list_save module=task_store status=error error={err}");
            self.recoverable.push(RecoverableError::Persistence(err));
        }
    }
}

/// State of a task whose reminder the platform just delivered.
///
/// Delivery is authoritative: a reminder that still looks scheduled by the
/// local clock is treated as fired.
fn delivered_state(task: &Task, now_ms: i64) -> ReminderState {
    let state = ReminderState::of_task(task, now_ms);
    state.apply(ReminderEvent::Fire).unwrap_or(state)
}

#[cfg(test)]
mod tests {
    use super::{delivered_state, AddTaskRequest, TaskStore};
    use crate::clock::FixedClock;
    use crate::model::reminder::ReminderState;
    use crate::model::task::{NotificationId, Priority, Task};
    use crate::notify::scheduler::CommandQueueScheduler;
    use crate::repo::kv_store::InMemoryKeyValueStore;

    #[test]
    fn delivered_state_promotes_scheduled_to_fired() {
        let mut task = Task::new("call mom", Priority::Medium).unwrap();
        task.due_date = Some(10_000);
        task.notification_id = Some(NotificationId::new("n"));
        assert_eq!(delivered_state(&task, 0), ReminderState::Fired);

        task.notification_id = None;
        assert_eq!(delivered_state(&task, 0), ReminderState::Unscheduled);
    }

    #[test]
    fn negative_snooze_delay_is_clamped() {
        let kv = InMemoryKeyValueStore::new();
        let scheduler = CommandQueueScheduler::new();
        let clock = FixedClock::new(0);
        let store = TaskStore::load(&kv, &scheduler, &clock).with_snooze_delay_ms(-5);
        assert_eq!(store.snooze_delay_ms, 0);
    }

    #[test]
    fn add_keeps_image_reference_opaque() {
        let kv = InMemoryKeyValueStore::new();
        let scheduler = CommandQueueScheduler::new();
        let clock = FixedClock::new(0);
        let mut store = TaskStore::load(&kv, &scheduler, &clock);

        let mut request = AddTaskRequest::new("scan receipt");
        request.image_uri = Some("file:///data/photos/receipt.jpg".to_string());
        let task = store.add(request).unwrap();
        assert_eq!(
            task.image_uri.as_deref(),
            Some("file:///data/photos/receipt.jpg")
        );
        assert_eq!(scheduler.pending(), 0);
    }
}
