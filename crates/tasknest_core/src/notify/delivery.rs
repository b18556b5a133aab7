//! Fired reminder routing.
//!
//! The platform hands back whatever was attached at scheduling time: the
//! notification body, the handle, and a string data map. Core only reads the
//! `taskId` entry and the body; everything else belongs to the host.

use crate::model::task::{NotificationId, TaskId};
use std::collections::HashMap;

/// Data-map key carrying the task id.
pub const TASK_ID_DATA_KEY: &str = "taskId";

/// Raw fired-notification event as delivered by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiredReminder {
    pub handle: Option<NotificationId>,
    pub body: Option<String>,
    pub data: HashMap<String, String>,
}

/// Parameters the alarm screen is opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRoute {
    pub task_id: TaskId,
    pub task_title: String,
    pub notification_id: Option<NotificationId>,
}

/// Extracts the alarm route from a fired reminder.
///
/// Returns `None` when the payload carries no usable `taskId`, which is how
/// unrelated notifications on the same channel are ignored.
pub fn route_fired_reminder(event: &FiredReminder) -> Option<AlarmRoute> {
    let task_id = event
        .data
        .get(TASK_ID_DATA_KEY)
        .and_then(|value| TaskId::parse(value))?;

    Some(AlarmRoute {
        task_id,
        task_title: event.body.clone().unwrap_or_default(),
        notification_id: event.handle.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::{route_fired_reminder, FiredReminder, TASK_ID_DATA_KEY};
    use crate::model::task::NotificationId;

    #[test]
    fn routes_task_id_body_and_handle() {
        let mut event = FiredReminder {
            handle: Some(NotificationId::new("n-7")),
            body: Some("Buy milk".to_string()),
            ..FiredReminder::default()
        };
        event
            .data
            .insert(TASK_ID_DATA_KEY.to_string(), "task-1".to_string());

        let route = route_fired_reminder(&event).expect("payload has taskId");
        assert_eq!(route.task_id.as_str(), "task-1");
        assert_eq!(route.task_title, "Buy milk");
        assert_eq!(route.notification_id, Some(NotificationId::new("n-7")));
    }

    #[test]
    fn payload_without_task_id_is_ignored() {
        let event = FiredReminder {
            body: Some("promo".to_string()),
            ..FiredReminder::default()
        };
        assert!(route_fired_reminder(&event).is_none());
    }
}
