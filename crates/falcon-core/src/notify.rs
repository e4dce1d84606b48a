use crate::activity::ActivityEvent;
use crate::settings::UserPrefs;
use crate::types::ActivityKind;
use chrono::Local;
use serde::Serialize;
use uuid::Uuid;

/// A short, human-readable rendering of an activity event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub id: String,
    pub order_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Toast {
    pub fn from_event(event: &ActivityEvent) -> Self {
        let p = |key: &str| event.payload.get(key).filter(|v| !v.is_null());
        let text = |key: &str| {
            p(key).map(|v| match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            })
        };

        let (title, body) = match &event.kind {
            ActivityKind::StatusChanged => (
                format!(
                    "Status: {} → {}",
                    text("from").unwrap_or_else(|| "?".into()),
                    text("to").unwrap_or_else(|| "?".into())
                ),
                text("reason").map(|r| format!("Reason: {r}")),
            ),
            ActivityKind::AssigneeChanged => (
                "Assignee changed".to_string(),
                text("to").map(|to| format!("New assignee: {to}")),
            ),
            ActivityKind::FileUploaded => (
                "File uploaded".to_string(),
                text("filename").map(|f| {
                    let bytes = p("bytes").and_then(|v| v.as_u64()).unwrap_or(0);
                    format!("{f} ({bytes} bytes)")
                }),
            ),
            ActivityKind::FileDeleted => ("File deleted".to_string(), text("filename")),
            ActivityKind::AppointmentSet => (
                "Appointment set".to_string(),
                text("start").map(|s| {
                    chrono::DateTime::parse_from_rfc3339(&s)
                        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or(s)
                }),
            ),
            ActivityKind::AppointmentCleared => ("Appointment cleared".to_string(), None),
            ActivityKind::NoteAdded => ("New note".to_string(), text("preview")),
            ActivityKind::OrderArchived => ("Order archived".to_string(), None),
            ActivityKind::OrderRestored => ("Order restored".to_string(), None),
            ActivityKind::Other(kind) => (kind.clone(), event.message.clone()),
        };

        Toast {
            id: event.id.to_string(),
            order_id: event.order_id,
            title,
            body,
        }
    }
}

/// Whether `event` should surface as a toast for user `me`.
///
/// Events the user caused themselves are muted unless they opted out.
pub fn should_notify(event: &ActivityEvent, me: Option<Uuid>, prefs: &UserPrefs) -> bool {
    if !prefs.mute_my_toasts {
        return true;
    }
    match (me, event.actor.as_deref()) {
        (Some(me), Some(actor)) => actor != me.to_string(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: &str, data: serde_json::Value, actor: Option<&str>) -> ActivityEvent {
        serde_json::from_value(json!({
            "id": 41,
            "order_id": "6f1c1b1e-0000-4000-8000-000000000001",
            "event_type": kind,
            "event_data": data,
            "actor": actor,
            "occurred_at": "2026-03-02T10:00:00Z",
        }))
        .unwrap()
    }

    #[test]
    fn status_change_title() {
        let t = Toast::from_event(&event(
            "status_changed",
            json!({"from": "new", "to": "in_review"}),
            None,
        ));
        assert_eq!(t.title, "Status: new → in_review");
        assert_eq!(t.body, None);
        assert_eq!(t.id, "41");
    }

    #[test]
    fn status_change_missing_fields() {
        let t = Toast::from_event(&event("status_changed", json!({"reason": "dup"}), None));
        assert_eq!(t.title, "Status: ? → ?");
        assert_eq!(t.body.as_deref(), Some("Reason: dup"));
    }

    #[test]
    fn file_upload_body() {
        let t = Toast::from_event(&event(
            "file_uploaded",
            json!({"filename": "report.pdf", "bytes": 2048}),
            None,
        ));
        assert_eq!(t.title, "File uploaded");
        assert_eq!(t.body.as_deref(), Some("report.pdf (2048 bytes)"));
    }

    #[test]
    fn unknown_kind_uses_raw_name() {
        let t = Toast::from_event(&event("invoice_sent", json!({}), None));
        assert_eq!(t.title, "invoice_sent");
    }

    #[test]
    fn own_events_muted_by_default() {
        let me = Uuid::parse_str("0b0b0b0b-0000-4000-8000-00000000000b").unwrap();
        let mine = event("note_added", json!({}), Some(&me.to_string()));
        let theirs = event("note_added", json!({}), Some("someone-else"));
        let mut prefs = UserPrefs::default();
        assert!(!should_notify(&mine, Some(me), &prefs));
        assert!(should_notify(&theirs, Some(me), &prefs));
        assert!(should_notify(&mine, None, &prefs));

        prefs.mute_my_toasts = false;
        assert!(should_notify(&mine, Some(me), &prefs));
    }
}
