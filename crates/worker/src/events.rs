//! Wire types exchanged with the host runtime.
//!
//! Inbound lines are [`Event`]s tagged by `event`; outbound lines are
//! [`Reply`]s tagged by `reply`.

use offcache_core::{Request, Response};
use serde::{Deserialize, Serialize};

use crate::lifecycle::{ActivateReport, InstallReport};
use crate::routing::RouteClass;
use crate::shortcuts::{Shortcut, ShortcutCandidate};

/// Lifecycle and fetch events delivered by the host.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Install,
    Activate,
    Fetch { id: String, request: Request },
    Message { data: ClientMessage },
}

/// Messages posted by client pages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    UpdateShortcuts {
        #[serde(default)]
        shortcuts: Vec<ShortcutCandidate>,
    },
    SkipWaiting,
    #[serde(other)]
    Unknown,
}

/// Everything the worker writes back: event results and host commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    Installed(InstallReport),
    Activated(ActivateReport),
    Response {
        id: String,
        route: RouteClass,
        response: Response,
    },
    /// The host should perform the request itself.
    Passthrough {
        id: String,
    },
    /// A client message was handled.
    Ack,
    SkipWaiting,
    ClaimClients,
    SetShortcuts {
        shortcuts: Vec<Shortcut>,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        code: i32,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch_event() {
        let line =
            r#"{"event":"fetch","id":"7","request":{"method":"GET","url":"http://localhost:8000/","mode":"navigate"}}"#;
        let event: Event = serde_json::from_str(line).unwrap();
        match event {
            Event::Fetch { id, request } => {
                assert_eq!(id, "7");
                assert!(request.is_navigation());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_messages() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"SKIP_WAITING"}"#).unwrap();
        assert_eq!(msg, ClientMessage::SkipWaiting);

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"UPDATE_SHORTCUTS","shortcuts":[{"name":"A","url":"/r/1"}]}"#).unwrap();
        assert!(matches!(msg, ClientMessage::UpdateShortcuts { shortcuts } if shortcuts.len() == 1));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"CLEAR_EVERYTHING"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Unknown);
    }

    #[test]
    fn test_reply_shapes() {
        let reply = Reply::Passthrough { id: "3".into() };
        assert_eq!(serde_json::to_value(&reply).unwrap(), serde_json::json!({"reply": "passthrough", "id": "3"}));

        let reply = Reply::Activated(ActivateReport { cache: "c-v2".into(), deleted: vec!["c-v1".into()] });
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            serde_json::json!({"reply": "activated", "cache": "c-v2", "deleted": ["c-v1"]})
        );

        let reply = Reply::Error { id: None, code: -32700, message: "bad".into() };
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            serde_json::json!({"reply": "error", "code": -32700, "message": "bad"})
        );
    }
}
