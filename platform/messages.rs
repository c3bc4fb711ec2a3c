use crate::*;
use serde::{Deserialize, Serialize};

/// Message posted from the worker to page clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub name: MessageName,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kind: Option<MessageKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageName {
    Notification,
    Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Focused,
    Opened,
}

impl ClientMessage {
    pub fn notification(action: &str, kind: MessageKind) -> Self {
        Self {
            name: MessageName::Notification,
            data: action.to_owned(),
            kind: Some(kind),
        }
    }

    pub fn push(payload: &str) -> Self {
        Self {
            name: MessageName::Push,
            data: payload.to_owned(),
            kind: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub body: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    /// Unix epoch milliseconds
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

impl NotificationAction {
    pub fn new(action: &str, title: &str, icon: &str) -> Self {
        Self {
            action: action.to_owned(),
            title: title.to_owned(),
            icon: icon.to_owned(),
        }
    }
}

/// Opaque push credential as serialized by the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PushSubscription(pub serde_json::Value);

impl PushSubscription {
    pub fn endpoint(&self) -> Option<&str> {
        self.0.get("endpoint").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub user_visible_only: bool,
    pub application_server_key: Vec<u8>,
}
