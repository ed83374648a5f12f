//! Outbound notification shape and payload marshaling

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Delivery priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Deliver immediately
    #[default]
    High,
    /// Deliver at a time that conserves power on the device
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "10",
            Priority::Low => "5",
        }
    }
}

/// `apns-push-type` header values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushType {
    #[default]
    Alert,
    Background,
    Location,
    Voip,
    Complication,
    FileProvider,
    Mdm,
    LiveActivity,
}

impl PushType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushType::Alert => "alert",
            PushType::Background => "background",
            PushType::Location => "location",
            PushType::Voip => "voip",
            PushType::Complication => "complication",
            PushType::FileProvider => "fileprovider",
            PushType::Mdm => "mdm",
            PushType::LiveActivity => "liveactivity",
        }
    }
}

/// Notification body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Already serialized JSON bytes, sent verbatim
    Raw(Vec<u8>),
    /// JSON text, sent verbatim
    Text(String),
    /// Structured value, serialized compactly
    Json(serde_json::Value),
}

impl Payload {
    /// Serialize any value into a structured payload
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Payload::Json)
    }

    pub fn marshal_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Payload::Raw(bytes) => Ok(bytes.clone()),
            Payload::Text(text) => Ok(text.as_bytes().to_vec()),
            Payload::Json(value) => serde_json::to_vec(value),
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Json(serde_json::Value::Object(Default::default()))
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Raw(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Raw(bytes.to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

/// A single notification addressed to one device
#[derive(Debug, Clone, Default)]
pub struct Notification {
    pub device_token: String,
    /// Usually the app bundle id
    pub topic: Option<String>,
    /// Canonical id the gateway echoes back; generated by the gateway when absent
    pub apns_id: Option<Uuid>,
    /// Notifications sharing a collapse id replace each other on the device
    pub collapse_id: Option<String>,
    /// `None` lets the gateway pick; a past instant means "deliver once or drop"
    pub expiration: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub push_type: PushType,
    pub payload: Payload,
}

impl Notification {
    pub fn new(device_token: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self {
            device_token: device_token.into(),
            payload: payload.into(),
            ..Default::default()
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_push_type(mut self, push_type: PushType) -> Self {
        self.push_type = push_type;
        self
    }

    /// Body bytes as sent to the gateway
    pub fn marshal_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        self.payload.marshal_json()
    }
}
