use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

/// Body of a send request as it arrives from the admin client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub topic: Option<String>,
    pub token: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub action_type: Option<String>,
    pub action_target: Option<String>,
    pub action_label: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Topic(String),
    Token(String),
}

impl Target {
    pub fn address(&self) -> &str {
        match self {
            Target::Topic(topic) => topic,
            Target::Token(token) => token,
        }
    }
}

/// A message in the shape the push channel accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub data: BTreeMap<String, String>,
    #[serde(flatten)]
    pub target: Target,
    pub android: AndroidConfig,
    pub apns: ApnsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndroidConfig {
    pub priority: AndroidPriority,
    pub notification: AndroidNotification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AndroidPriority {
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndroidNotification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsConfig {
    pub payload: ApnsPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<ApnsFcmOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsPayload {
    pub aps: Aps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aps {
    pub alert: ApsAlert,
    pub sound: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApsAlert {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsFcmOptions {
    pub image: String,
}
