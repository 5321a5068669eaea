use crate::types::message::{
    AndroidConfig, AndroidNotification, AndroidPriority, ApnsConfig, ApnsFcmOptions, ApnsPayload,
    Aps, ApsAlert, MessageRequest, NotificationPayload, Target,
};

use thiserror::Error;

use std::collections::BTreeMap;

pub const DEFAULT_SOUND: &str = "default";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("Missing required fields: title and body are required")]
    MissingContent,
    #[error("Either topic or token must be provided")]
    NoTarget,
}

/// Builds the push payload for a send request. A topic wins over a token when
/// both are given; empty optional fields are left out of the data map.
pub fn compose(request: &MessageRequest) -> Result<NotificationPayload, ComposeError> {
    let (Some(title), Some(body)) = (present(&request.title), present(&request.body)) else {
        return Err(ComposeError::MissingContent);
    };
    let target = match (present(&request.topic), present(&request.token)) {
        (Some(topic), _) => Target::Topic(topic.to_string()),
        (None, Some(token)) => Target::Token(token.to_string()),
        (None, None) => return Err(ComposeError::NoTarget),
    };
    let image_url = present(&request.image_url);

    let mut data = BTreeMap::new();
    data.insert("title".to_string(), title.to_string());
    data.insert("body".to_string(), body.to_string());
    let optional = [
        ("category", &request.category),
        ("priority", &request.priority),
        ("actionType", &request.action_type),
        ("actionTarget", &request.action_target),
        ("actionLabel", &request.action_label),
        ("imageUrl", &request.image_url),
    ];
    for (key, value) in optional {
        if let Some(value) = present(value) {
            data.insert(key.to_string(), value.to_string());
        }
    }

    Ok(NotificationPayload {
        data,
        target,
        android: AndroidConfig {
            priority: AndroidPriority::High,
            notification: AndroidNotification {
                title: title.to_string(),
                body: body.to_string(),
                image: image_url.map(str::to_string),
            },
        },
        apns: ApnsConfig {
            payload: ApnsPayload {
                aps: Aps {
                    alert: ApsAlert {
                        title: title.to_string(),
                        body: body.to_string(),
                    },
                    sound: DEFAULT_SOUND.to_string(),
                },
            },
            fcm_options: image_url.map(|image| ApnsFcmOptions {
                image: image.to_string(),
            }),
        },
    })
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
