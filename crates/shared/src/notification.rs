use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Pokédex updated";
pub const DEFAULT_BODY: &str = "Catch them all now!";
pub const DEFAULT_ICON: &str = "/poke-icon-192.png";
pub const VIBRATION_PATTERN: [u32; 3] = [200, 100, 200];
/// Every worker notification is grouped under this tag, so a new one replaces
/// the previous one instead of stacking.
pub const NOTIFICATION_TAG: &str = "poke-notify";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPermission {
    #[default]
    Default,
    Granted,
    Denied,
}

impl NotificationPermission {
    pub fn is_granted(self) -> bool {
        self == NotificationPermission::Granted
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vibrate: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Notification {
    /// A page-level notification: no icon, vibration or grouping.
    pub fn simple(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: None,
            vibrate: Vec::new(),
            tag: None,
        }
    }
}

/// Display request fields; anything left out falls back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationPayload {
    pub fn into_notification(self) -> Notification {
        Notification {
            title: self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: self.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: Some(self.icon.unwrap_or_else(|| DEFAULT_ICON.to_string())),
            vibrate: VIBRATION_PATTERN.to_vec(),
            tag: Some(NOTIFICATION_TAG.to_string()),
        }
    }
}
