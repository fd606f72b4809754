use chrono::{DateTime, Utc};
use compact_str::{CompactString, format_compact};
use derive_builder::Builder;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::id::{MessageId, UserId};

/// Messaging platform a bot account lives on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Viber,
    Telegram,
    #[serde(other)]
    Unknown,
}

/// Direction of a message relative to the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    #[default]
    In,
    Out,
}

/// Wire representation of a bot user account
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: UserId,
    pub platform: Platform,
    pub platform_user_id: CompactString,
    pub username: CompactString,
    pub display_name: CompactString,
    #[serde(default)]
    pub phone_number: Option<CompactString>,
    pub language_code: CompactString,
    pub is_active: bool,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of the user listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPage {
    pub users: Vec<UserDto>,
    pub total: u64,
}

/// Wire representation of one message
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: MessageId,
    pub user_id: UserId,
    pub platform: Platform,
    pub message_type: CompactString,
    pub content: CompactString,
    #[serde(default)]
    pub media_url: Option<CompactString>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub direction: MessageDirection,
    pub status: CompactString,
    pub created_at: DateTime<Utc>,
    /// Sender profile, present on the global feed
    #[serde(default)]
    pub user: Option<MessageUser>,
}

/// Sender profile embedded in message feeds
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUser {
    pub id: UserId,
    pub username: CompactString,
    pub display_name: CompactString,
    pub platform: Platform,
}

/// Aggregated bot statistics for the overview dashboard
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_users: u64,
    pub messages_today: u64,
    pub total_messages: u64,
    pub active_sessions: u64,
    pub platforms: PlatformBreakdown,
}

/// Per-platform share of the user base
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformBreakdown {
    pub viber: PlatformShare,
    pub telegram: PlatformShare,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformShare {
    pub users: u64,
    pub percentage: f64,
}

/// Backend health probe response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthStatus {
    pub status: CompactString,
    pub timestamp: DateTime<Utc>,
    pub environment: CompactString,
}

/// Outcome of a broadcast submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BroadcastOutcome {
    pub success: bool,
    pub message: CompactString,
}

/// Outcome of registering webhooks with both platforms
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookSetupOutcome {
    pub success: bool,
    pub results: WebhookResults,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookResults {
    pub telegram: WebhookTarget,
    pub viber: WebhookTarget,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookTarget {
    pub success: bool,
    pub url: CompactString,
}

/// Response wrapper for single-user endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserResponse {
    pub user: UserDto,
}

/// Response wrapper for message feed endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageDto>,
}

/// Response wrapper for single-message endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    pub message: MessageDto,
}

/// Response wrapper for the overview statistics endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsResponse {
    pub stats: OverviewStats,
}

/// Payload for registering a user account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub platform: Platform,
    pub platform_user_id: CompactString,
    pub username: CompactString,
    pub display_name: CompactString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<CompactString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Partial update for a user account; unset fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Builder)]
#[builder(default, setter(into, strip_option))]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<CompactString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<CompactString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Payload for recording a message
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub user_id: UserId,
    pub platform: Platform,
    pub message_type: CompactString,
    pub content: CompactString,
    pub direction: MessageDirection,
    pub status: CompactString,
}

/// Payload for a broadcast submission
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastRequest {
    pub text: CompactString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Viber => "viber",
            Platform::Telegram => "telegram",
            Platform::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = CompactString;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "viber" => Ok(Platform::Viber),
            "telegram" => Ok(Platform::Telegram),
            other => Err(format_compact!("Unknown platform: {other}")),
        }
    }
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageDirection::In => "in",
            MessageDirection::Out => "out",
        }
    }
}

impl UserDto {
    /// Human-facing name, falling back to the platform username
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }
}

impl UserPage {
    pub fn active_count(&self) -> usize {
        self.users.iter().filter(|u| u.is_active).count()
    }
}

impl MessageDto {
    pub fn is_inbound(&self) -> bool {
        self.direction == MessageDirection::In
    }
}

impl OverviewStats {
    /// Total users counted across platform shares
    pub fn platform_users(&self) -> u64 {
        self.platforms.viber.users + self.platforms.telegram.users
    }
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok") || self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Distinct senders appearing in a message feed, in feed order
pub fn distinct_senders(messages: &[MessageDto]) -> Vec<&MessageUser> {
    messages
        .iter()
        .filter_map(|m| m.user.as_ref())
        .unique_by(|u| &u.id)
        .collect()
}
