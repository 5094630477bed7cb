//! Request and response types for the Circuit REST API.
//!
//! Only identifiers are required; everything else is optional and any field
//! the server adds lands in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response of `POST /oauth/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token type (usually "Bearer").
    pub token_type: Option<String>,
    /// Token lifetime in seconds. Reported by the server, not enforced.
    pub expires_in: Option<u64>,
    /// Granted scope.
    pub scope: Option<String>,
}

/// A direct or group conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation id.
    pub conv_id: String,
    /// Conversation type (`DIRECT`, `GROUP`, ...).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub conversation_type: Option<String>,
    /// Topic of a group conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// User ids of the participants.
    #[serde(default)]
    pub participants: Vec<String>,
    /// User id of the creator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
    /// Creation time (Unix milliseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<i64>,
    /// Last modification time (Unix milliseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_time: Option<i64>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A message (item) in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationItem {
    /// Item id; pass it as `item_id` to edit this message.
    pub item_id: String,
    /// Conversation the item belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conv_id: Option<String>,
    /// Item type (`TEXT`, `SYSTEM`, ...).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    /// User id of the author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
    /// Creation time (Unix milliseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<i64>,
    /// Text body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<ItemText>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Text content of a conversation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemText {
    /// Message body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Message subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A user profile, either the caller's own or another user's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User id.
    pub user_id: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// First name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Primary email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    /// Account state (`ACTIVE`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_state: Option<String>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Presence of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPresence {
    /// User id.
    pub user_id: String,
    /// Presence state (`AVAILABLE`, `AWAY`, `BUSY`, `OFFLINE`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Whether the user opted out of presence sharing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_opted_out: Option<bool>,
    /// Free-text status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Optional settings for [`CircuitClient::create_message`](crate::CircuitClient::create_message).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageOptions {
    /// Message subject.
    pub subject: Option<String>,
    /// Existing item to edit instead of posting a new message.
    pub item_id: Option<String>,
    /// Additional payload fields, sent verbatim.
    pub extra: Map<String, Value>,
}

impl MessageOptions {
    /// Options with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Edit the item with this id.
    #[must_use]
    pub fn with_item_id(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    /// Add an extra payload field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Relative path of the message endpoint for `conv`.
    pub(crate) fn path(&self, conv: &str) -> String {
        let conv = urlencoding::encode(conv);
        match &self.item_id {
            Some(item_id) => format!(
                "/conversations/{conv}/messages/{}",
                urlencoding::encode(item_id)
            ),
            None => format!("/conversations/{conv}/messages"),
        }
    }

    /// JSON body for a message with `text` as content.
    ///
    /// Extra fields may override `content`; `item_id` never appears.
    pub(crate) fn payload(&self, text: &str) -> Value {
        let mut body = Map::new();
        body.insert("content".to_string(), Value::String(text.to_string()));
        for (key, value) in &self.extra {
            if key != "item_id" && key != "itemId" {
                body.insert(key.clone(), value.clone());
            }
        }
        if let Some(subject) = &self.subject {
            body.insert("subject".to_string(), Value::String(subject.clone()));
        }
        Value::Object(body)
    }
}
