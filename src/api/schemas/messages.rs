use crate::domain::record::{LinkKind, NewMessage};
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

const MAX_MESSAGE_ID_LEN: usize = 256;
const MAX_ADDRESS_LEN: usize = 320;
const MAX_TEXT_LEN: usize = 1024;

/// Payload the send path posts after the provider accepted a message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSentRequest {
    #[serde(default)]
    pub message_id: Option<String>,
    pub recipient_address: String,
    pub recipient_name: String,
    #[serde(default)]
    pub recipient_org: String,
    pub subject: String,
}

impl RecordSentRequest {
    /// Validates the send payload.
    ///
    /// # Errors
    /// Returns an error if a required field is blank or a field is excessively large.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(id) = &self.message_id {
            if id.trim().is_empty() {
                return Err("messageId cannot be blank".into());
            }
            if id.len() > MAX_MESSAGE_ID_LEN {
                return Err(format!("messageId is too long (max {MAX_MESSAGE_ID_LEN} characters)"));
            }
        }

        let address = self.recipient_address.trim();
        if address.is_empty() || !address.contains('@') {
            return Err("recipientAddress must be an email address".into());
        }
        if address.len() > MAX_ADDRESS_LEN {
            return Err(format!("recipientAddress is too long (max {MAX_ADDRESS_LEN} characters)"));
        }

        if self.recipient_name.trim().is_empty() {
            return Err("recipientName cannot be empty".into());
        }
        if self.subject.trim().is_empty() {
            return Err("subject cannot be empty".into());
        }
        for (field, value) in [
            ("recipientName", &self.recipient_name),
            ("recipientOrg", &self.recipient_org),
            ("subject", &self.subject),
        ] {
            if value.len() > MAX_TEXT_LEN {
                return Err(format!("{field} is too long (max {MAX_TEXT_LEN} characters)"));
            }
        }
        Ok(())
    }

    /// Converts into the tracker's input, generating an id when the caller supplied none.
    #[must_use]
    pub fn into_new_message(self) -> NewMessage {
        NewMessage {
            message_id: self.message_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            recipient_address: self.recipient_address.trim().to_string(),
            recipient_name: self.recipient_name.trim().to_string(),
            recipient_org: self.recipient_org.trim().to_string(),
            subject: self.subject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Open,
    Click,
    Conversion,
}

/// Engagement event delivered by the email provider's webhook.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementEventRequest {
    pub kind: EventKind,
    #[serde(default)]
    pub link_kind: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub occurred_at: Option<OffsetDateTime>,
}

impl EngagementEventRequest {
    #[must_use]
    pub fn link_kind(&self) -> LinkKind {
        self.link_kind.as_deref().map_or(LinkKind::General, LinkKind::parse_lenient)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub occurred_at: Option<OffsetDateTime>,
}
