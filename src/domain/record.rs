use serde::Serialize;
use std::fmt;
use time::OffsetDateTime;

/// Which kind of tracked link a prospect clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkKind {
    Meeting,
    #[default]
    General,
}

impl LinkKind {
    /// Parses a link kind leniently. Anything that is not `meeting` is a general link.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("meeting") { Self::Meeting } else { Self::General }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Meeting => "meeting",
            Self::General => "general",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Points awarded per engagement event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreWeights {
    pub open: u32,
    pub meeting_click: u32,
    pub general_click: u32,
    pub conversion: u32,
    pub cap: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self { open: 25, meeting_click: 50, general_click: 15, conversion: 100, cap: 100 }
    }
}

impl ScoreWeights {
    #[must_use]
    pub const fn click(&self, kind: LinkKind) -> u32 {
        match kind {
            LinkKind::Meeting => self.meeting_click,
            LinkKind::General => self.general_click,
        }
    }
}

/// Engagement state of one sent message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub message_id: String,
    pub recipient_address: String,
    pub recipient_name: String,
    pub recipient_org: String,
    pub subject: String,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub opened_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub clicked_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub converted_at: Option<OffsetDateTime>,
    pub score: u32,
}

/// Fields the send path supplies for a new record.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub message_id: String,
    pub recipient_address: String,
    pub recipient_name: String,
    pub recipient_org: String,
    pub subject: String,
}

impl MessageRecord {
    #[must_use]
    pub fn new(message: NewMessage, sent_at: OffsetDateTime) -> Self {
        Self {
            message_id: message.message_id,
            recipient_address: message.recipient_address,
            recipient_name: message.recipient_name,
            recipient_org: message.recipient_org,
            subject: message.subject,
            sent_at,
            opened_at: None,
            clicked_at: None,
            converted_at: None,
            score: 0,
        }
    }

    #[must_use]
    pub const fn is_converted(&self) -> bool {
        self.converted_at.is_some()
    }

    /// Whether `at` is an acceptable timestamp for an engagement event on this record.
    #[must_use]
    pub fn accepts_event_at(&self, at: OffsetDateTime) -> bool {
        at >= self.sent_at
    }

    /// Applies an open. Returns `true` if this was the first open.
    pub fn apply_open(&mut self, at: OffsetDateTime, weights: &ScoreWeights) -> bool {
        if self.opened_at.is_some() {
            return false;
        }
        self.opened_at = Some(at);
        self.add_score(weights.open, weights.cap);
        true
    }

    /// Applies a click. Only the first click awards points, whatever its kind.
    pub fn apply_click(&mut self, at: OffsetDateTime, kind: LinkKind, weights: &ScoreWeights) -> bool {
        if self.clicked_at.is_some() {
            return false;
        }
        self.clicked_at = Some(at);
        self.add_score(weights.click(kind), weights.cap);
        true
    }

    /// Applies a conversion. The timestamp is set once; the score is raised on every call, never past the cap.
    pub fn apply_conversion(&mut self, at: OffsetDateTime, weights: &ScoreWeights) -> bool {
        let first = self.converted_at.is_none();
        if first {
            self.converted_at = Some(at);
        }
        self.score = self.score.max(weights.conversion.min(weights.cap));
        first
    }

    fn add_score(&mut self, points: u32, cap: u32) {
        // never lower a score that is already above the cap
        let raised = self.score.saturating_add(points).min(cap);
        self.score = self.score.max(raised);
    }
}
