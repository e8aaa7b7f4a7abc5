use crate::domain::analytics::{self, AnalyticsReport, PerformanceReport};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::record::{LinkKind, MessageRecord, NewMessage, ScoreWeights};
use crate::error::{AppError, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::sync::Arc;
use time::OffsetDateTime;

#[derive(Clone, Debug)]
struct Metrics {
    sent_total: Counter<u64>,
    events_total: Counter<u64>,
    analytics_duration_seconds: Histogram<f64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("outreach-tracker");
        Self {
            sent_total: meter
                .u64_counter("outreach_messages_recorded_total")
                .with_description("Sent messages registered with the tracker")
                .build(),
            events_total: meter
                .u64_counter("outreach_engagement_events_total")
                .with_description("Engagement events by kind and outcome")
                .build(),
            analytics_duration_seconds: meter
                .f64_histogram("outreach_analytics_duration_seconds")
                .with_description("Time taken to compute an analytics report")
                .build(),
        }
    }

    fn event(&self, kind: &'static str, outcome: &'static str) {
        self.events_total.add(1, &[KeyValue::new("kind", kind), KeyValue::new("outcome", outcome)]);
    }
}

/// Outcome of applying an engagement event to a known record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    First,
    Replay,
}

/// In-memory conversion tracker shared by every request handler.
///
/// Records live in a sharded map keyed by message id. Every mutation runs under the
/// record's shard write guard, so concurrent events for the same message are serialized.
#[derive(Clone, Debug)]
pub struct TrackerService {
    records: Arc<DashMap<String, MessageRecord>>,
    clock: Arc<dyn Clock>,
    weights: ScoreWeights,
    top_subjects: usize,
    metrics: Metrics,
}

impl TrackerService {
    #[must_use]
    pub fn new(weights: ScoreWeights, top_subjects: usize) -> Self {
        Self::with_clock(weights, top_subjects, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(weights: ScoreWeights, top_subjects: usize, clock: Arc<dyn Clock>) -> Self {
        Self { records: Arc::new(DashMap::new()), clock, weights, top_subjects, metrics: Metrics::new() }
    }

    #[must_use]
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registers a message the send path just delivered.
    ///
    /// # Errors
    /// Returns `AppError::DuplicateRecord` if the id is already tracked; the existing record is untouched.
    #[tracing::instrument(err(level = "warn"), skip(self, message), fields(message_id = %message.message_id))]
    pub fn record_sent(&self, message: NewMessage) -> Result<MessageRecord> {
        match self.records.entry(message.message_id.clone()) {
            Entry::Occupied(_) => {
                self.metrics.sent_total.add(1, &[KeyValue::new("status", "duplicate")]);
                Err(AppError::DuplicateRecord(message.message_id))
            }
            Entry::Vacant(slot) => {
                let record = MessageRecord::new(message, self.clock.now());
                slot.insert(record.clone());
                self.metrics.sent_total.add(1, &[KeyValue::new("status", "recorded")]);
                tracing::debug!(recipient_org = %record.recipient_org, "Message recorded");
                Ok(record)
            }
        }
    }

    /// Records an open at the current time. See [`Self::record_opened_at`].
    ///
    /// # Errors
    /// Returns `AppError::InvalidEvent` if the clock reads earlier than the send time.
    pub fn record_opened(&self, message_id: &str) -> Result<bool> {
        self.record_opened_at(message_id, self.clock.now())
    }

    /// Records an open. Returns `false` for unknown ids; repeated opens are absorbed.
    ///
    /// # Errors
    /// Returns `AppError::InvalidEvent` if `at` precedes the send time.
    #[tracing::instrument(err(level = "debug"), skip(self))]
    pub fn record_opened_at(&self, message_id: &str, at: OffsetDateTime) -> Result<bool> {
        let weights = self.weights;
        self.apply("open", message_id, at, |record| record.apply_open(at, &weights))
    }

    /// Records a click at the current time. See [`Self::record_clicked_at`].
    ///
    /// # Errors
    /// Returns `AppError::InvalidEvent` if the clock reads earlier than the send time.
    pub fn record_clicked(&self, message_id: &str, kind: LinkKind) -> Result<bool> {
        self.record_clicked_at(message_id, kind, self.clock.now())
    }

    /// Records a click. Only the first click on a message is scored.
    ///
    /// # Errors
    /// Returns `AppError::InvalidEvent` if `at` precedes the send time.
    #[tracing::instrument(err(level = "debug"), skip(self))]
    pub fn record_clicked_at(&self, message_id: &str, kind: LinkKind, at: OffsetDateTime) -> Result<bool> {
        let weights = self.weights;
        self.apply("click", message_id, at, |record| record.apply_click(at, kind, &weights))
    }

    /// Records a conversion at the current time. See [`Self::record_converted_at`].
    ///
    /// # Errors
    /// Returns `AppError::InvalidEvent` if the clock reads earlier than the send time.
    pub fn record_converted(&self, message_id: &str) -> Result<bool> {
        self.record_converted_at(message_id, self.clock.now())
    }

    /// Records a conversion and raises the score to the conversion value.
    ///
    /// # Errors
    /// Returns `AppError::InvalidEvent` if `at` precedes the send time.
    #[tracing::instrument(err(level = "debug"), skip(self))]
    pub fn record_converted_at(&self, message_id: &str, at: OffsetDateTime) -> Result<bool> {
        let weights = self.weights;
        let known = self.apply("conversion", message_id, at, |record| record.apply_conversion(at, &weights))?;
        if known {
            tracing::info!(message_id, "Conversion recorded");
        }
        Ok(known)
    }

    fn apply<F>(&self, kind: &'static str, message_id: &str, at: OffsetDateTime, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut MessageRecord) -> bool,
    {
        let Some(mut record) = self.records.get_mut(message_id) else {
            tracing::debug!(kind, "Event for unknown message");
            self.metrics.event(kind, "unknown");
            return Ok(false);
        };

        if !record.accepts_event_at(at) {
            self.metrics.event(kind, "rejected");
            return Err(AppError::InvalidEvent(format!(
                "{kind} at {at} precedes send time {} for message {message_id}",
                record.sent_at
            )));
        }

        let applied = if mutate(record.value_mut()) { Applied::First } else { Applied::Replay };
        let score = record.score;
        drop(record);

        match applied {
            Applied::First => {
                tracing::debug!(kind, score, "Engagement recorded");
                self.metrics.event(kind, "recorded");
            }
            Applied::Replay => self.metrics.event(kind, "replayed"),
        }
        Ok(true)
    }

    /// Returns a copy of the record for `message_id`.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the id is unknown.
    pub fn get_record(&self, message_id: &str) -> Result<MessageRecord> {
        self.records.get(message_id).map(|r| r.value().clone()).ok_or(AppError::NotFound)
    }

    /// Per-message engagement report.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the id is unknown.
    pub fn get_performance(&self, message_id: &str) -> Result<PerformanceReport> {
        self.records.get(message_id).map(|r| PerformanceReport::from(r.value())).ok_or(AppError::NotFound)
    }

    /// Aggregate engagement over messages sent in the trailing `window_days`. A window reaching
    /// past the earliest representable time covers every record.
    #[tracing::instrument(skip(self), fields(records = tracing::field::Empty))]
    pub fn compute_analytics(&self, window_days: u32) -> AnalyticsReport {
        let start = std::time::Instant::now();
        let snapshot = self.snapshot();
        tracing::Span::current().record("records", snapshot.len());

        let report = analytics::aggregate(&snapshot, self.clock.now(), window_days, self.top_subjects);

        self.metrics.analytics_duration_seconds.record(start.elapsed().as_secs_f64(), &[]);
        report
    }

    /// Copies every record, each under its own read guard.
    fn snapshot(&self) -> Vec<MessageRecord> {
        self.records.iter().map(|entry| entry.value().clone()).collect()
    }
}
