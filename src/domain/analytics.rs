use crate::domain::record::MessageRecord;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub window_days: u32,
    /// `None` when the window reaches past the earliest representable time, i.e. all records.
    #[serde(with = "time::serde::rfc3339::option")]
    pub window_start: Option<OffsetDateTime>,
    pub total_sent: usize,
    pub total_opened: usize,
    pub total_clicked: usize,
    pub total_converted: usize,
    pub open_rate: f64,
    pub click_rate: f64,
    pub conversion_rate: f64,
    pub average_score: f64,
    pub top_subjects: Vec<SubjectPerformance>,
    pub conversions: Vec<ConversionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPerformance {
    pub subject: String,
    pub sent_count: usize,
    pub converted_count: usize,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionSummary {
    pub message_id: String,
    pub recipient_name: String,
    pub recipient_address: String,
    pub recipient_org: String,
    pub subject: String,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub converted_at: OffsetDateTime,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub message_id: String,
    pub recipient_name: String,
    pub recipient_address: String,
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
    #[serde(rename = "timeToConversionSecs", serialize_with = "serialize_whole_seconds")]
    pub time_to_conversion: Option<Duration>,
}

impl From<&MessageRecord> for PerformanceReport {
    fn from(record: &MessageRecord) -> Self {
        Self {
            message_id: record.message_id.clone(),
            recipient_name: record.recipient_name.clone(),
            recipient_address: record.recipient_address.clone(),
            recipient_org: record.recipient_org.clone(),
            subject: record.subject.clone(),
            sent_at: record.sent_at,
            opened_at: record.opened_at,
            clicked_at: record.clicked_at,
            converted_at: record.converted_at,
            score: record.score,
            time_to_conversion: record.converted_at.map(|converted| converted - record.sent_at),
        }
    }
}

fn serialize_whole_seconds<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => serializer.serialize_some(&d.whole_seconds()),
        None => serializer.serialize_none(),
    }
}

/// Percentage of `part` in `whole`, rounded to two decimals. Zero when `whole` is zero.
#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Orders subject groups: best conversion rate first, then larger samples, then subject text.
fn rank_subjects(a: &SubjectPerformance, b: &SubjectPerformance) -> Ordering {
    // compare converted/sent exactly by cross-multiplying
    let lhs = a.converted_count * b.sent_count;
    let rhs = b.converted_count * a.sent_count;
    rhs.cmp(&lhs).then_with(|| b.sent_count.cmp(&a.sent_count)).then_with(|| a.subject.cmp(&b.subject))
}

/// Aggregates a snapshot of records into a report over the trailing `window_days`.
#[must_use]
pub fn aggregate(records: &[MessageRecord], now: OffsetDateTime, window_days: u32, top_n: usize) -> AnalyticsReport {
    let window_start = now.checked_sub(Duration::days(i64::from(window_days)));
    let in_window: Vec<&MessageRecord> =
        records.iter().filter(|r| window_start.is_none_or(|start| r.sent_at >= start)).collect();

    let total_sent = in_window.len();
    let total_opened = in_window.iter().filter(|r| r.opened_at.is_some()).count();
    let total_clicked = in_window.iter().filter(|r| r.clicked_at.is_some()).count();
    let total_converted = in_window.iter().filter(|r| r.is_converted()).count();

    #[allow(clippy::cast_precision_loss)]
    let average_score = if total_sent == 0 {
        0.0
    } else {
        let sum: u64 = in_window.iter().map(|r| u64::from(r.score)).sum();
        round2(sum as f64 / total_sent as f64)
    };

    let mut groups: HashMap<&str, (usize, usize)> = HashMap::new();
    for record in &in_window {
        let entry = groups.entry(record.subject.as_str()).or_default();
        entry.0 += 1;
        if record.is_converted() {
            entry.1 += 1;
        }
    }

    let mut top_subjects: Vec<SubjectPerformance> = groups
        .into_iter()
        .map(|(subject, (sent_count, converted_count))| SubjectPerformance {
            subject: subject.to_string(),
            sent_count,
            converted_count,
            conversion_rate: percent(converted_count, sent_count),
        })
        .collect();
    top_subjects.sort_by(rank_subjects);
    top_subjects.truncate(top_n);

    let mut conversions: Vec<ConversionSummary> = in_window
        .iter()
        .filter_map(|r| {
            r.converted_at.map(|converted_at| ConversionSummary {
                message_id: r.message_id.clone(),
                recipient_name: r.recipient_name.clone(),
                recipient_address: r.recipient_address.clone(),
                recipient_org: r.recipient_org.clone(),
                subject: r.subject.clone(),
                sent_at: r.sent_at,
                converted_at,
                score: r.score,
            })
        })
        .collect();
    conversions.sort_by(|a, b| a.converted_at.cmp(&b.converted_at).then_with(|| a.message_id.cmp(&b.message_id)));

    AnalyticsReport {
        window_days,
        window_start,
        total_sent,
        total_opened,
        total_clicked,
        total_converted,
        open_rate: percent(total_opened, total_sent),
        click_rate: percent(total_clicked, total_sent),
        conversion_rate: percent(total_converted, total_sent),
        average_score,
        top_subjects,
        conversions,
    }
}
