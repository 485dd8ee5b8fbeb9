use crate::types::{Label, ShadowInterval};
use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub total_minutes: i64,
    pub spans: Vec<ShadowInterval>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub by_label: BTreeMap<Label, LabelSummary>,
    pub longest_shadow: Option<ShadowInterval>,
}

impl Summary {
    pub fn from_intervals(intervals: &[ShadowInterval]) -> Self {
        let mut by_label: BTreeMap<Label, LabelSummary> = BTreeMap::new();
        let mut totals: BTreeMap<Label, Duration> = BTreeMap::new();
        let mut longest_shadow: Option<ShadowInterval> = None;

        for interval in intervals {
            by_label.entry(interval.label).or_default().spans.push(*interval);
            // truncated to minutes only once the label total is known
            *totals.entry(interval.label).or_insert_with(Duration::zero) += interval.duration();

            if interval.label == Label::Shadow
                && longest_shadow.map_or(true, |best| interval.duration() > best.duration())
            {
                longest_shadow = Some(*interval);
            }
        }

        for (label, total) in totals {
            if let Some(summary) = by_label.get_mut(&label) {
                summary.total_minutes = total.num_minutes();
            }
        }

        Self {
            by_label,
            longest_shadow,
        }
    }

    pub fn total_minutes(&self, label: Label) -> i64 {
        self.by_label.get(&label).map_or(0, |s| s.total_minutes)
    }

    pub fn spans(&self, label: Label) -> &[ShadowInterval] {
        self.by_label
            .get(&label)
            .map(|s| s.spans.as_slice())
            .unwrap_or(&[])
    }

    /// Plain-text report with spans in local wall-clock time.
    pub fn render(&self, tz: Tz) -> String {
        let mut out = String::new();
        for label in [Label::Sun, Label::Shadow, Label::Night] {
            let Some(summary) = self.by_label.get(&label) else {
                continue;
            };
            let spans: Vec<String> = summary
                .spans
                .iter()
                .map(|span| format_span(span, tz))
                .collect();
            let _ = writeln!(
                out,
                "{}: {} ({})",
                capitalize(&label.to_string()),
                format_minutes(summary.total_minutes),
                spans.join(", ")
            );
        }
        if let Some(longest) = self.longest_shadow {
            let _ = writeln!(
                out,
                "Longest shadow: {} ({})",
                format_minutes(longest.duration().num_minutes()),
                format_span(&longest, tz)
            );
        }
        out
    }
}

pub fn format_span(span: &ShadowInterval, tz: Tz) -> String {
    format!(
        "{}-{}",
        span.start.with_timezone(&tz).format("%H:%M"),
        span.end.with_timezone(&tz).format("%H:%M")
    )
}

pub fn format_minutes(minutes: i64) -> String {
    let (hours, rest) = (minutes / 60, minutes % 60);
    match (hours, rest) {
        (0, m) => format!("{} min", m),
        (h, 0) => format!("{} h", h),
        (h, m) => format!("{} h {} min", h, m),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
