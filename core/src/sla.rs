//! SLA calculator: per-ticket timing, pass flags, escalation and
//! resolution bucket.
//!
//! Timings:
//!   response   = ticket_resp_time - ticket_open_time
//!   resolution = issue_res_time   - ticket_resp_time
//!
//! A missing timestamp on either side leaves the timing `None`; the
//! boolean flags then read `false` and the category reads `Unknown`.

use crate::{
    config::SlaThresholds,
    enricher::{EnrichedTable, EnrichedTicket},
    error::PipelineResult,
    stage::PipelineStage,
    types::{ColumnName, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statuses that mark a ticket as done.
const DONE_STATUSES: &[&str] = &["completed", "closed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResolutionCategory {
    #[serde(rename = "Less Than 30 Mins")]
    UnderThirtyMinutes,
    #[serde(rename = "30Mins - 1 hour")]
    ThirtyToSixtyMinutes,
    #[serde(rename = "1 hour - 3 hours")]
    OneToThreeHours,
    #[serde(rename = "Greater than 3 hours")]
    OverThreeHours,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl ResolutionCategory {
    pub const ALL: [ResolutionCategory; 5] = [
        ResolutionCategory::UnderThirtyMinutes,
        ResolutionCategory::ThirtyToSixtyMinutes,
        ResolutionCategory::OneToThreeHours,
        ResolutionCategory::OverThreeHours,
        ResolutionCategory::Unknown,
    ];

    /// Bucket a resolution time. 180 minutes exactly is still 1-3 hours.
    pub fn from_minutes(minutes: Option<f64>) -> Self {
        match minutes {
            None => ResolutionCategory::Unknown,
            Some(m) if m < 30.0 => ResolutionCategory::UnderThirtyMinutes,
            Some(m) if m < 60.0 => ResolutionCategory::ThirtyToSixtyMinutes,
            Some(m) if m <= 180.0 => ResolutionCategory::OneToThreeHours,
            Some(_) => ResolutionCategory::OverThreeHours,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResolutionCategory::UnderThirtyMinutes => "Less Than 30 Mins",
            ResolutionCategory::ThirtyToSixtyMinutes => "30Mins - 1 hour",
            ResolutionCategory::OneToThreeHours => "1 hour - 3 hours",
            ResolutionCategory::OverThreeHours => "Greater than 3 hours",
            ResolutionCategory::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ResolutionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaRecord {
    #[serde(flatten)]
    pub enriched: EnrichedTicket,
    pub response_seconds: Option<f64>,
    pub resolution_seconds: Option<f64>,
    pub resolution_minutes: Option<f64>,
    pub response_sla_pass: bool,
    pub resolution_sla_pass: bool,
    pub escalation: bool,
    pub resolution_category: ResolutionCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlaTable {
    /// Appended reference columns carried over from enrichment.
    pub columns: Vec<ColumnName>,
    pub rows: Vec<SlaRecord>,
}

impl SlaTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
            || self
                .rows
                .first()
                .is_some_and(|row| row.enriched.ticket.has_field(name))
    }
}

/// Seconds from `start` to `end`, exact to the nanosecond. Spans too long
/// for nanosecond counts fall back to milliseconds.
pub fn seconds_between(start: Option<Timestamp>, end: Option<Timestamp>) -> Option<f64> {
    let (start, end) = (start?, end?);
    let delta = end - start;
    Some(match delta.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => delta.num_milliseconds() as f64 / 1000.0,
    })
}

pub struct SlaCalculator {
    thresholds: SlaThresholds,
}

impl SlaCalculator {
    pub fn new(thresholds: SlaThresholds) -> Self {
        Self { thresholds }
    }

    pub fn evaluate(&self, ticket: &EnrichedTicket) -> SlaRecord {
        let t = &ticket.ticket;
        let response_seconds = seconds_between(t.ticket_open_time, t.ticket_resp_time);
        let resolution_seconds = seconds_between(t.ticket_resp_time, t.issue_res_time);
        let resolution_minutes = resolution_seconds.map(|s| s / 60.0);

        let response_sla_pass =
            response_seconds.is_some_and(|s| s <= self.thresholds.response_seconds);
        let resolution_sla_pass =
            resolution_minutes.is_some_and(|m| m <= self.thresholds.resolution_minutes);

        let overdue = resolution_minutes.is_some_and(|m| m > self.thresholds.resolution_minutes);
        let done_without_resolution = t
            .ticket_status
            .as_deref()
            .is_some_and(|s| DONE_STATUSES.contains(&s.trim().to_lowercase().as_str()))
            && t.issue_res_time.is_none();

        SlaRecord {
            enriched: ticket.clone(),
            response_seconds,
            resolution_seconds,
            resolution_minutes,
            response_sla_pass,
            resolution_sla_pass,
            escalation: overdue || done_without_resolution,
            resolution_category: ResolutionCategory::from_minutes(resolution_minutes),
        }
    }

    pub fn compute(&self, table: &EnrichedTable) -> SlaTable {
        if table.is_empty() {
            return SlaTable::default();
        }
        let rows: Vec<SlaRecord> = table.rows.iter().map(|t| self.evaluate(t)).collect();
        let escalated = rows.iter().filter(|r| r.escalation).count();
        log::debug!(
            "sla: evaluated {} ticket(s), {escalated} escalated",
            rows.len()
        );
        SlaTable {
            columns: table.columns.clone(),
            rows,
        }
    }
}

impl PipelineStage for SlaCalculator {
    type Input = EnrichedTable;
    type Output = SlaTable;

    fn name(&self) -> &'static str {
        "sla_calculator"
    }

    fn run(&self, input: &EnrichedTable) -> PipelineResult<SlaTable> {
        Ok(self.compute(input))
    }
}
