//! KPI aggregator: per-operator and per-manager performance.
//!
//! Averages skip missing values and read 0.0 when a group has none.
//! Group keys are taken verbatim; no case folding happens here.

use crate::{
    error::PipelineResult,
    normalizer::OPERATOR,
    sla::{SlaRecord, SlaTable},
    stage::PipelineStage,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MANAGER: &str = "manager";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorKpi {
    pub total_tickets: u64,
    pub avg_response_seconds: f64,
    pub avg_resolution_minutes: f64,
    pub sla_pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerKpi {
    pub total_tickets: u64,
    pub avg_response_seconds: f64,
    pub avg_resolution_minutes: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub operators: BTreeMap<String, OperatorKpi>,
    pub managers: BTreeMap<String, ManagerKpi>,
}

impl KpiReport {
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty() && self.managers.is_empty()
    }
}

/// Round to `decimals` places. Exact ties go to the even neighbour.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Mean of the present values, 0.0 if there are none.
fn mean_present(values: impl Iterator<Item = Option<f64>>) -> f64 {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0u64), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

struct GroupStats {
    total_tickets: u64,
    avg_response_seconds: f64,
    avg_resolution_minutes: f64,
    sla_pass_rate: f64,
}

fn group_stats(rows: &[&SlaRecord]) -> GroupStats {
    let total = rows.len() as u64;
    let passed = rows.iter().filter(|r| r.response_sla_pass).count() as f64;
    GroupStats {
        total_tickets: total,
        avg_response_seconds: round_to(mean_present(rows.iter().map(|r| r.response_seconds)), 2),
        avg_resolution_minutes: round_to(
            mean_present(rows.iter().map(|r| r.resolution_minutes)),
            2,
        ),
        sla_pass_rate: if total == 0 {
            0.0
        } else {
            round_to(passed / total as f64, 3)
        },
    }
}

/// Group rows by a key; rows whose key is missing are left out.
fn group_by<'a>(
    rows: &'a [SlaRecord],
    key: impl Fn(&SlaRecord) -> Option<String>,
) -> BTreeMap<String, Vec<&'a SlaRecord>> {
    let mut groups: BTreeMap<String, Vec<&SlaRecord>> = BTreeMap::new();
    for row in rows {
        if let Some(k) = key(row) {
            groups.entry(k).or_default().push(row);
        }
    }
    groups
}

#[derive(Debug, Default)]
pub struct KpiAggregator;

impl KpiAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(&self, table: &SlaTable) -> KpiReport {
        if table.is_empty() {
            return KpiReport::default();
        }

        let operators = group_by(&table.rows, |r| r.enriched.field(OPERATOR))
            .into_iter()
            .map(|(operator, rows)| {
                let s = group_stats(&rows);
                let kpi = OperatorKpi {
                    total_tickets: s.total_tickets,
                    avg_response_seconds: s.avg_response_seconds,
                    avg_resolution_minutes: s.avg_resolution_minutes,
                    sla_pass_rate: s.sla_pass_rate,
                };
                (operator, kpi)
            })
            .collect();

        let managers = if table.has_field(MANAGER) {
            group_by(&table.rows, |r| r.enriched.field(MANAGER))
                .into_iter()
                .map(|(manager, rows)| {
                    let s = group_stats(&rows);
                    let kpi = ManagerKpi {
                        total_tickets: s.total_tickets,
                        avg_response_seconds: s.avg_response_seconds,
                        avg_resolution_minutes: s.avg_resolution_minutes,
                    };
                    (manager, kpi)
                })
                .collect()
        } else {
            log::debug!("kpi: no manager column, manager KPIs skipped");
            BTreeMap::new()
        };

        let report = KpiReport {
            operators,
            managers,
        };
        log::debug!(
            "kpi: {} operator(s), {} manager(s)",
            report.operators.len(),
            report.managers.len()
        );
        report
    }
}

impl PipelineStage for KpiAggregator {
    type Input = SlaTable;
    type Output = KpiReport;

    fn name(&self) -> &'static str {
        "kpi_aggregator"
    }

    fn run(&self, input: &SlaTable) -> PipelineResult<KpiReport> {
        Ok(self.aggregate(input))
    }
}
