//! The pipeline: runs every stage over one set of input tables.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Normalizer      raw ticket table    -> ticket records
//!   2. Enricher        ticket records      -> enriched table
//!   3. SLA calculator  enriched table      -> SLA-evaluated table
//!   4. KPI aggregator  SLA-evaluated table -> operator/manager KPIs
//!
//! RULES:
//!   - Each stage consumes the whole output of the previous one.
//!   - Stages share nothing; each run starts from the raw tables.

use crate::{
    config::PipelineConfig,
    enricher::Enricher,
    error::PipelineResult,
    kpi::{KpiAggregator, KpiReport},
    normalizer::Normalizer,
    sla::{ResolutionCategory, SlaCalculator, SlaRecord, SlaTable},
    stage::PipelineStage,
    table::TableSet,
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub tickets: SlaTable,
    pub kpis: KpiReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub tickets: u64,
    pub escalations: u64,
    pub response_sla_passes: u64,
    pub resolution_sla_passes: u64,
    pub operators: u64,
    pub managers: u64,
    /// Ticket count per resolution category label.
    pub categories: BTreeMap<String, u64>,
}

impl PipelineOutput {
    pub fn summary(&self) -> RunSummary {
        let rows = &self.tickets.rows;
        let categories = ResolutionCategory::ALL
            .iter()
            .map(|c| {
                let n = count_where(rows, |r| r.resolution_category == *c);
                (c.label().to_string(), n)
            })
            .collect();

        RunSummary {
            tickets: rows.len() as u64,
            escalations: count_where(rows, |r| r.escalation),
            response_sla_passes: count_where(rows, |r| r.response_sla_pass),
            resolution_sla_passes: count_where(rows, |r| r.resolution_sla_pass),
            operators: self.kpis.operators.len() as u64,
            managers: self.kpis.managers.len() as u64,
            categories,
        }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    normalizer: Normalizer,
    sla: SlaCalculator,
    kpi: KpiAggregator,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            normalizer: Normalizer::new(&config),
            sla: SlaCalculator::new(config.sla.clone()),
            kpi: KpiAggregator::new(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all four stages over one table set.
    pub fn run(&self, tables: &TableSet) -> PipelineResult<PipelineOutput> {
        let enricher = Enricher::from_tables(tables, self.config.join_policy);

        let tickets = run_stage(&self.normalizer, &tables.service_data)?;
        let enriched = run_stage(&enricher, tickets.as_slice())?;
        let evaluated = run_stage(&self.sla, &enriched)?;
        let kpis = run_stage(&self.kpi, &evaluated)?;

        let output = PipelineOutput {
            tickets: evaluated,
            kpis,
        };
        let summary = output.summary();
        log::info!(
            "pipeline: {} ticket(s), {} escalation(s), {} operator(s), {} manager(s)",
            summary.tickets,
            summary.escalations,
            summary.operators,
            summary.managers
        );
        Ok(output)
    }
}

fn count_where(rows: &[SlaRecord], pred: impl Fn(&SlaRecord) -> bool) -> u64 {
    rows.iter().filter(|r| pred(r)).count() as u64
}

fn run_stage<S: PipelineStage>(stage: &S, input: &S::Input) -> PipelineResult<S::Output> {
    log::debug!("stage {} starting", stage.name());
    let output = stage.run(input)?;
    log::debug!("stage {} done", stage.name());
    Ok(output)
}
