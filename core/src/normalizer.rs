//! Normalizer: turns the raw ticket table into typed ticket records.
//!
//! Column names are canonicalized, the four timestamp columns are parsed,
//! missing operators become the sentinel and `service_code` is derived from
//! the tail of `report_id`. A cell that cannot be parsed becomes `None`;
//! no row is ever dropped.

use crate::{
    config::PipelineConfig,
    error::PipelineResult,
    stage::PipelineStage,
    table::RawTable,
    timestamp::TimestampParser,
    types::{Cell, ColumnName, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REPORT_ID: &str = "report_id";
pub const SERVICE_CODE: &str = "service_code";
pub const OPERATOR: &str = "operator";
pub const TICKET_OPEN_TIME: &str = "ticket_open_time";
pub const TICKET_RESP_TIME: &str = "ticket_resp_time";
pub const ISSUE_RES_TIME: &str = "issue_res_time";
pub const TICKET_CLOSE_TIME: &str = "ticket_close_time";
pub const TICKET_STATUS: &str = "ticket_status";
pub const REPORT_CHANNEL: &str = "report_channel";
pub const FAULT_TYPE: &str = "fault_type";
pub const STATE_KEY: &str = "state_key";

/// Columns with a dedicated field on TicketRecord.
pub const TICKET_FIELDS: &[&str] = &[
    REPORT_ID,
    SERVICE_CODE,
    OPERATOR,
    TICKET_OPEN_TIME,
    TICKET_RESP_TIME,
    ISSUE_RES_TIME,
    TICKET_CLOSE_TIME,
    TICKET_STATUS,
    REPORT_CHANNEL,
    FAULT_TYPE,
    STATE_KEY,
];

const SERVICE_CODE_SEPARATOR: char = '-';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub report_id: String,
    pub service_code: String,
    pub operator: String,
    pub ticket_open_time: Option<Timestamp>,
    pub ticket_resp_time: Option<Timestamp>,
    pub issue_res_time: Option<Timestamp>,
    pub ticket_close_time: Option<Timestamp>,
    pub ticket_status: Cell,
    pub report_channel: Cell,
    pub fault_type: Cell,
    pub state_key: Cell,
    /// Every other raw column, carried through as-is.
    pub extra: BTreeMap<ColumnName, Cell>,
}

impl TicketRecord {
    /// True if `column` names a field of this record, dedicated or extra.
    pub fn has_field(&self, column: &str) -> bool {
        TICKET_FIELDS.contains(&column) || self.extra.contains_key(column)
    }
}

/// Derive the service code: the segment after the last separator.
pub fn service_code(report_id: &str) -> String {
    match report_id.trim().rsplit_once(SERVICE_CODE_SEPARATOR) {
        Some((_, code)) => code.to_string(),
        None => String::new(),
    }
}

pub struct Normalizer {
    parser: TimestampParser,
    unknown_operator: String,
}

impl Normalizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            parser: TimestampParser::new(config.timestamp_formats.clone()),
            unknown_operator: config.unknown_operator.clone(),
        }
    }

    /// Normalize a raw ticket table. Empty input yields an empty table.
    pub fn normalize(&self, raw: &RawTable) -> Vec<TicketRecord> {
        if raw.is_empty() {
            return Vec::new();
        }
        let table = raw.canonicalized();
        let col = |name: &str| table.column_index(name);

        let report_id = col(REPORT_ID);
        let operator = col(OPERATOR);
        let open = col(TICKET_OPEN_TIME);
        let resp = col(TICKET_RESP_TIME);
        let resolved = col(ISSUE_RES_TIME);
        let close = col(TICKET_CLOSE_TIME);
        let status = col(TICKET_STATUS);
        let channel = col(REPORT_CHANNEL);
        let fault = col(FAULT_TYPE);
        let state = col(STATE_KEY);

        let extra_columns: Vec<(usize, &ColumnName)> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| !TICKET_FIELDS.contains(&name.as_str()))
            .collect();

        let mut unparsed: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut parse_ts = |row: usize, idx: Option<usize>, name: &'static str| -> Option<Timestamp> {
            let idx = idx?;
            let raw_value = table.value(row, idx);
            let parsed = self.parser.parse(raw_value);
            if parsed.is_none() && table.cell(row, idx).is_some() {
                *unparsed.entry(name).or_default() += 1;
            }
            parsed
        };

        let mut tickets = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let id = report_id
                .map(|i| table.value(row, i).trim().to_string())
                .unwrap_or_default();
            let op = operator
                .and_then(|i| table.cell(row, i))
                .unwrap_or_else(|| self.unknown_operator.clone());
            let cell_at = |idx: Option<usize>| idx.and_then(|i| table.cell(row, i));

            tickets.push(TicketRecord {
                service_code: service_code(&id),
                report_id: id,
                operator: op,
                ticket_open_time: parse_ts(row, open, TICKET_OPEN_TIME),
                ticket_resp_time: parse_ts(row, resp, TICKET_RESP_TIME),
                issue_res_time: parse_ts(row, resolved, ISSUE_RES_TIME),
                ticket_close_time: parse_ts(row, close, TICKET_CLOSE_TIME),
                ticket_status: cell_at(status),
                report_channel: cell_at(channel),
                fault_type: cell_at(fault),
                state_key: cell_at(state),
                extra: extra_columns
                    .iter()
                    .map(|(i, name)| ((*name).clone(), table.cell(row, *i)))
                    .collect(),
            });
        }

        for (column, count) in &unparsed {
            log::warn!("normalizer: {count} unparseable value(s) in {column}, set to missing");
        }
        if operator.is_none() {
            log::warn!("normalizer: no operator column, every ticket assigned {}", self.unknown_operator);
        }
        tickets
    }
}

impl PipelineStage for Normalizer {
    type Input = RawTable;
    type Output = Vec<TicketRecord>;

    fn name(&self) -> &'static str {
        "normalizer"
    }

    fn run(&self, input: &RawTable) -> PipelineResult<Vec<TicketRecord>> {
        Ok(self.normalize(input))
    }
}
