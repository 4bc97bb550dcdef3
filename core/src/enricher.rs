//! Enricher: left-joins the reference tables onto normalized tickets.
//!
//! JOIN ORDER (fixed): employee, channel, service type, fault type, location.
//!
//! RULES:
//!   - Every ticket survives. An unmatched ticket gets `None` for every
//!     column the reference table would have supplied.
//!   - A reference key repeated N times yields N copies of the ticket,
//!     unless the join policy is RequireUnique.
//!   - On a name collision the ticket-side column wins and the incoming
//!     column is suffixed.

use crate::{
    config::JoinPolicy,
    error::{PipelineError, PipelineResult},
    normalizer::{
        TicketRecord, FAULT_TYPE, OPERATOR, REPORT_CHANNEL, REPORT_ID, SERVICE_CODE, STATE_KEY,
        TICKET_FIELDS, TICKET_STATUS,
    },
    stage::PipelineStage,
    table::{RawTable, TableSet},
    types::{Cell, ColumnName},
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Columns synthesized as missing when no employee directory is supplied.
pub const EMPLOYEE_PLACEHOLDER_COLUMNS: &[&str] =
    &["employee_id", "manager_id", "designation", "manager"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Employee,
    Channel,
    ServiceType,
    FaultType,
    Location,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 5] = [
        ReferenceKind::Employee,
        ReferenceKind::Channel,
        ReferenceKind::ServiceType,
        ReferenceKind::FaultType,
        ReferenceKind::Location,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            ReferenceKind::Employee => "employees",
            ReferenceKind::Channel => "channel",
            ReferenceKind::ServiceType => "service_type",
            ReferenceKind::FaultType => "fault_type",
            ReferenceKind::Location => "location",
        }
    }

    /// Ticket-side join column.
    pub fn ticket_key(self) -> &'static str {
        match self {
            ReferenceKind::Employee => OPERATOR,
            ReferenceKind::Channel => REPORT_CHANNEL,
            ReferenceKind::ServiceType => SERVICE_CODE,
            ReferenceKind::FaultType => FAULT_TYPE,
            ReferenceKind::Location => STATE_KEY,
        }
    }

    /// Reference-side join column.
    pub fn reference_key(self) -> &'static str {
        match self {
            ReferenceKind::Employee => "employee_name",
            ReferenceKind::Channel => "channel_key",
            ReferenceKind::ServiceType => SERVICE_CODE,
            ReferenceKind::FaultType => "fault",
            ReferenceKind::Location => STATE_KEY,
        }
    }

    pub fn collision_suffix(self) -> &'static str {
        match self {
            ReferenceKind::Employee => "_emp",
            ReferenceKind::Channel => "_channel",
            ReferenceKind::ServiceType => "_service",
            ReferenceKind::FaultType => "_fault",
            ReferenceKind::Location => "_loc",
        }
    }

    fn case_insensitive(self) -> bool {
        matches!(self, ReferenceKind::Employee)
    }

    /// Key as compared on either side of the join.
    fn join_key(self, value: &str) -> String {
        let trimmed = value.trim();
        if self.case_insensitive() {
            trimmed.to_lowercase()
        } else {
            trimmed.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTicket {
    #[serde(flatten)]
    pub ticket: TicketRecord,
    /// Reference columns appended by the joins, in join order.
    pub attributes: BTreeMap<ColumnName, Cell>,
}

impl EnrichedTicket {
    pub fn from_ticket(ticket: TicketRecord) -> Self {
        Self {
            ticket,
            attributes: BTreeMap::new(),
        }
    }

    /// Look a column up by canonical name across ticket fields, carried
    /// raw columns and joined attributes. Timestamps are not string fields
    /// and read as `None` here.
    pub fn field(&self, column: &str) -> Cell {
        let t = &self.ticket;
        match column {
            REPORT_ID => Some(t.report_id.clone()).filter(|v| !v.is_empty()),
            SERVICE_CODE => Some(t.service_code.clone()).filter(|v| !v.is_empty()),
            OPERATOR => Some(t.operator.clone()),
            TICKET_STATUS => t.ticket_status.clone(),
            REPORT_CHANNEL => t.report_channel.clone(),
            FAULT_TYPE => t.fault_type.clone(),
            STATE_KEY => t.state_key.clone(),
            other => t
                .extra
                .get(other)
                .or_else(|| self.attributes.get(other))
                .cloned()
                .flatten(),
        }
    }
}

/// Output of the enricher: rows plus the schema of appended columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichedTable {
    pub columns: Vec<ColumnName>,
    pub rows: Vec<EnrichedTicket>,
}

impl EnrichedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

pub struct Enricher {
    policy: JoinPolicy,
    references: Vec<(ReferenceKind, RawTable)>,
}

impl Enricher {
    pub fn new(policy: JoinPolicy) -> Self {
        Self {
            policy,
            references: Vec::new(),
        }
    }

    /// Build with every reference table from a loaded table set.
    pub fn from_tables(tables: &TableSet, policy: JoinPolicy) -> Self {
        Self::new(policy)
            .with_reference(ReferenceKind::Employee, &tables.employees)
            .with_reference(ReferenceKind::Channel, &tables.channel)
            .with_reference(ReferenceKind::ServiceType, &tables.service_type)
            .with_reference(ReferenceKind::FaultType, &tables.fault_type)
            .with_reference(ReferenceKind::Location, &tables.location)
    }

    /// Register a reference table. Columns are canonicalized here, once.
    /// Registering the same kind twice replaces the earlier table.
    pub fn with_reference(mut self, kind: ReferenceKind, table: &RawTable) -> Self {
        self.references.retain(|(k, _)| *k != kind);
        self.references.push((kind, table.canonicalized()));
        self
    }

    fn reference(&self, kind: ReferenceKind) -> Option<&RawTable> {
        self.references
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, t)| t)
            .filter(|t| !t.is_empty())
    }

    pub fn enrich(&self, tickets: &[TicketRecord]) -> PipelineResult<EnrichedTable> {
        if tickets.is_empty() {
            return Ok(EnrichedTable::default());
        }

        let mut taken: HashSet<ColumnName> = TICKET_FIELDS.iter().map(|c| c.to_string()).collect();
        taken.extend(tickets.iter().flat_map(|t| t.extra.keys().cloned()));

        let mut table = EnrichedTable {
            columns: Vec::new(),
            rows: tickets.iter().cloned().map(EnrichedTicket::from_ticket).collect(),
        };

        for kind in ReferenceKind::ALL {
            match self.reference(kind) {
                Some(reference) => {
                    table = self.join(table, kind, reference, &mut taken)?;
                }
                None if kind == ReferenceKind::Employee => {
                    synthesize_employee_columns(&mut table, &mut taken);
                }
                None => {}
            }
        }

        log::debug!(
            "enricher: {} ticket(s) in, {} row(s) out, {} column(s) appended",
            tickets.len(),
            table.len(),
            table.columns.len()
        );
        Ok(table)
    }

    fn join(
        &self,
        table: EnrichedTable,
        kind: ReferenceKind,
        reference: &RawTable,
        taken: &mut HashSet<ColumnName>,
    ) -> PipelineResult<EnrichedTable> {
        let ticket_key = kind.ticket_key();
        let reference_key = kind.reference_key();

        // (source index, output name)
        let mut appended: Vec<(usize, ColumnName)> = Vec::new();
        for (idx, column) in reference.columns.iter().enumerate() {
            if column == ticket_key && column == reference_key {
                continue;
            }
            let name = unique_name(column, kind.collision_suffix(), taken);
            taken.insert(name.clone());
            appended.push((idx, name));
        }

        let index = match reference.column_index(reference_key) {
            Some(key_idx) => self.build_index(kind, reference, key_idx)?,
            None => {
                log::warn!(
                    "enricher: {} has no '{}' column, nothing will match",
                    kind.table_name(),
                    reference_key
                );
                HashMap::new()
            }
        };

        let mut columns = table.columns;
        columns.extend(appended.iter().map(|(_, name)| name.clone()));

        let mut rows = Vec::with_capacity(table.rows.len());
        let mut unmatched = 0usize;
        for row in table.rows {
            let matches = row
                .field(ticket_key)
                .map(|k| kind.join_key(&k))
                .and_then(|k| index.get(&k));

            match matches {
                Some(ref_rows) => {
                    for &ref_row in ref_rows {
                        let mut joined = row.clone();
                        for (idx, name) in &appended {
                            joined
                                .attributes
                                .insert(name.clone(), reference.cell(ref_row, *idx));
                        }
                        rows.push(joined);
                    }
                }
                None => {
                    unmatched += 1;
                    let mut joined = row;
                    for (_, name) in &appended {
                        joined.attributes.insert(name.clone(), None);
                    }
                    rows.push(joined);
                }
            }
        }

        if unmatched > 0 {
            log::debug!(
                "enricher: {unmatched} ticket(s) without a {} match",
                kind.table_name()
            );
        }
        Ok(EnrichedTable { columns, rows })
    }

    fn build_index(
        &self,
        kind: ReferenceKind,
        reference: &RawTable,
        key_idx: usize,
    ) -> PipelineResult<HashMap<String, Vec<usize>>> {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for row in 0..reference.len() {
            let Some(key) = reference.cell(row, key_idx) else {
                continue;
            };
            let entry = index.entry(kind.join_key(&key)).or_default();
            if !entry.is_empty() && self.policy == JoinPolicy::RequireUnique {
                return Err(PipelineError::DuplicateReferenceKey {
                    table: kind.table_name().into(),
                    key,
                });
            }
            entry.push(row);
        }
        Ok(index)
    }
}

fn unique_name(column: &str, suffix: &str, taken: &HashSet<ColumnName>) -> ColumnName {
    let mut name = column.to_string();
    while taken.contains(&name) {
        name.push_str(suffix);
    }
    name
}

fn synthesize_employee_columns(table: &mut EnrichedTable, taken: &mut HashSet<ColumnName>) {
    for column in EMPLOYEE_PLACEHOLDER_COLUMNS {
        if !taken.insert(column.to_string()) {
            continue;
        }
        table.columns.push(column.to_string());
        for row in &mut table.rows {
            row.attributes.insert(column.to_string(), None);
        }
    }
    log::debug!("enricher: no employee directory, placeholder columns added");
}

impl PipelineStage for Enricher {
    type Input = [TicketRecord];
    type Output = EnrichedTable;

    fn name(&self) -> &'static str {
        "enricher"
    }

    fn run(&self, input: &[TicketRecord]) -> PipelineResult<EnrichedTable> {
        self.enrich(input)
    }
}
