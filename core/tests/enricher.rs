use zentel_core::{
    config::{JoinPolicy, PipelineConfig},
    enricher::{Enricher, ReferenceKind, EMPLOYEE_PLACEHOLDER_COLUMNS},
    error::PipelineError,
    normalizer::{Normalizer, TicketRecord},
    table::RawTable,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn tickets() -> Vec<TicketRecord> {
    let raw = RawTable::from_rows(
        &[
            "Report ID",
            "Operator",
            "Report Channel",
            "Fault Type",
            "State Key",
            "Ticket Status",
        ],
        &[
            &["AXA-1-WLESS", "Alice", "CH01", "No Signal", "LA", "Closed"],
            &["AXA-2-FIBR", "bob", "CH02", "Slow Speed", "NY", "Open"],
            &["AXA-3-WLESS", "", "CH09", "Unknown Fault", "ZZ", "Open"],
        ],
    );
    Normalizer::new(&PipelineConfig::default_test()).normalize(&raw)
}

fn employees() -> RawTable {
    RawTable::from_rows(
        &["Employee Name", "Employee ID", "Manager", "Designation"],
        &[
            &["alice", "E1", "Maria", "Agent"],
            &["BOB", "E2", "Maria", "Senior Agent"],
        ],
    )
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Every ticket survives and employee matching ignores case.
#[test]
fn employee_join_is_case_insensitive_left_join() {
    let enricher = Enricher::new(JoinPolicy::FanOut)
        .with_reference(ReferenceKind::Employee, &employees());
    let table = enricher.enrich(&tickets()).unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(table.rows[0].field("employee_id").as_deref(), Some("E1"));
    assert_eq!(table.rows[1].field("employee_id").as_deref(), Some("E2"));
    assert_eq!(table.rows[1].field("manager").as_deref(), Some("Maria"));

    // UNKNOWN operator has no directory entry.
    assert_eq!(table.rows[2].ticket.operator, "UNKNOWN");
    assert_eq!(table.rows[2].attributes.get("employee_id"), Some(&None));
    assert_eq!(table.rows[2].attributes.get("manager"), Some(&None));
}

/// No directory at all: placeholder columns exist and are all missing.
#[test]
fn absent_employee_table_synthesizes_placeholders() {
    let table = Enricher::new(JoinPolicy::FanOut).enrich(&tickets()).unwrap();
    for column in EMPLOYEE_PLACEHOLDER_COLUMNS {
        assert!(table.has_column(column), "missing placeholder {column}");
        assert!(table.rows.iter().all(|r| r.attributes.get(*column) == Some(&None)));
    }
}

#[test]
fn channel_service_fault_location_joins() {
    let channel = RawTable::from_rows(
        &["Channel Key", "Channel Name"],
        &[&["CH01", "Phone"], &["CH02", "Email"]],
    );
    let service = RawTable::from_rows(
        &["Service Code", "Service Name"],
        &[&["WLESS", "Wireless"], &["FIBR", "Fibre"]],
    );
    let fault = RawTable::from_rows(
        &["Fault", "Fault Group"],
        &[&["No Signal", "Network"], &["Slow Speed", "Performance"]],
    );
    let location = RawTable::from_rows(
        &["State Key", "State Name"],
        &[&["LA", "Lagos"], &["NY", "New York"]],
    );

    let table = Enricher::new(JoinPolicy::FanOut)
        .with_reference(ReferenceKind::Channel, &channel)
        .with_reference(ReferenceKind::ServiceType, &service)
        .with_reference(ReferenceKind::FaultType, &fault)
        .with_reference(ReferenceKind::Location, &location)
        .enrich(&tickets())
        .unwrap();

    let first = &table.rows[0];
    assert_eq!(first.field("channel_name").as_deref(), Some("Phone"));
    assert_eq!(first.field("channel_key").as_deref(), Some("CH01"));
    assert_eq!(first.field("service_name").as_deref(), Some("Wireless"));
    assert_eq!(first.field("fault_group").as_deref(), Some("Network"));
    assert_eq!(first.field("fault").as_deref(), Some("No Signal"));
    assert_eq!(first.field("state_name").as_deref(), Some("Lagos"));

    // Same-name keys are not appended twice.
    assert!(!table.has_column("service_code_service"));
    assert!(!table.has_column("state_key_loc"));

    let last = &table.rows[2];
    for column in ["channel_name", "fault_group", "state_name"] {
        assert_eq!(last.attributes.get(column), Some(&None), "{column} should be missing");
    }
    // WLESS matches even though nothing else did.
    assert_eq!(last.field("service_name").as_deref(), Some("Wireless"));
}

/// Two location rows for one key yield two ticket rows with identical
/// ticket fields.
#[test]
fn duplicate_reference_key_fans_out() {
    let location = RawTable::from_rows(
        &["State Key", "Region"],
        &[&["LA", "South West"], &["LA", "Coastal"], &["NY", "North"]],
    );
    let input = tickets();
    let table = Enricher::new(JoinPolicy::FanOut)
        .with_reference(ReferenceKind::Location, &location)
        .enrich(&input)
        .unwrap();

    assert_eq!(table.len(), 4);
    let la: Vec<_> = table
        .rows
        .iter()
        .filter(|r| r.ticket.report_id == "AXA-1-WLESS")
        .collect();
    assert_eq!(la.len(), 2);
    assert_eq!(la[0].ticket, la[1].ticket);
    assert_eq!(la[0].ticket, input[0]);
    assert_eq!(la[0].field("region").as_deref(), Some("South West"));
    assert_eq!(la[1].field("region").as_deref(), Some("Coastal"));
}

#[test]
fn require_unique_policy_rejects_duplicate_keys() {
    let location = RawTable::from_rows(
        &["State Key", "Region"],
        &[&["LA", "South West"], &["LA", "Coastal"]],
    );
    let err = Enricher::new(JoinPolicy::RequireUnique)
        .with_reference(ReferenceKind::Location, &location)
        .enrich(&tickets())
        .unwrap_err();
    match err {
        PipelineError::DuplicateReferenceKey { table, key } => {
            assert_eq!(table, "location");
            assert_eq!(key, "LA");
        }
        other => panic!("expected DuplicateReferenceKey, got {other:?}"),
    }
}

/// A reference column already present on the ticket is suffixed.
#[test]
fn colliding_reference_column_is_suffixed() {
    let channel = RawTable::from_rows(
        &["Channel Key", "Ticket Status", "Operator"],
        &[&["CH01", "Active", "switchboard"]],
    );
    let table = Enricher::new(JoinPolicy::FanOut)
        .with_reference(ReferenceKind::Channel, &channel)
        .enrich(&tickets())
        .unwrap();

    let first = &table.rows[0];
    assert_eq!(first.ticket.ticket_status.as_deref(), Some("Closed"));
    assert_eq!(first.field("ticket_status").as_deref(), Some("Closed"));
    assert_eq!(first.field("ticket_status_channel").as_deref(), Some("Active"));
    assert_eq!(first.field("operator_channel").as_deref(), Some("switchboard"));
    assert_eq!(first.ticket.operator, "Alice");
}

/// A reference table without its key column matches nothing.
#[test]
fn reference_without_key_column_appends_missing() {
    let fault = RawTable::from_rows(&["Name", "Group"], &[&["No Signal", "Network"]]);
    let table = Enricher::new(JoinPolicy::FanOut)
        .with_reference(ReferenceKind::FaultType, &fault)
        .enrich(&tickets())
        .unwrap();
    assert_eq!(table.len(), 3);
    assert!(table.rows.iter().all(|r| r.attributes.get("group") == Some(&None)));
}

#[test]
fn empty_tickets_short_circuit() {
    let table = Enricher::new(JoinPolicy::FanOut)
        .with_reference(ReferenceKind::Employee, &employees())
        .enrich(&[])
        .unwrap();
    assert!(table.is_empty());
    assert!(table.columns.is_empty());
}
