use chrono::NaiveDate;
use zentel_core::{
    config::PipelineConfig,
    normalizer::{service_code, Normalizer},
    table::RawTable,
    types::Timestamp,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn normalizer() -> Normalizer {
    Normalizer::new(&PipelineConfig::default_test())
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Timestamp {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// The reference ticket: mixed timestamp layouts, blank operator.
#[test]
fn parses_mixed_formats_and_fills_operator() {
    let raw = RawTable::from_rows(
        &[
            "Report ID",
            "Ticket Open Time",
            "Ticket Resp Time",
            "Issue Res Time",
            "Operator",
            "Report Channel",
        ],
        &[&[
            "AXA-20201231-1101-WLESS",
            "2020/12/31 17:07:04",
            "12/31/2020 17:10",
            "12/31/2020 20:44",
            "",
            "CH01",
        ]],
    );

    let tickets = normalizer().normalize(&raw);
    assert_eq!(tickets.len(), 1);

    let t = &tickets[0];
    assert_eq!(t.report_id, "AXA-20201231-1101-WLESS");
    assert_eq!(t.service_code, "WLESS");
    assert_eq!(t.operator, "UNKNOWN");
    assert_eq!(t.ticket_open_time, Some(at(2020, 12, 31, 17, 7, 4)));
    assert_eq!(t.ticket_resp_time, Some(at(2020, 12, 31, 17, 10, 0)));
    assert_eq!(t.issue_res_time, Some(at(2020, 12, 31, 20, 44, 0)));
    assert_eq!(t.ticket_close_time, None, "absent column reads as missing");
    assert_eq!(t.report_channel.as_deref(), Some("CH01"));
}

/// Without an operator column every ticket gets the sentinel.
#[test]
fn missing_operator_column_defaults_every_row() {
    let raw = RawTable::from_rows(&["report_id"], &[&["A-1"], &["B-2"], &["C-3"]]);
    let tickets = normalizer().normalize(&raw);
    assert!(tickets.iter().all(|t| t.operator == "UNKNOWN"));
}

/// Whitespace-only and NA-style operators are treated as empty.
#[test]
fn blank_operator_values_become_unknown() {
    let raw = RawTable::from_rows(
        &["report_id", "operator"],
        &[&["A-1", "   "], &["A-2", "N/A"], &["A-3", "alice"]],
    );
    let ops: Vec<String> = normalizer()
        .normalize(&raw)
        .into_iter()
        .map(|t| t.operator)
        .collect();
    assert_eq!(ops, vec!["UNKNOWN", "UNKNOWN", "alice"]);
}

/// "NaT" is an ordinary string outside timestamp columns.
#[test]
fn nat_is_a_plain_value_in_text_columns() {
    let raw = RawTable::from_rows(&["report_id", "operator"], &[&["A-1", "NaT"]]);
    let tickets = normalizer().normalize(&raw);
    assert_eq!(tickets[0].operator, "NaT");
}

/// An unparseable timestamp degrades that cell only; the row survives.
#[test]
fn unparseable_timestamp_is_missing_not_fatal() {
    let raw = RawTable::from_rows(
        &["report_id", "ticket_open_time", "ticket_resp_time", "operator"],
        &[&["A-1", "yesterday-ish", "2020-01-01 10:00:05", "bob"]],
    );
    let tickets = normalizer().normalize(&raw);
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].ticket_open_time, None);
    assert_eq!(tickets[0].ticket_resp_time, Some(at(2020, 1, 1, 10, 0, 5)));
    assert_eq!(tickets[0].operator, "bob");
}

/// "Not Available" is a missing marker, not a parse failure.
#[test]
fn not_available_timestamp_is_missing() {
    let raw = RawTable::from_rows(
        &["report_id", "issue_res_time"],
        &[&["A-1", "Not Available"]],
    );
    assert_eq!(normalizer().normalize(&raw)[0].issue_res_time, None);
}

#[test]
fn service_code_takes_last_segment() {
    assert_eq!(service_code("AXA-20201231-1101-WLESS"), "WLESS");
    assert_eq!(service_code("  AXA-1-FIBR  "), "FIBR");
    assert_eq!(service_code("NOSEPARATOR"), "");
    assert_eq!(service_code(""), "");
    assert_eq!(service_code("TRAILING-"), "");
}

/// Without a report_id column the service code is empty.
#[test]
fn missing_report_id_gives_empty_service_code() {
    let raw = RawTable::from_rows(&["operator"], &[&["alice"]]);
    let tickets = normalizer().normalize(&raw);
    assert_eq!(tickets[0].report_id, "");
    assert_eq!(tickets[0].service_code, "");
}

#[test]
fn empty_table_normalizes_to_empty() {
    assert!(normalizer().normalize(&RawTable::default()).is_empty());
    let header_only = RawTable::from_rows(&["report_id", "operator"], &[]);
    assert!(normalizer().normalize(&header_only).is_empty());
}

/// Unknown columns are canonicalized and carried through.
#[test]
fn extra_columns_are_carried_through() {
    let raw = RawTable::from_rows(
        &["Report ID", " Customer Segment ", "Priority"],
        &[&["A-1", "Retail", ""]],
    );
    let t = &normalizer().normalize(&raw)[0];
    assert_eq!(
        t.extra.get("customer_segment").cloned().flatten().as_deref(),
        Some("Retail")
    );
    assert_eq!(t.extra.get("priority"), Some(&None));
    assert!(!t.extra.contains_key("report_id"));
}

/// Input tables are read, never modified.
#[test]
fn input_table_is_untouched() {
    let raw = RawTable::from_rows(&["Report ID", "Operator"], &[&["A-1", ""]]);
    let before = raw.clone();
    let _ = normalizer().normalize(&raw);
    assert_eq!(raw, before);
}
