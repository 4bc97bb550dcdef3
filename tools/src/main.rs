//! zentel-runner: headless pipeline runner for service-ticket SLA reports.
//!
//! Usage:
//!   zentel-runner --data-dir ./data
//!   zentel-runner --data-dir ./data --out report.json --csv tickets.csv
//!   zentel-runner --data-dir ./data --strict-joins

use anyhow::{Context, Result};
use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use zentel_core::{
    config::{JoinPolicy, PipelineConfig},
    loader,
    normalizer::TICKET_FIELDS,
    pipeline::{Pipeline, PipelineOutput},
    sla::SlaRecord,
    types::Timestamp,
};

const TIMESTAMP_OUT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(serde::Serialize)]
struct Report<'a> {
    run_id: String,
    generated_at: String,
    data_dir: &'a str,
    summary: zentel_core::pipeline::RunSummary,
    #[serde(flatten)]
    output: &'a PipelineOutput,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");
    let out = string_arg(&args, "--out");
    let csv_out = string_arg(&args, "--csv");
    let strict = args.iter().any(|a| a == "--strict-joins");

    let mut config = PipelineConfig::load(data_dir)
        .with_context(|| format!("loading config from {data_dir}"))?;
    if strict {
        config.join_policy = JoinPolicy::RequireUnique;
    }

    let pipeline = Pipeline::new(config);

    println!("Zentel: SLA pipeline runner");
    println!("  data_dir:  {data_dir}");
    println!("  joins:     {:?}", pipeline.config().join_policy);
    println!();

    let tables = loader::load_tables(data_dir)
        .with_context(|| format!("loading tables from {data_dir}"))?;
    let output = pipeline.run(&tables)?;

    print_summary(&output);

    if let Some(path) = out {
        write_report(path, data_dir, &output)?;
        println!("  report:    {path}");
    }
    if let Some(path) = csv_out {
        write_tickets_csv(path, &output)?;
        println!("  tickets:   {path}");
    }
    Ok(())
}

fn print_summary(output: &PipelineOutput) {
    let summary = output.summary();
    println!("=== RUN SUMMARY ===");
    println!("  tickets:          {}", summary.tickets);
    println!("  escalations:      {}", summary.escalations);
    println!("  response passes:  {}", summary.response_sla_passes);
    println!("  resolution passes:{}", summary.resolution_sla_passes);
    println!("  operators:        {}", summary.operators);
    println!("  managers:         {}", summary.managers);

    println!();
    println!("=== RESOLUTION CATEGORIES ===");
    for (label, count) in &summary.categories {
        println!("  {label:<22} {count}");
    }

    println!();
    println!("=== OPERATORS ===");
    if output.kpis.operators.is_empty() {
        println!("  (No tickets)");
    }
    for (operator, kpi) in &output.kpis.operators {
        println!(
            "  {operator:<20} | tickets: {:>5} | resp: {:>8.2}s | res: {:>8.2}m | pass: {:.3}",
            kpi.total_tickets, kpi.avg_response_seconds, kpi.avg_resolution_minutes, kpi.sla_pass_rate
        );
    }
    if !output.kpis.managers.is_empty() {
        println!();
        println!("=== MANAGERS ===");
        for (manager, kpi) in &output.kpis.managers {
            println!(
                "  {manager:<20} | tickets: {:>5} | resp: {:>8.2}s | res: {:>8.2}m",
                kpi.total_tickets, kpi.avg_response_seconds, kpi.avg_resolution_minutes
            );
        }
    }
    println!();
}

fn write_report(path: &str, data_dir: &str, output: &PipelineOutput) -> Result<()> {
    let report = Report {
        run_id: uuid::Uuid::new_v4().to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        data_dir,
        summary: output.summary(),
        output,
    };
    let file = File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.flush()?;
    Ok(())
}

fn write_tickets_csv(path: &str, output: &PipelineOutput) -> Result<()> {
    let rows = &output.tickets.rows;
    let extra: Vec<String> = rows
        .first()
        .map(|r| r.enriched.ticket.extra.keys().cloned().collect())
        .unwrap_or_default();
    let attributes = &output.tickets.columns;

    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;

    let mut header: Vec<&str> = TICKET_FIELDS.to_vec();
    header.extend(extra.iter().map(String::as_str));
    header.extend(attributes.iter().map(String::as_str));
    header.extend([
        "response_seconds",
        "resolution_seconds",
        "resolution_minutes",
        "response_sla_pass",
        "resolution_sla_pass",
        "escalation",
        "resolution_category",
    ]);
    writer.write_record(&header)?;

    for row in rows {
        writer.write_record(ticket_record(row, &extra, attributes))?;
    }
    writer.flush()?;
    log::info!("wrote {} ticket row(s) to {path}", rows.len());
    Ok(())
}

fn ticket_record(row: &SlaRecord, extra: &[String], attributes: &[String]) -> Vec<String> {
    let t = &row.enriched.ticket;
    let ts = |v: Option<Timestamp>| v.map(|d| d.format(TIMESTAMP_OUT).to_string()).unwrap_or_default();
    let num = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
    let text = |v: &Option<String>| v.clone().unwrap_or_default();

    let mut record = vec![
        t.report_id.clone(),
        t.service_code.clone(),
        t.operator.clone(),
        ts(t.ticket_open_time),
        ts(t.ticket_resp_time),
        ts(t.issue_res_time),
        ts(t.ticket_close_time),
        text(&t.ticket_status),
        text(&t.report_channel),
        text(&t.fault_type),
        text(&t.state_key),
    ];
    record.extend(extra.iter().map(|c| t.extra.get(c).cloned().flatten().unwrap_or_default()));
    record.extend(
        attributes
            .iter()
            .map(|c| row.enriched.attributes.get(c).cloned().flatten().unwrap_or_default()),
    );
    record.extend([
        num(row.response_seconds),
        num(row.resolution_seconds),
        num(row.resolution_minutes),
        row.response_sla_pass.to_string(),
        row.resolution_sla_pass.to_string(),
        row.escalation.to_string(),
        row.resolution_category.to_string(),
    ]);
    record
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
