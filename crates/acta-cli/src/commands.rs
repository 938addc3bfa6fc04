use std::fs;

use acta_ledger::{ActaError, AuditReport, HistoryRecord, ResultTotals, TallyLedger};
use acta_store::{EntryStore, FileEntryStore};
use acta_types::{Acta, ActaStatus, ActaTemplate, TemporalAnchor, VoteCounts};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use colored::{ColoredString, Colorize};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::cli::*;
use crate::config::ActasConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = ActasConfig::resolve(cli.config.as_deref())?;
    let store_path = cli.store.unwrap_or_else(|| config.store_path.clone());
    debug!(
        store = %store_path.display(),
        node_id = config.node_id,
        strict_totals = config.ledger.strict_totals,
        "configuration resolved"
    );
    let store = FileEntryStore::open(&store_path, config.store_config())
        .with_context(|| format!("opening ledger {}", store_path.display()))?;
    let ledger = TallyLedger::with_config(store, config.ledger);
    execute(&ledger, cli.command, cli.format)
}

pub fn execute<S: EntryStore>(
    ledger: &TallyLedger<S>,
    command: Command,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        Command::Create(args) => cmd_create(ledger, args, format),
        Command::RegisterImage(args) => {
            let acta = ledger.register_image(&args.id, &args.image_ref)?;
            print_updated(&acta, "Registered image for", format)
        }
        Command::Void(args) => {
            let acta = ledger.void(&args.id)?;
            print_updated(&acta, "Voided", format)
        }
        Command::RegisterResults(args) => {
            let votes = VoteCounts::new(
                args.blank,
                args.spoiled,
                args.candidate1,
                args.candidate2,
                args.total,
            );
            let acta = ledger.register_results(&args.id, votes)?;
            print_updated(&acta, "Recorded results for", format)
        }
        Command::Show(args) => {
            let acta = ledger.get_entry(&args.id)?;
            match format {
                OutputFormat::Json => print_json(&acta),
                OutputFormat::Text => {
                    print_acta(&acta);
                    Ok(())
                }
            }
        }
        Command::List(_) => cmd_list(ledger, format),
        Command::Results(_) => {
            let totals = ledger.aggregate()?;
            match format {
                OutputFormat::Json => print_json(&totals),
                OutputFormat::Text => {
                    print_totals(&totals);
                    Ok(())
                }
            }
        }
        Command::History(args) => cmd_history(ledger, &args.id, format),
        Command::Exists(args) => {
            let exists = ledger.exists(&args.id)?;
            match format {
                OutputFormat::Json => print_json(&json!({ "id": args.id, "exists": exists })),
                OutputFormat::Text => {
                    println!("{exists}");
                    Ok(())
                }
            }
        }
        Command::Audit(args) => cmd_audit(ledger, args, format),
    }
}

fn cmd_create<S: EntryStore>(
    ledger: &TallyLedger<S>,
    args: CreateArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let raw = fs::read_to_string(&args.templates)
        .with_context(|| format!("reading templates {}", args.templates.display()))?;
    let templates: Vec<ActaTemplate> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing templates {}", args.templates.display()))?;

    let result = ledger.seed(&templates);
    if let Err(ActaError::BatchIncomplete { ids, .. }) = &result {
        eprintln!(
            "{} batch stopped; {} actas were committed:",
            "!".yellow().bold(),
            ids.len()
        );
        for id in ids {
            eprintln!("  {}", id.cyan());
        }
    }
    let ids = result?;

    match format {
        OutputFormat::Json => print_json(&ids),
        OutputFormat::Text => {
            println!("{} Created {} actas", "✓".green().bold(), ids.len());
            for id in &ids {
                println!("  {}", id.cyan());
            }
            Ok(())
        }
    }
}

fn cmd_list<S: EntryStore>(ledger: &TallyLedger<S>, format: OutputFormat) -> anyhow::Result<()> {
    let actas = ledger.list_all()?;
    if format == OutputFormat::Json {
        return print_json(&actas);
    }
    if actas.is_empty() {
        println!("No actas.");
        return Ok(());
    }
    for acta in &actas {
        println!(
            "{}  {}  junta {}  {}",
            acta.id.cyan(),
            location(acta).dimmed(),
            acta.junta,
            status_label(acta.status)
        );
    }
    println!("{} actas", actas.len().to_string().bold());
    Ok(())
}

fn cmd_history<S: EntryStore>(
    ledger: &TallyLedger<S>,
    id: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let history = ledger.history(id)?;
    if format == OutputFormat::Json {
        let entries: Vec<_> = history.iter().map(history_json).collect();
        return print_json(&entries);
    }
    if history.is_empty() {
        println!("No history for {}.", id.cyan());
        return Ok(());
    }
    for record in &history {
        print_history_record(record);
    }
    Ok(())
}

fn cmd_audit<S: EntryStore>(
    ledger: &TallyLedger<S>,
    args: AuditArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let reports = match &args.id {
        Some(id) => vec![ledger.audit(id)?],
        None => ledger.audit_all()?,
    };

    if format == OutputFormat::Json {
        print_json(&reports)?;
    } else {
        for report in &reports {
            print_audit(report);
        }
    }

    let violations: usize = reports.iter().map(|r| r.violations.len()).sum();
    if violations > 0 {
        anyhow::bail!("audit found {violations} violation(s)");
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_updated(acta: &Acta, action: &str, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(acta),
        OutputFormat::Text => {
            println!("{} {action} acta {}", "✓".green().bold(), acta.id.cyan());
            println!("  Status: {}", status_label(acta.status));
            Ok(())
        }
    }
}

fn print_acta(acta: &Acta) {
    println!("Acta {}", acta.id.cyan().bold());
    println!("  Status:   {}", status_label(acta.status));
    println!("  Location: {}", location(acta));
    println!("  Junta:    {}", acta.junta);
    println!("  Voters:   {}", acta.registered_voters);
    if !acta.image_ref.is_empty() {
        println!("  Image:    {}", acta.image_ref.blue());
    }
    if acta.status == ActaStatus::ResultsRecorded {
        print_votes(acta.votes());
    }
}

fn print_votes(votes: VoteCounts) {
    println!(
        "  Votes:    blank {}  spoiled {}  candidate 1 {}  candidate 2 {}  total {}",
        votes.blank,
        votes.spoiled,
        votes.candidate1,
        votes.candidate2,
        votes.total.to_string().bold()
    );
}

fn print_totals(totals: &ResultTotals) {
    println!("Results over {} actas", totals.actas.to_string().bold());
    println!("  Registered voters: {}", totals.registered_voters);
    println!("  Blank:             {}", totals.blank);
    println!("  Spoiled:           {}", totals.spoiled);
    println!("  Candidate 1:       {}", totals.candidate1.to_string().green());
    println!("  Candidate 2:       {}", totals.candidate2.to_string().green());
    println!("  Total votes:       {}", totals.total.to_string().bold());
    let statuses: Vec<_> = ActaStatus::ALL
        .iter()
        .map(|s| format!("{} {}", totals.by_status.get(*s), s))
        .collect();
    println!("  {}", statuses.join(", ").dimmed());
}

fn print_history_record(record: &HistoryRecord) {
    let header = format!(
        "{}  {}",
        record.version.short_id().yellow(),
        format_anchor(&record.timestamp).dimmed()
    );
    if record.is_delete {
        println!("{header}  {}", "deleted".red());
        return;
    }
    let acta = &record.acta;
    println!("{header}  {}", status_label(acta.status));
    if !acta.image_ref.is_empty() {
        println!("  Image: {}", acta.image_ref.blue());
    }
    if acta.status == ActaStatus::ResultsRecorded {
        print_votes(acta.votes());
    }
}

fn print_audit(report: &AuditReport) {
    if report.is_clean() {
        println!(
            "{} {}  {} versions",
            "✓".green().bold(),
            report.id.cyan(),
            report.versions
        );
        return;
    }
    println!(
        "{} {}  {} versions, {} violations",
        "✗".red().bold(),
        report.id.cyan(),
        report.versions,
        report.violations.len()
    );
    for v in &report.violations {
        println!(
            "  #{} {}  {}: {}",
            v.seq,
            v.version.yellow(),
            v.kind.to_string().red(),
            v.description
        );
    }
}

fn history_json(record: &HistoryRecord) -> serde_json::Value {
    json!({
        "txId": record.version.to_hex(),
        "seq": record.version.seq(),
        "timestamp": format_anchor(&record.timestamp),
        "isDelete": record.is_delete,
        "record": record.acta,
    })
}

fn location(acta: &Acta) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        acta.cda, acta.cargo, acta.provincia, acta.canton, acta.parroquia
    )
}

fn status_label(status: ActaStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        ActaStatus::Created => label.normal(),
        ActaStatus::Registered => label.cyan(),
        ActaStatus::ResultsRecorded => label.green(),
        ActaStatus::Voided => label.red(),
    }
}

/// RFC 3339 wall-clock time of an anchor, or the raw anchor if it does
/// not map to a calendar date.
fn format_anchor(anchor: &TemporalAnchor) -> String {
    i64::try_from(anchor.physical_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| anchor.to_string())
}
