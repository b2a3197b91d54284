mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::Path;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, ScopeArgs};
use dotenv::dotenv;
use dupe_garden_core::activity::{Activity, ActivitySink, FanoutSink};
use dupe_garden_core::backend::{DuplicateBackend, HttpBackend};
use dupe_garden_core::stats::DuplicateStats;
use dupe_garden_core::storage::JournalSink;
use dupe_garden_core::{
    AppConfig, DashboardSession, DeleteOutcome, DuplicateRecord, ScanOutcome, SortKey,
};
use progress::CliReporter;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv().ok();

    let guard = logging::init_logger();

    let config = match dupe_garden_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            drop(guard);
            process::exit(1);
        }
    };

    let args = Cli::parse();
    let reporter = Arc::new(CliReporter::new());

    let result = match args.command {
        Some(Commands::Resources { project }) => run_resources(&config, &reporter, &project).await,
        Some(Commands::Collections { project, database }) => {
            run_collections(&config, &reporter, &project, &database).await
        }
        Some(Commands::Scan {
            scope,
            search,
            sort,
            csv,
        }) => run_scan(&config, &reporter, &scope, &search, sort, csv.as_deref()).await,
        Some(Commands::Clean {
            scope,
            search,
            delete_source,
            yes,
        }) => run_clean(&config, &reporter, &scope, &search, delete_source, yes).await,
        Some(Commands::Activities { delete, clear, yes }) => {
            run_activities(&config, &reporter, delete.as_deref(), clear, yes).await
        }
        Some(Commands::History {
            limit,
            delete,
            clear,
            yes,
        }) => run_history(&config, limit, delete, clear, yes),
        Some(Commands::PrintConfig) => run_print_config(&config),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        reporter.finish();
        error!("Error: {:#}", err);
        drop(guard);
        process::exit(1);
    }
}

fn require_user(config: &AppConfig) -> anyhow::Result<&str> {
    if config.user_id.trim().is_empty() {
        bail!("no user configured; set user_id in Config.toml or DUPE_GARDEN_USER_ID");
    }
    Ok(&config.user_id)
}

/// Remote activity log, mirrored into the local journal when one is configured.
fn activity_sink(config: &AppConfig, backend: &HttpBackend) -> Arc<dyn ActivitySink> {
    let remote: Arc<dyn ActivitySink> = Arc::new(backend.clone());
    let Some(path) = config.journal_path() else {
        return remote;
    };
    match JournalSink::open(path) {
        Ok(journal) => {
            let journal: Arc<dyn ActivitySink> = Arc::new(journal);
            Arc::new(FanoutSink::new(vec![remote, journal]))
        }
        Err(e) => {
            warn!("Activity journal at {} unavailable: {}", path, e);
            remote
        }
    }
}

fn open_session(
    config: &AppConfig,
    reporter: &Arc<CliReporter>,
) -> anyhow::Result<DashboardSession> {
    let user_id = require_user(config)?;
    let backend = HttpBackend::new(config)?;
    let activities = activity_sink(config, &backend);
    Ok(DashboardSession::new(user_id, Arc::new(backend), activities).with_reporter(reporter.clone()))
}

async fn run_resources(
    config: &AppConfig,
    reporter: &CliReporter,
    project: &str,
) -> anyhow::Result<()> {
    let user_id = require_user(config)?;
    let backend = HttpBackend::new(config)?;

    reporter.spin(format!("Listing resources of {}...", project));
    let resources = backend.list_resources(user_id, project).await;
    reporter.finish();
    let resources = resources?;

    println!("{}", "Databases".bold());
    if resources.databases.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for db in &resources.databases {
        println!("  {}  {}", db.id.cyan(), db.name);
    }
    println!("{}", "Storage buckets".bold());
    if resources.storages.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for bucket in &resources.storages {
        println!("  {}  {}", bucket.id.cyan(), bucket.name);
    }
    Ok(())
}

async fn run_collections(
    config: &AppConfig,
    reporter: &CliReporter,
    project: &str,
    database: &str,
) -> anyhow::Result<()> {
    let user_id = require_user(config)?;
    let backend = HttpBackend::new(config)?;

    reporter.spin(format!("Listing collections of {}...", database));
    let collections = backend.list_collections(user_id, project, database).await;
    reporter.finish();

    for collection in &collections? {
        println!("{}  {}", collection.id.cyan(), collection.name);
    }
    Ok(())
}

/// Scan and apply the view query. Returns `false` if the scope was already scanning.
async fn scan_into(
    session: &DashboardSession,
    scope: &ScopeArgs,
    search: &str,
    sort: SortKey,
) -> anyhow::Result<bool> {
    let scope = scope.to_scope();
    match session.scan(&scope).await? {
        ScanOutcome::Completed { records } => {
            info!("{} duplicates loaded for {}", records, scope);
        }
        ScanOutcome::AlreadyRunning => {
            println!("A scan of {} is already running", scope);
            return Ok(false);
        }
    }
    session.set_search(search);
    session.set_sort(sort);
    Ok(true)
}

async fn run_scan(
    config: &AppConfig,
    reporter: &Arc<CliReporter>,
    scope: &ScopeArgs,
    search: &str,
    sort: SortKey,
    csv: Option<&Path>,
) -> anyhow::Result<()> {
    let session = open_session(config, reporter)?;
    if !scan_into(&session, scope, search, sort).await? {
        return Ok(());
    }

    let view = session.view();
    match csv {
        Some(path) => {
            write_csv(path, &view)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} duplicates to {}", view.len(), path.display());
        }
        None => print_records(&view),
    }
    println!();
    print_stats(&session.stats());
    Ok(())
}

async fn run_clean(
    config: &AppConfig,
    reporter: &Arc<CliReporter>,
    scope: &ScopeArgs,
    search: &str,
    delete_source: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let session = open_session(config, reporter)?;
    if !scan_into(&session, scope, search, SortKey::default()).await? {
        return Ok(());
    }

    session.select_all();
    let count = session.selection_len();
    if count == 0 {
        println!("No duplicates match; nothing to delete");
        return Ok(());
    }
    print_records(&session.view());

    let prompt = if delete_source {
        format!(
            "Delete {} duplicate(s) {}?",
            count,
            "AND their source data".red().bold()
        )
    } else {
        format!("Delete {} duplicate record(s)?", count)
    };
    if !yes && !prompt_confirm(&prompt, Some(false))? {
        println!("Nothing deleted");
        return Ok(());
    }

    let outcome = session.delete_selected(delete_source).await?;
    info!("{}", delete_summary(&outcome, session.record_count()));
    if outcome.is_partial() {
        warn!("Some deletions failed; the local listing may be out of date until the next scan");
    }
    Ok(())
}

async fn run_activities(
    config: &AppConfig,
    reporter: &CliReporter,
    delete: Option<&str>,
    clear: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let user_id = require_user(config)?;
    let backend = HttpBackend::new(config)?;

    if let Some(activity_id) = delete {
        backend.delete_activity(user_id, activity_id).await?;
        println!("Deleted activity {}", activity_id);
        return Ok(());
    }
    if clear {
        if !yes && !prompt_confirm("Delete ALL of your activities?", Some(false))? {
            println!("Nothing deleted");
            return Ok(());
        }
        let deleted = backend.clear_activities(user_id).await?;
        println!("Deleted {} activities", deleted);
        return Ok(());
    }

    reporter.spin("Fetching activities...");
    let activities = backend.list_activities(user_id).await;
    reporter.finish();

    print_activities(&activities?);
    Ok(())
}

fn run_history(
    config: &AppConfig,
    limit: i64,
    delete: Option<i64>,
    clear: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let user_id = require_user(config)?;
    let Some(path) = config.journal_path() else {
        bail!("the activity journal is disabled (journal_path is empty)");
    };
    let journal = JournalSink::open(path)?;

    if let Some(id) = delete {
        if !journal.delete(user_id, id)? {
            bail!("no journal entry {} for {}", id, user_id);
        }
        println!("Deleted journal entry {}", id);
        return Ok(());
    }
    if clear {
        if !yes && !prompt_confirm("Delete ALL of your journal entries?", Some(false))? {
            println!("Nothing deleted");
            return Ok(());
        }
        println!("Deleted {} journal entries", journal.clear(user_id)?);
        return Ok(());
    }

    print_activities(&journal.recent(user_id, limit)?);
    Ok(())
}

fn run_print_config(config: &AppConfig) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Plain text: the file log layer writes it verbatim.
fn delete_summary(outcome: &DeleteOutcome, left: usize) -> String {
    format!(
        "{} deleted, {} failed, {} left",
        outcome.success_count, outcome.fail_count, left
    )
}

fn print_activities(activities: &[Activity]) {
    if activities.is_empty() {
        println!("{}", "No activity yet".dimmed());
    }
    for activity in activities {
        println!(
            "{}  {:<8} {}",
            activity.timestamp.dimmed(),
            activity.kind.cyan(),
            activity.message
        );
    }
}

fn format_score(record: &DuplicateRecord) -> ColoredString {
    match record.payload.similarity_score {
        Some(score) => {
            let text = format!("{:>5.1}%", score * 100.0);
            if score >= 0.95 {
                text.red()
            } else if score >= 0.85 {
                text.yellow()
            } else {
                text.normal()
            }
        }
        None => format!("{:>6}", "-").dimmed(),
    }
}

fn print_records(records: &[DuplicateRecord]) {
    if records.is_empty() {
        println!("{}", "No duplicates found".dimmed());
        return;
    }
    println!(
        "{}",
        format!(
            "{:<24} {:<32} {:<6} {:>6} {:<8}",
            "ID", "NAME", "TYPE", "SCORE", "STATUS"
        )
        .bold()
    );
    for record in records {
        println!(
            "{:<24} {:<32} {:<6} {} {:<8}",
            record.id.cyan(),
            truncate(record.display_name(), 32),
            record.kind.as_str(),
            format_score(record),
            record.status.as_str()
        );
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn print_stats(stats: &DuplicateStats) {
    println!("{} {}", "Total duplicates:".bold(), stats.total);
    if stats.total == 0 {
        return;
    }

    println!("{}", "By type".bold());
    for (kind, percent) in stats.kind_percentages() {
        let count = stats.by_kind.get(&kind).copied().unwrap_or(0);
        println!("  {:<10} {:>5}  ({:.1}%)", kind, count, percent);
    }
    println!("{}", "By service".bold());
    for (service, count) in &stats.by_service {
        println!("  {:<10} {:>5}", service, count);
    }
    println!("{}", "By status".bold());
    for (status, count) in &stats.by_status {
        println!("  {:<10} {:>5}", status, count);
    }

    println!("{}", "Similarity".bold());
    let widest = stats.similarity.buckets().map(|(_, n)| n).max().unwrap_or(0).max(1);
    for (label, count) in stats.similarity.buckets() {
        let bar = "█".repeat(count * 30 / widest);
        println!("  {:<8} {:>5} {}", label, count, bar.green());
    }
    println!(
        "  mean {}",
        format!("{:.1}%", stats.mean_similarity * 100.0).bold()
    );
}

fn write_csv(path: &Path, records: &[DuplicateRecord]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "id",
        "service",
        "type",
        "name",
        "duplicate_id",
        "original_id",
        "similarity",
        "status",
    ])?;
    for record in records {
        let score = record
            .payload
            .similarity_score
            .map(|s| format!("{:.4}", s))
            .unwrap_or_default();
        writer.write_record([
            record.id.as_str(),
            record.service.as_str(),
            record.kind.as_str(),
            record.payload.name.as_deref().unwrap_or(""),
            record.duplicate_id.as_str(),
            record.original_id.as_str(),
            score.as_str(),
            record.status.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
