//! crm-runner: headless operator CLI for the auto-care CRM.
//!
//! Usage:
//!   crm-runner --db crm.db seed --count 200
//!   crm-runner --db crm.db import rows.json --extract-date 2024-05-31
//!   crm-runner --db crm.db --today 2024-06-01 recompute --dry-run
//!   crm-runner --db crm.db summary --json
//!   crm-runner --db crm.db assignments agent1

use anyhow::{Context, Result};
use autocare_core::{
    assignment::daily_call_progress,
    call_outcome::check_follow_up_integrity,
    clock::{Clock, FixedClock, SystemClock},
    config::CrmConfig,
    dashboard::DashboardSummary,
    import_pipeline::{CustomerImportRow, ImportOptions, ImportPipeline},
    recompute_job::{RecomputeJob, RecomputeOptions},
    sample_data::SampleDataGenerator,
    store::CrmStore,
    types::CustomerId,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "crm-runner",
    about = "Auto-care CRM operator CLI",
    long_about = "Seed, import, recompute and inspect the customer lifecycle store.",
    after_help = "Examples:\n  crm-runner --db crm.db seed\n  crm-runner --db crm.db summary --json"
)]
struct Cli {
    /// SQLite database path. `:memory:` keeps everything in this process.
    #[arg(long, global = true, default_value = ":memory:")]
    db: String,

    /// JSON file with rule and import overrides.
    #[arg(long, global = true)]
    config: Option<String>,

    /// Reference date (YYYY-MM-DD) instead of the system date.
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Insert deterministic sample customers")]
    Seed {
        #[arg(long, default_value_t = 50)]
        count: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    #[command(about = "Import customer rows from a JSON array")]
    Import {
        path: String,
        #[arg(long)]
        extract_date: Option<NaiveDate>,
        #[arg(long)]
        dry_run: bool,
    },
    #[command(about = "Recompute inspection dates and tags")]
    Recompute {
        #[arg(long)]
        extract_date: Option<NaiveDate>,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        customer_id: Option<CustomerId>,
        #[arg(long)]
        limit: Option<usize>,
    },
    #[command(about = "Print dashboard counts")]
    Summary {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Repair follow-up flags and report completion")]
    Integrity,
    #[command(about = "Show an agent's open assignments and today's call progress")]
    Assignments {
        agent: String,
        #[arg(long, help = "Include completed and cancelled assignments")]
        all: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CrmConfig::load(path)?,
        None => CrmConfig::default(),
    };
    let clock: Box<dyn Clock> = match cli.today {
        Some(date) => Box::new(FixedClock::at(date)),
        None => Box::new(SystemClock),
    };
    let today = clock.today();

    // For :memory: use a shared-memory URI so every connection opened by
    // this process sees the same database.
    let db_effective = if cli.db == ":memory:" {
        format!("file:crm_{}?mode=memory&cache=shared", clock.now().and_utc().timestamp())
    } else {
        cli.db.clone()
    };
    let store = CrmStore::open(&db_effective)?;
    store.migrate()?;
    log::info!("crm-runner: db={} today={today}", cli.db);

    match cli.command {
        Command::Seed { count, seed } => {
            let mut generator = SampleDataGenerator::with_rules(seed, config.rules.clone());
            let inserted = generator.seed_store(&store, count, today, clock.now())?;
            println!("seeded {inserted} customers (seed {seed})");
            print_summary(&DashboardSummary::compute(&store, today, &config.rules)?);
        }
        Command::Import { path, extract_date, dry_run } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Cannot read {path}"))?;
            let rows: Vec<CustomerImportRow> = serde_json::from_str(&raw)
                .with_context(|| format!("Cannot parse {path}"))?;
            let options = ImportOptions {
                extract_date: extract_date.unwrap_or(today),
                dry_run,
                ..ImportOptions::on(today, path.clone())
            };
            let report = ImportPipeline::new(&store, &config, clock.as_ref()).run(&rows, &options)?;
            println!("=== IMPORT ===");
            println!("  rows:      {}", report.total_rows);
            println!("  new:       {}", report.new_records);
            println!("  updated:   {}", report.updated_records);
            println!("  errors:    {}", report.error_count);
            for err in &report.errors {
                println!("    {err}");
            }
            match &report.upload_id {
                Some(id) => println!("  upload_id: {id}"),
                None => println!("  (dry run, nothing saved)"),
            }
        }
        Command::Recompute { extract_date, dry_run, customer_id, limit } => {
            let options = RecomputeOptions {
                extract_date,
                reference_date: today,
                dry_run,
                customer_id,
                limit,
            };
            let report = RecomputeJob::new(&store, &config, clock.as_ref()).run(&options)?;
            let c = &report.changes;
            println!("=== RECOMPUTE ===");
            println!("  customers:          {}", report.total);
            println!("  succeeded:          {}", report.succeeded);
            println!("  failed:             {}", report.failed);
            println!("  inspection dates:   {}", c.inspection_dates);
            println!("  priorities:         {}", c.priorities);
            println!("  overdue tags:       {}", c.overdue_tags);
            println!("  happy calls:        {}", c.happy_calls);
            println!("  status transitions: {} ({} reactivated)", c.status_transitions, c.reactivations);
            if report.dry_run {
                println!("  (dry run, nothing saved)");
            }
        }
        Command::Summary { json } => {
            let summary = DashboardSummary::compute(&store, today, &config.rules)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Command::Integrity => {
            let report = check_follow_up_integrity(&store)?;
            println!("=== FOLLOW-UP INTEGRITY ===");
            println!("  fixed:      {}", report.fixed);
            println!("  required:   {}", report.total_required);
            println!("  completed:  {}", report.completed);
            println!("  pending:    {}", report.pending);
            println!("  completion: {:.1}%", report.completion_rate);
        }
        Command::Assignments { agent, all } => {
            let progress = daily_call_progress(&store, &agent, today)?;
            println!("=== ASSIGNMENTS {agent} ===");
            println!(
                "  calls today: {} / {} ({:.0}%), remaining {}",
                progress.calls, progress.target, progress.rate, progress.remaining
            );
            for a in store.assignments_for_agent(&agent, !all)? {
                let due = a.due_date.map_or_else(|| "-".to_string(), |d| d.to_string());
                let flag = if a.is_overdue(today) { " OVERDUE" } else { "" };
                println!(
                    "  #{:<5} customer {:<6} {:<7} {:<11} due {due}{flag}",
                    a.id,
                    a.customer_id,
                    a.priority.as_str(),
                    a.status.as_str()
                );
            }
        }
    }
    Ok(())
}

fn print_summary(s: &DashboardSummary) {
    println!("=== DASHBOARD {} ===", s.date);
    println!("  customers:        {}", s.total_customers);
    for (status, n) in &s.by_status {
        println!("    {:<18} {n}", status.as_str());
    }
    for (priority, n) in &s.by_priority {
        println!("    priority {:<9} {n}", priority.as_str());
    }
    println!("  vip:              {}", s.vip);
    println!("  due soon:         {}", s.due_soon);
    println!("  overdue:          {}", s.overdue);
    println!("  frequent:         {}", s.frequent_visitors);
    println!("  first-time lost:  {}", s.first_time_lost);
    println!("  long-term absent: {}", s.long_term_absent);
    println!("  active:           {}", s.active);

    println!();
    println!("=== TODAY'S TARGETS ===");
    for (window, t) in &s.happy_calls {
        println!(
            "  {:<8} {:>4} / {:<4} remaining {:>4} ({:.0}%)",
            window.as_str(),
            t.completed,
            t.total,
            t.remaining,
            t.progress
        );
    }
    for (label, t) in [
        ("overdue", s.overdue_targets),
        ("return", s.returning_targets),
        ("vip", s.vip_targets),
    ] {
        println!(
            "  {label:<8} {:>4} / {:<4} remaining {:>4} ({:.0}%)",
            t.completed, t.total, t.remaining, t.progress
        );
    }
    println!("  calls today: {} ({} connected), target completion {:.0}%",
        s.calls_today, s.connected_today, s.today_target_completion_rate);
    println!("  follow-ups: {} open, {} due today, {} overdue, {} done today",
        s.open_follow_ups, s.follow_ups_due_today, s.overdue_follow_ups, s.follow_up_calls_today);
    println!("  assignments: {} open, {} overdue", s.open_assignments, s.overdue_assignments);
}
