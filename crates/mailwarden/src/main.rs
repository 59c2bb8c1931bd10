//! `MailWarden` - scheduled mailbox search tool.
//!
//! Diagnostic command-line surface over the core stores: inspect profiles,
//! the schedule, and the query a criteria phrase compiles to. The scheduled
//! pipeline itself is driven by the host application embedding
//! `mailwarden-core`.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Duration, Local};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailwarden_core::schedule::build_triggers;
use mailwarden_core::{
    compile, CredentialStore, ProfileRepository, ScheduleEngine, DEFAULT_DAYS_BACK,
};

const USAGE: &str = "\
mailwarden <command>

Commands:
  status                     Overall state: credentials, profiles, schedule
  profiles                   List profiles with their statistics
  schedule                   Show the schedule and upcoming trigger times
  compile <criteria> [days]  Show the mailbox query a criteria compiles to
";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailwarden=info,mailwarden_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("status") => show_status(),
        Some("profiles") => show_profiles(),
        Some("schedule") => show_schedule(),
        Some("compile") => show_compiled(&args[1..]),
        _ => {
            eprint!("{USAGE}");
            Ok(())
        }
    }
}

/// Config directory: `MAILWARDEN_CONFIG_DIR` override or the platform
/// config directory.
fn config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = env::var("MAILWARDEN_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|base| base.join("mailwarden"))
        .context("no config directory available")
}

fn show_status() -> anyhow::Result<()> {
    let dir = config_dir()?;
    info!(path = %dir.display(), "using config directory");

    let credentials = CredentialStore::new(&dir)?;
    println!(
        "Credentials: {}",
        if credentials.exists() {
            "configured"
        } else {
            "not configured"
        }
    );

    let summary = ProfileRepository::new(&dir)?.summary()?;
    println!(
        "Profiles:    {} total, {} active",
        summary.total_profiles, summary.active_profiles
    );
    println!(
        "Searches:    {} executions, {} emails accumulated",
        summary.total_executions, summary.total_emails_accumulated
    );

    let status = ScheduleEngine::new(&dir)?.status();
    if status.has_config {
        let state = if status.enabled { "enabled" } else { "disabled" };
        println!(
            "Schedule:    {state}{}",
            status
                .description
                .map(|d| format!(" ({d})"))
                .unwrap_or_default()
        );
    } else {
        println!("Schedule:    not configured");
    }
    Ok(())
}

fn show_profiles() -> anyhow::Result<()> {
    let repo = ProfileRepository::new(&config_dir()?)?;
    let stats = repo.aggregated_stats()?;
    if stats.is_empty() {
        println!("No profiles.");
        return Ok(());
    }

    for entry in stats.values() {
        let state = if entry.profile.is_active {
            "active"
        } else {
            "inactive"
        };
        println!("{} [{state}]", entry.profile.name);
        println!("  criteria:    {}", entry.profile.criteria);
        println!(
            "  executions:  {}, last found {}, accumulated {}",
            entry.stats.total_executions,
            entry.stats.current_emails_found,
            entry.stats.total_emails_accumulated
        );
        if let Some(at) = entry.stats.last_execution_at {
            println!("  last run:    {}", at.format("%d/%m/%Y %H:%M:%S"));
        }
    }
    Ok(())
}

fn show_schedule() -> anyhow::Result<()> {
    let engine = ScheduleEngine::new(&config_dir()?)?;
    let Some(config) = engine.current_config() else {
        println!("No schedule configured.");
        return Ok(());
    };

    let state = if config.enabled { "enabled" } else { "disabled" };
    println!("{} [{state}]", config.description());

    if config.enabled {
        let now = Local::now().naive_local();
        let mut upcoming: Vec<_> = build_triggers(&config)?
            .iter()
            .map(|t| t.next_fire(now))
            .collect();
        upcoming.sort_unstable();
        for due in upcoming {
            println!("  next: {}", due.format("%d/%m/%Y %H:%M:%S"));
        }
    }
    Ok(())
}

fn show_compiled(args: &[String]) -> anyhow::Result<()> {
    let Some(criteria) = args.first() else {
        bail!("usage: mailwarden compile <criteria> [days-back]");
    };
    let days_back = match args.get(1) {
        Some(raw) => raw
            .parse::<i64>()
            .with_context(|| format!("invalid days-back value: {raw}"))?,
        None => DEFAULT_DAYS_BACK,
    };

    let since = Local::now().date_naive() - Duration::days(days_back);
    let filter = compile(criteria, since);
    println!("{}", filter.to_query());
    Ok(())
}
