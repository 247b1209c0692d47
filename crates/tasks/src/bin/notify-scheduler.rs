//! notify-scheduler — local harness driving scheduled notification rules.
//!
//! Loads rule and event fixtures from JSON files into in-memory stores and
//! ticks a cron loop, invoking the executor for each due rule. Rules run
//! sequentially within a tick, so the "at most one concurrent execution
//! per rule id" precondition holds trivially.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use cron::Schedule;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use vulnwatch_model::{EventRecord, ScheduledRule};
use vulnwatch_publish::PublisherRegistry;
use vulnwatch_tasks::{MemoryEventStore, MemoryRuleStore, RuleExecutor};

// ── CLI ─────────────────────────────────────────────────────────────

/// Drives scheduled notification rules against event snapshot fixtures.
#[derive(Parser, Debug)]
#[command(name = "notify-scheduler", version, about)]
struct Cli {
    /// Path to a JSON file containing an array of scheduled rules.
    #[arg(long, env = "VULNWATCH_RULES", default_value = "config/rules.json")]
    rules: String,

    /// Path to a JSON file containing an array of project events.
    #[arg(long, env = "VULNWATCH_EVENTS")]
    events: Option<String>,

    /// Scheduler tick interval in seconds.
    #[arg(long, env = "VULNWATCH_TICK", default_value_t = 30)]
    tick: u64,
}

/// One event fixture entry: the owning project plus the record itself.
#[derive(Debug, Deserialize)]
struct EventFixture {
    project_id: Uuid,
    #[serde(flatten)]
    event: EventRecord,
}

fn load_rules(path: &str) -> anyhow::Result<Vec<ScheduledRule>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let rules: Vec<ScheduledRule> =
        serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;
    Ok(rules)
}

fn load_events(path: &str) -> anyhow::Result<Vec<EventFixture>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let events: Vec<EventFixture> =
        serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;
    Ok(events)
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let rule_store = Arc::new(MemoryRuleStore::new());
    let event_store = Arc::new(MemoryEventStore::new());

    let mut schedules: HashMap<Uuid, Schedule> = HashMap::new();
    for rule in load_rules(&cli.rules)? {
        if let Err(error) = rule.validate() {
            warn!(rule_id = %rule.id, rule = %rule.name, %error, "skipping invalid rule");
            continue;
        }
        match Schedule::from_str(&rule.normalized_cron()) {
            Ok(schedule) => {
                info!(rule_id = %rule.id, rule = %rule.name, cron = %rule.cron_expression, "loaded rule");
                schedules.insert(rule.id, schedule);
                rule_store.insert(rule);
            }
            Err(error) => {
                warn!(rule_id = %rule.id, %error, "invalid cron expression, skipping rule");
            }
        }
    }
    if schedules.is_empty() {
        anyhow::bail!("no valid rules loaded from {}", cli.rules);
    }

    if let Some(path) = &cli.events {
        let fixtures = load_events(path)?;
        info!(path = %path, count = fixtures.len(), "loaded event fixtures");
        for fixture in fixtures {
            event_store.insert(fixture.project_id, fixture.event);
        }
    }

    let registry = Arc::new(PublisherRegistry::with_defaults());
    let executor = RuleExecutor::new(rule_store, event_store, registry);

    info!(tick = cli.tick, rules = schedules.len(), "notify-scheduler starting");

    let mut last_tick: DateTime<Utc> = Utc::now();
    loop {
        tokio::time::sleep(Duration::from_secs(cli.tick)).await;
        let now = Utc::now();
        for (rule_id, schedule) in &schedules {
            // Due when a cron fire time falls within (last_tick, now].
            let due = schedule
                .after(&last_tick)
                .next()
                .map_or(false, |fire| fire <= now);
            if due {
                executor.run(*rule_id).await;
            }
        }
        last_tick = now;
    }
}
