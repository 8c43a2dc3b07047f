//! Subcommands - every one of them goes through the dashboard service.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Subcommand;
use tracing::info;

use checklist::{Catalog, StatusEnum};
use devstatus_engine::{
    DashboardService, EventDraft, EvidenceType, ExportFormat, ManualUpdate, StatusRecord,
};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay a JSON list of events against the selected environment
    Simulate {
        /// File holding a JSON array of events
        #[arg(short, long)]
        events: PathBuf,
    },

    /// Set the status of an item by hand
    Update {
        /// Subcategory id (e.g. s_dev_docker)
        subcategory: String,
        /// not_started, in_progress, blocked, done or verified
        status: StatusEnum,
        /// Why the status changed
        #[arg(short, long)]
        reason: String,
        /// Link to supporting evidence
        #[arg(long)]
        evidence_url: Option<String>,
        /// Kind of the linked evidence
        #[arg(long, default_value = "pr")]
        evidence_type: EvidenceType,
    },

    /// Comment on an item
    Comment {
        /// Subcategory id
        subcategory: String,
        /// Comment text
        text: String,
    },

    /// Show the status board and summary
    Status {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export a status report
    Export {
        /// json or csv
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the checklist items tracked in the selected environment
    Catalog,

    /// Show the activity feed, newest first
    Activity {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        count: usize,
    },
}

/// Run one subcommand and return what should be printed.
pub async fn execute(
    service: &DashboardService,
    catalog: &Catalog,
    command: Commands,
) -> anyhow::Result<String> {
    match command {
        Commands::Simulate { events } => {
            let raw = tokio::fs::read_to_string(&events)
                .await
                .with_context(|| format!("reading {}", events.display()))?;
            let drafts: Vec<EventDraft> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing events in {}", events.display()))?;

            let count = drafts.len();
            let last_seen = service.activity().await?.first().map(|e| e.id.clone());
            for draft in drafts {
                let event = service.simulate_event(draft).await?;
                info!(event_id = %event.id, kind = event.kind.type_name(), "Event submitted");
            }
            service.settle().await?;

            let mut out = format!("Replayed {count} events\n");
            let activity = service.activity().await?;
            let new_entries = activity
                .iter()
                .take_while(|e| Some(&e.id) != last_seen.as_ref());
            for entry in new_entries {
                writeln!(out, "[{}] {}", entry.kind.as_str(), entry.message)?;
            }
            Ok(out)
        }

        Commands::Update {
            subcategory,
            status,
            reason,
            evidence_url,
            evidence_type,
        } => {
            let mut update = ManualUpdate::new(subcategory.clone(), status, reason);
            if let Some(url) = evidence_url {
                update = update.with_evidence(url, evidence_type);
            }
            let env = service.selected_environment().await?;
            match service.manual_update(update).await? {
                Some(record) => Ok(format!(
                    "{} is now {} in {}\n",
                    title_of(catalog, &record),
                    record.status.label(),
                    env.name
                )),
                None => bail!("{subcategory} is not tracked in {}", env.name),
            }
        }

        Commands::Comment { subcategory, text } => {
            let env = service.selected_environment().await?;
            match service.add_comment(subcategory.clone(), text).await? {
                Some(record) => Ok(format!(
                    "Comment added to {} ({} total)\n",
                    title_of(catalog, &record),
                    record.comments.len()
                )),
                None => bail!("{subcategory} is not tracked in {}", env.name),
            }
        }

        Commands::Status { json } => {
            let records = service.records(None).await?;
            if json {
                return Ok(serde_json::to_string_pretty(&records)? + "\n");
            }

            let env = service.selected_environment().await?;
            let summary = service.summary(None).await?;
            let mut out = format!(
                "{} ({}): {}% complete, {} of {} items, {} required remaining\n",
                env.name,
                env.id,
                summary.percent_complete,
                summary.done + summary.verified,
                summary.total,
                summary.required_remaining
            );
            for record in &records {
                writeln!(
                    out,
                    "  {:<12} {:<40} {:>3}%  {}",
                    record.status.as_str(),
                    title_of(catalog, record),
                    record.confidence_score,
                    record.last_updated_by
                )?;
            }
            Ok(out)
        }

        Commands::Export { format, output } => {
            let report = service.export(None, format).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &report)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    Ok(format!("Report exported as {} to {}\n", format.label(), path.display()))
                }
                None => Ok(report),
            }
        }

        Commands::Catalog => {
            let env = service.selected_environment().await?;
            let mut out = format!("{} ({})\n", env.name, env.id);
            for category in catalog.categories_for(env.name) {
                writeln!(out, "{}", category.title)?;
                for item in catalog
                    .applicable(env.name)
                    .filter(|s| s.category_id == category.id)
                {
                    let marker = if item.required { "*" } else { " " };
                    writeln!(out, "  {marker} {:<14} {:<16} {}", item.id, item.slug, item.title)?;
                }
            }
            Ok(out)
        }

        Commands::Activity { count } => {
            let mut out = String::new();
            for entry in service.activity().await?.iter().take(count) {
                writeln!(
                    out,
                    "{} [{}] {}",
                    entry.timestamp.format("%H:%M:%S"),
                    entry.kind.as_str(),
                    entry.message
                )?;
            }
            Ok(out)
        }
    }
}

fn title_of<'a>(catalog: &'a Catalog, record: &'a StatusRecord) -> &'a str {
    catalog
        .subcategory(&record.subcategory_id)
        .map(|s| s.title.as_str())
        .unwrap_or(&record.subcategory_id)
}
