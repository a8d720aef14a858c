//! The `summary` subcommand: offline inspection of a user's records.

use std::path::PathBuf;
use std::sync::Arc;

use solvelog_store::ActivityStore;
use solvelog_tracker::Tracker;

pub async fn print_summary(user_id: i64, db_override: Option<PathBuf>) -> anyhow::Result<()> {
    let config = solvelog_config::load_config().unwrap_or_default();
    let db_path = match db_override {
        Some(path) => path,
        None => config.database_path()?,
    };

    let store = Arc::new(ActivityStore::open(&db_path)?);
    let tracker = Tracker::new(store);

    let summary = tracker.summary(user_id).await?;
    if summary.is_empty() {
        println!("No records for user {user_id}.");
        return Ok(());
    }

    println!("Solve counts:");
    for count in &summary.counts {
        println!("  {}: {}", count.platform.display_name(), count.count);
    }

    println!("Recent solves:");
    for record in &summary.recent {
        let when = record.solved_at.format("%Y-%m-%d %H:%M UTC");
        match &record.url {
            Some(url) => println!("  {} — {when} ({url})", record.problem_id),
            None => println!(
                "  {}: {} — {when}",
                record.platform.display_name(),
                record.problem_id
            ),
        }
    }

    Ok(())
}
