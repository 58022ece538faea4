use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::store;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join("econex_metrics.sqlite"));
    let manifest_dir = args.cache_root.join("manifests");

    info!(cache_root = %args.cache_root.display(), "status requested");

    if manifest_dir.exists() {
        let manifest_count = std::fs::read_dir(&manifest_dir)
            .map(|entries| entries.count())
            .unwrap_or(0);
        info!(path = %manifest_dir.display(), manifests = manifest_count, "manifest directory");
    } else {
        warn!(path = %manifest_dir.display(), "manifest directory missing");
    }

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let connection = store::open(&db_path)?;
    report_counts(&connection)?;

    Ok(())
}

fn report_counts(connection: &Connection) -> Result<()> {
    let docs = store::count_rows(connection, "SELECT COUNT(*) FROM docs")?;
    let metrics = store::count_rows(connection, "SELECT COUNT(*) FROM metrics")?;
    let pending = store::count_rows(
        connection,
        "SELECT COUNT(*) FROM review_queue WHERE status = 'pending'",
    )?;
    let dispositions = store::count_rows(connection, "SELECT COUNT(*) FROM dispositions")?;

    info!(
        docs = docs,
        metrics = metrics,
        pending_reviews = pending,
        dispositions = dispositions,
        "database status"
    );

    Ok(())
}
