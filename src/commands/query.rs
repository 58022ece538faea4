use anyhow::Result;
use tracing::info;

use crate::cli::QueryArgs;
use crate::store::{self, MetricFilter};

pub fn run(args: QueryArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join("econex_metrics.sqlite"));

    let connection = store::open(&db_path)?;

    let filter = MetricFilter {
        metric_type: args.metric_type.clone(),
        year: args.year,
        sector: args.sector.clone(),
        limit: args.limit,
    };
    let metrics = store::query_metrics(&connection, &filter)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    info!(count = metrics.len(), "query results");
    for metric in &metrics {
        println!(
            "{}\t{}\t{}\t{:.3}\t{}\tyear={}\tconfidence={:.2}\t{}",
            metric.metric_id,
            metric.metric_type,
            metric.sector,
            metric.value,
            metric.unit,
            metric
                .year
                .map(|year| year.to_string())
                .unwrap_or_else(|| "-".to_string()),
            metric.confidence,
            metric.doc_id
        );
    }

    Ok(())
}
