//! One-shot export: poll every source once and write the result as JSON.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use rigwatch_poller::Poller;
use serde_json::json;

/// Run a single cycle over the poller's sources and write it to `path`.
///
/// Returns the document that was written.
pub async fn export_to_file(poller: &Poller, path: &Path) -> Result<serde_json::Value> {
    let aggregate = poller.run_cycle().await;
    let summary = aggregate.summary();

    let servers: Vec<serde_json::Value> = aggregate
        .iter()
        .map(|s| {
            json!({
                "id": s.source_id,
                "name": s.source_name,
                "health": s.health,
                "cpu_percent": s.cpu.usage_percent,
                "ram_percent": s.memory.usage_percent,
                "storage_percent": s.storage.usage_percent,
                "captured_at": s.captured_at,
                "error": s.fetch_error.as_ref().map(|e| e.to_string()),
            })
        })
        .collect();

    let export = json!({
        "summary": summary,
        "cycle_started_ms": aggregate.cycle_started_ms,
        "cycle_completed_ms": aggregate.cycle_completed_ms,
        "servers": servers,
        "snapshots": &*aggregate,
    });

    let text = serde_json::to_string_pretty(&export)?;
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("creating export file {}", path.display()))?;
    file.write_all(text.as_bytes())?;

    Ok(export)
}
