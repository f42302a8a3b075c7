use std::collections::HashSet;
use std::io::Write;

use tracing::warn;

use crate::client::Collaborator;
use crate::error::{TriageError, TriageResult};
use crate::models::QueueEntry;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueStats {
    pub total_count: usize,
    pub critical_count: usize,
    pub average_wait_minutes: f64,
}

/// Fetch the queue in the collaborator's order. Repeated patient ids are
/// dropped after their first occurrence.
pub async fn fetch_queue(collaborator: &dyn Collaborator) -> TriageResult<Vec<QueueEntry>> {
    let entries = collaborator.fetch_queue().await?;
    Ok(dedupe(entries))
}

pub fn dedupe(entries: Vec<QueueEntry>) -> Vec<QueueEntry> {
    let mut seen = HashSet::new();
    let before = entries.len();
    let unique: Vec<QueueEntry> = entries
        .into_iter()
        .filter(|entry| seen.insert(entry.patient_id))
        .collect();

    if unique.len() != before {
        warn!(dropped = before - unique.len(), "queue snapshot repeated patient ids");
    }
    unique
}

pub fn summarize(queue: &[QueueEntry]) -> QueueStats {
    let critical_count = queue
        .iter()
        .filter(|entry| entry.category().is_some_and(|c| c.is_urgent()))
        .count();

    let average_wait_minutes = if queue.is_empty() {
        0.0
    } else {
        queue.iter().map(|e| e.wait_time_minutes as f64).sum::<f64>() / queue.len() as f64
    };

    QueueStats {
        total_count: queue.len(),
        critical_count,
        average_wait_minutes,
    }
}

pub fn write_csv<W: Write>(queue: &[QueueEntry], out: W) -> TriageResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    let to_err = |err: csv::Error| TriageError::InvalidInput(format!("failed to write queue CSV: {err}"));

    writer
        .write_record([
            "patient_id",
            "name",
            "age",
            "gender",
            "disease_type",
            "risk_score",
            "risk_category",
            "wait_time_minutes",
        ])
        .map_err(to_err)?;

    for entry in queue {
        writer
            .write_record([
                entry.patient_id.to_string(),
                entry.name.clone(),
                entry.age.to_string(),
                entry.gender.clone(),
                entry.disease_type.clone().unwrap_or_default(),
                format!("{:.2}", entry.risk_score),
                entry.category_label().to_string(),
                entry.wait_time_minutes.to_string(),
            ])
            .map_err(to_err)?;
    }

    writer
        .flush()
        .map_err(|err| TriageError::InvalidInput(format!("failed to write queue CSV: {err}")))
}
