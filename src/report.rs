use std::fmt::Write;

use crate::models::{Patient, RiskResult};
use crate::polling::DashboardSnapshot;
use crate::resources;
use crate::risk::{self, Emphasis};
use crate::schema::Domain;

pub fn build_report(snapshot: &DashboardSnapshot, degraded: Option<&str>) -> String {
    let mut output = String::new();
    let stats = &snapshot.stats;

    let _ = writeln!(output, "# Triage Dashboard Report");
    let _ = writeln!(
        output,
        "Snapshot #{} fetched at {}",
        snapshot.seq,
        snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(message) = degraded {
        let _ = writeln!(output);
        let _ = writeln!(output, "> DEGRADED: {message}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Total patients: {}", stats.total_count);
    let _ = writeln!(output, "- Critical cases: {}", stats.critical_count);
    let _ = writeln!(output, "- Avg wait time: {:.0} min", stats.average_wait_minutes);
    let _ = writeln!(
        output,
        "- Resources available: {:.0}%",
        snapshot.resources_available_pct
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Priority Queue");

    if snapshot.queue.is_empty() {
        let _ = writeln!(output, "No patients in the queue.");
    } else {
        let _ = writeln!(output, "| Patient | Age/Sex | Condition | Score | Category | Wait |");
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for entry in snapshot.queue.iter() {
            let _ = writeln!(
                output,
                "| {} | {}/{} | {} | {:.0}% | {} | {} min |",
                entry.name,
                entry.age,
                entry.gender,
                entry.disease_type.as_deref().unwrap_or("-"),
                entry.risk_score * 100.0,
                entry.category_label(),
                entry.wait_time_minutes
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Resources");

    if snapshot.resources.is_empty() {
        let _ = writeln!(output, "No resource data reported.");
    } else {
        for resource in snapshot.resources.iter() {
            let utilization = resources::utilization(resource)
                .map(|ratio| format!("{:.0}%", ratio * 100.0))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = writeln!(
                output,
                "- {}: {} / {} available ({} used, {})",
                resource.resource_type,
                resources::available(resource),
                resource.total_capacity,
                utilization,
                resources::band(resource).label()
            );
        }
    }

    output
}

pub fn render_result(domain: Domain, result: &RiskResult) -> String {
    let band = risk::classify(result.risk_category.as_deref());
    let mut output = String::new();

    let flag = match band.emphasis {
        Emphasis::Urgent => " [URGENT]",
        Emphasis::Caution => " [CAUTION]",
        Emphasis::Calm | Emphasis::Neutral => "",
    };
    let _ = writeln!(output, "{} Assessment{flag}", domain.label());
    let _ = writeln!(
        output,
        "  Risk score: {:.0}% ({})",
        result.risk_score * 100.0,
        band.tier.label()
    );
    let _ = writeln!(output, "  Confidence: {:.0}%", result.confidence * 100.0);
    if !result.model_version.is_empty() {
        let _ = writeln!(output, "  Model: {}", result.model_version);
    }
    if let Some(detected) = result.detected() {
        let _ = writeln!(output, "  Disease detected: {}", if detected { "yes" } else { "no" });
    }
    if !band.recommendation.is_empty() {
        let _ = writeln!(output, "  {}", band.recommendation);
    }

    output
}

pub fn render_patient(patient: &Patient, selected: bool) -> String {
    let marker = if selected { "*" } else { " " };
    let admitted = patient
        .admission_time
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{marker} {} {} ({}, {}) {} admitted {}",
        patient.id, patient.name, patient.age, patient.gender, patient.status, admitted
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::client::fake::{entry, resource};

    #[test]
    fn report_lists_queue_stats_and_bands() {
        let snapshot = DashboardSnapshot::new(
            3,
            vec![entry("Avery", Some("CRITICAL"), 10), entry("Jules", None, 20)],
            vec![resource("ICU Beds", 100, 90), resource("Isolation", 0, 0)],
            Utc::now(),
        );
        let report = build_report(&snapshot, None);

        assert!(report.contains("- Total patients: 2"));
        assert!(report.contains("- Critical cases: 1"));
        assert!(report.contains("- Avg wait time: 15 min"));
        assert!(report.contains("| Jules | 50/M | heart | 50% | PENDING | 20 min |"));
        assert!(report.contains("- ICU Beds: 10 / 100 available (90% used, critical)"));
        assert!(report.contains("- Isolation: 0 / 0 available (n/a used, critical)"));
        assert!(!report.contains("DEGRADED"));
    }

    #[test]
    fn report_flags_degraded_state_and_empty_queue() {
        let snapshot = DashboardSnapshot::new(1, Vec::new(), Vec::new(), Utc::now());
        let report = build_report(&snapshot, Some("Live data is degraded"));
        assert!(report.contains("> DEGRADED: Live data is degraded"));
        assert!(report.contains("No patients in the queue."));
        assert!(report.contains("No resource data reported."));
    }

    #[test]
    fn result_panel_uses_shared_classification() {
        let result = RiskResult {
            risk_score: 0.81,
            risk_category: Some("CRITICAL".into()),
            confidence: 0.88,
            model_version: "v1.0.0-mock".into(),
            chronic_kidney_disease: Some(true),
            diabetes_detected: None,
        };
        let panel = render_result(Domain::Renal, &result);
        assert!(panel.starts_with("Kidney Disease Assessment"));
        assert!(panel.contains("Assessment [URGENT]"));
        assert!(panel.contains("Risk score: 81% (CRITICAL)"));
        assert!(panel.contains("Disease detected: yes"));
        assert!(panel.contains(risk::classify(Some("HIGH")).recommendation));

        let unknown = RiskResult {
            risk_category: Some("SEVERE".into()),
            ..result
        };
        let panel = render_result(Domain::Renal, &unknown);
        assert!(panel.contains("(UNKNOWN)"));
        assert!(!panel.contains("[URGENT]"));
        assert!(!panel.contains("recommended"));
    }
}
