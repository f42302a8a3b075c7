use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{TriageError, TriageResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(alias = "patient_id")]
    pub id: Uuid,
    pub name: String,
    pub age: i64,
    pub gender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_time: Option<DateTime<Utc>>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "waiting".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub fn from_label(label: &str) -> TriageResult<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            other => Err(TriageError::validation(
                "gender",
                format!("expected Male or Female, got {other:?}"),
            )),
        }
    }
}

/// Registration request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPatient {
    pub name: String,
    pub age: i64,
    pub gender: Gender,
}

impl NewPatient {
    pub fn from_form(name: &str, age: &str, gender: &str) -> TriageResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TriageError::validation("name", "must not be empty"));
        }
        let age = age
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|age| *age >= 0)
            .ok_or_else(|| TriageError::validation("age", "expected a non-negative integer"))?;

        Ok(Self {
            name: name.to_string(),
            age,
            gender: Gender::from_label(gender)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskCategory {
    /// Case-insensitive; anything outside the four known bands is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(RiskCategory::Low),
            "MEDIUM" => Some(RiskCategory::Medium),
            "HIGH" => Some(RiskCategory::High),
            "CRITICAL" => Some(RiskCategory::Critical),
            _ => None,
        }
    }

    pub fn is_urgent(self) -> bool {
        matches!(self, RiskCategory::High | RiskCategory::Critical)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskCategory::Low => "LOW",
            RiskCategory::Medium => "MEDIUM",
            RiskCategory::High => "HIGH",
            RiskCategory::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub risk_score: f64,
    #[serde(default)]
    pub risk_category: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub model_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chronic_kidney_disease: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diabetes_detected: Option<bool>,
}

impl RiskResult {
    pub fn category(&self) -> Option<RiskCategory> {
        self.risk_category.as_deref().and_then(RiskCategory::parse)
    }

    /// Domain-specific detection flag, when the collaborator sent one.
    pub fn detected(&self) -> Option<bool> {
        self.chronic_kidney_disease.or(self.diabetes_detected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub patient_id: Uuid,
    pub name: String,
    pub age: i64,
    pub gender: String,
    #[serde(default)]
    pub disease_type: Option<String>,
    #[serde(default)]
    pub risk_score: f64,
    #[serde(default)]
    pub risk_category: Option<String>,
    #[serde(default)]
    pub wait_time_minutes: i64,
}

impl QueueEntry {
    pub fn category(&self) -> Option<RiskCategory> {
        self.risk_category.as_deref().and_then(RiskCategory::parse)
    }

    pub fn category_label(&self) -> &str {
        match self.risk_category.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => "PENDING",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub resource_type: String,
    pub total_capacity: i64,
    pub used: i64,
    pub available: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_maps_gender_label_to_wire_code() {
        let patient = NewPatient::from_form("Jane Doe", "45", "Female").unwrap();
        let body = serde_json::to_value(&patient).unwrap();
        assert_eq!(body["gender"], "F");
        assert_eq!(body["age"], 45);
        assert_eq!(body["name"], "Jane Doe");
    }

    #[test]
    fn registration_rejects_blank_age_and_unknown_gender() {
        assert!(NewPatient::from_form("Jane", "", "Female").is_err());
        assert!(NewPatient::from_form("Jane", "-3", "Female").is_err());
        assert!(NewPatient::from_form("Jane", "30", "other").is_err());
        assert!(NewPatient::from_form("  ", "30", "Male").is_err());
    }

    #[test]
    fn patient_accepts_patient_id_alias() {
        let raw = r#"{"patient_id":"3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2","name":"Avery Lee","age":52,"gender":"M"}"#;
        let patient: Patient = serde_json::from_str(raw).unwrap();
        assert_eq!(patient.name, "Avery Lee");
        assert_eq!(patient.status, "waiting");
        assert!(patient.admission_time.is_none());
    }

    #[test]
    fn queue_entry_without_category_is_pending() {
        let raw = r#"{"patient_id":"0c22f1f1-9184-4fd4-9b21-28c68a6a89dc","name":"Jules","age":31,"gender":"F","risk_score":0.2,"wait_time_minutes":4}"#;
        let entry: QueueEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.category_label(), "PENDING");
        assert_eq!(entry.category(), None);
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(RiskCategory::parse("critical"), Some(RiskCategory::Critical));
        assert_eq!(RiskCategory::parse(" High "), Some(RiskCategory::High));
        assert_eq!(RiskCategory::parse("SEVERE"), None);
    }
}
