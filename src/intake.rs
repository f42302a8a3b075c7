use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::Collaborator;
use crate::error::{TriageError, TriageResult};
use crate::models::RiskResult;
use crate::schema::{Domain, FieldKind, FieldSpec};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
}

/// Coerced request body for one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentPayload {
    #[serde(skip)]
    pub domain: Domain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(flatten)]
    pub fields: BTreeMap<&'static str, FieldValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// A submission that has been issued but not yet applied.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub seq: u64,
    pub payload: AssessmentPayload,
}

/// One domain's assessment form: raw string state plus the result panel.
#[derive(Debug)]
pub struct AssessmentIntake {
    domain: Domain,
    raw: HashMap<String, String>,
    lifecycle: Lifecycle,
    result: Option<RiskResult>,
    error: Option<String>,
    issued: u64,
}

impl AssessmentIntake {
    pub fn new(domain: Domain) -> Self {
        let raw = domain
            .fields()
            .iter()
            .map(|spec| (spec.name.to_string(), spec.default.to_string()))
            .collect();

        Self {
            domain,
            raw,
            lifecycle: Lifecycle::Idle,
            result: None,
            error: None,
            issued: 0,
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn set_field(&mut self, name: &str, value: &str) -> TriageResult<()> {
        let spec = self
            .domain
            .field(name)
            .ok_or_else(|| TriageError::validation(name, format!("not a {} field", self.domain)))?;
        self.raw.insert(spec.name.to_string(), value.to_string());
        Ok(())
    }

    pub fn set_fields<'a, I>(&mut self, fields: I) -> TriageResult<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in fields {
            self.set_field(name, value)?;
        }
        Ok(())
    }

    pub fn raw_value(&self, name: &str) -> Option<&str> {
        self.raw.get(name).map(String::as_str)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn result(&self) -> Option<&RiskResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Validate the form and issue a new submission for `patient_id`, which is
    /// captured here and never re-read. Local rejections leave the displayed
    /// result untouched. Issuing supersedes any submission still in flight.
    pub fn begin(&mut self, patient_id: Option<Uuid>) -> TriageResult<PendingSubmission> {
        let payload = match self.build_payload(patient_id) {
            Ok(payload) => payload,
            Err(err) => {
                debug!(domain = %self.domain, error = %err, "submission rejected locally");
                self.error = Some(err.user_message());
                return Err(err);
            }
        };

        if self.lifecycle == Lifecycle::Submitting {
            info!(domain = %self.domain, superseded = self.issued, "superseding in-flight submission");
        }

        self.issued += 1;
        self.lifecycle = Lifecycle::Submitting;
        self.result = None;
        self.error = None;
        Ok(PendingSubmission {
            seq: self.issued,
            payload,
        })
    }

    /// Apply the collaborator's answer. Returns `false` when the submission was
    /// superseded or cancelled, in which case nothing changes.
    pub fn complete(&mut self, seq: u64, outcome: &TriageResult<RiskResult>) -> bool {
        if seq != self.issued || self.lifecycle != Lifecycle::Submitting {
            info!(domain = %self.domain, seq, current = self.issued, "discarding stale assessment response");
            return false;
        }

        match outcome {
            Ok(result) => {
                self.lifecycle = Lifecycle::Succeeded;
                self.result = Some(result.clone());
                self.error = None;
            }
            Err(err) => {
                warn!(domain = %self.domain, error = %err, "assessment failed");
                self.lifecycle = Lifecycle::Failed;
                self.error = Some(err.user_message());
            }
        }
        true
    }

    /// Abandon whatever is in flight; its response will be discarded.
    pub fn cancel(&mut self) {
        if self.lifecycle == Lifecycle::Submitting {
            self.issued += 1;
            self.lifecycle = Lifecycle::Idle;
        }
    }

    pub async fn submit(
        &mut self,
        collaborator: &dyn Collaborator,
        patient_id: Option<Uuid>,
    ) -> TriageResult<RiskResult> {
        let pending = self.begin(patient_id)?;
        let outcome = collaborator.predict(self.domain, &pending.payload).await;
        self.complete(pending.seq, &outcome);
        outcome
    }

    fn build_payload(&self, patient_id: Option<Uuid>) -> TriageResult<AssessmentPayload> {
        let patient_id = if self.domain.requires_patient() {
            Some(patient_id.ok_or(TriageError::NoPatientSelected)?)
        } else {
            None
        };

        let mut fields = BTreeMap::new();
        for spec in self.domain.fields() {
            let raw = self.raw.get(spec.name).map(String::as_str).unwrap_or(spec.default);
            fields.insert(spec.name, coerce(spec, raw)?);
        }

        Ok(AssessmentPayload {
            domain: self.domain,
            patient_id,
            fields,
        })
    }
}

pub fn coerce(spec: &FieldSpec, raw: &str) -> TriageResult<FieldValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TriageError::validation(spec.name, "is required"));
    }

    let value = match spec.kind {
        FieldKind::Integer => raw
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| TriageError::validation(spec.name, format!("expected an integer, got {raw:?}")))?,
        FieldKind::Float => raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(FieldValue::Float)
            .ok_or_else(|| TriageError::validation(spec.name, format!("expected a number, got {raw:?}")))?,
    };

    if let Some(codes) = spec.codes {
        let numeric = value.as_f64();
        let allowed = codes
            .iter()
            .filter_map(|code| code.parse::<f64>().ok())
            .any(|code| (code - numeric).abs() < 1e-9);
        if !allowed {
            return Err(TriageError::validation(
                spec.name,
                format!("must be one of {}", codes.join(", ")),
            ));
        }
    }

    Ok(value)
}

impl FieldValue {
    pub fn as_f64(self) -> f64 {
        match self {
            FieldValue::Integer(value) => value as f64,
            FieldValue::Float(value) => value,
        }
    }
}

/// One row of a batch intake file.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRow {
    pub patient_id: Option<Uuid>,
    pub fields: HashMap<String, String>,
}

/// Read batch rows from CSV: the header names schema fields, with an optional
/// `patient_id` column.
pub fn read_batch<R: Read>(domain: Domain, reader: R) -> TriageResult<Vec<BatchRow>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for (index, record) in reader.deserialize::<HashMap<String, String>>().enumerate() {
        let mut fields =
            record.map_err(|err| TriageError::InvalidInput(format!("row {}: {err}", index + 1)))?;

        let patient_id = match fields.remove("patient_id") {
            Some(raw) if !raw.trim().is_empty() => Some(Uuid::parse_str(raw.trim()).map_err(|_| {
                TriageError::validation("patient_id", format!("row {}: not a UUID", index + 1))
            })?),
            _ => None,
        };

        if let Some(unknown) = fields.keys().find(|name| domain.field(name).is_none()) {
            return Err(TriageError::validation(
                unknown.as_str(),
                format!("not a {domain} field"),
            ));
        }

        rows.push(BatchRow { patient_id, fields });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::client::fake::FakeCollaborator;

    fn filled_cardiac() -> AssessmentIntake {
        let mut intake = AssessmentIntake::new(Domain::Cardiac);
        intake
            .set_fields([
                ("age", "63"),
                ("resting_bp", "145"),
                ("cholesterol", "233"),
                ("max_heart_rate", "150"),
                ("st_depression", "2.3"),
            ])
            .unwrap();
        intake
    }

    fn filled_vitals() -> AssessmentIntake {
        let mut intake = AssessmentIntake::new(Domain::Vitals);
        intake
            .set_fields([
                ("Body_Temperature", "38.4"),
                ("Pulse_Rate", "112"),
                ("Respiration_Rate", "24"),
                ("Systolic_BP", "92"),
                ("Diastolic_BP", "60"),
                ("Oxygen_Saturation", "91.5"),
            ])
            .unwrap();
        intake
    }

    #[tokio::test]
    async fn cardiac_payload_is_typed_and_patientless() {
        let fake = FakeCollaborator::with_category("HIGH");
        let mut intake = filled_cardiac();

        let result = intake.submit(&fake, Some(Uuid::new_v4())).await.unwrap();
        assert_eq!(result.risk_category.as_deref(), Some("HIGH"));
        assert_eq!(intake.lifecycle(), Lifecycle::Succeeded);

        let predictions = fake.predictions.lock().unwrap();
        let (domain, body) = &predictions[0];
        assert_eq!(*domain, Domain::Cardiac);
        assert_eq!(body["age"], 63);
        assert_eq!(body["sex"], 1);
        assert_eq!(body["thalassemia"], 2);
        assert_eq!(body["st_depression"], 2.3);
        assert!(body.get("patient_id").is_none());
        assert_eq!(body.as_object().unwrap().len(), 13);
    }

    #[tokio::test]
    async fn vitals_payload_carries_captured_patient() {
        let fake = FakeCollaborator::with_category("LOW");
        let mut intake = filled_vitals();
        let patient_id = Uuid::new_v4();

        intake.submit(&fake, Some(patient_id)).await.unwrap();
        let predictions = fake.predictions.lock().unwrap();
        assert_eq!(predictions[0].1["patient_id"], patient_id.to_string());
        assert_eq!(predictions[0].1["Pulse_Rate"], 112);
    }

    #[tokio::test]
    async fn empty_numeric_field_never_reaches_network() {
        let fake = FakeCollaborator::with_category("MEDIUM");
        let mut intake = filled_cardiac();
        intake.submit(&fake, None).await.unwrap();
        let shown = intake.result().cloned();

        intake.set_field("age", "").unwrap();
        let err = intake.submit(&fake, None).await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(fake.prediction_count(), 1);
        assert_eq!(intake.result().cloned(), shown);
        assert_eq!(intake.lifecycle(), Lifecycle::Succeeded);
        assert!(intake.error().unwrap().contains("age"));
    }

    #[tokio::test]
    async fn missing_patient_is_rejected_locally() {
        let fake = FakeCollaborator::with_category("LOW");
        let mut intake = filled_vitals();
        let err = intake.submit(&fake, None).await.unwrap_err();
        assert!(matches!(err, TriageError::NoPatientSelected));
        assert_eq!(fake.prediction_count(), 0);
        assert_eq!(intake.lifecycle(), Lifecycle::Idle);
    }

    #[tokio::test]
    async fn collaborator_failure_reaches_terminal_state() {
        let fake = FakeCollaborator::with_category("LOW");
        fake.fail_predict.store(true, Ordering::SeqCst);
        let mut intake = filled_cardiac();

        assert!(intake.submit(&fake, None).await.is_err());
        assert_eq!(intake.lifecycle(), Lifecycle::Failed);
        assert!(intake.result().is_none());
        assert_eq!(
            intake.error(),
            Some("Failed to reach the scoring service. Please try again.")
        );
    }

    #[test]
    fn later_submission_discards_earlier_response() {
        let mut intake = filled_cardiac();
        let first = intake.begin(None).unwrap();
        let second = intake.begin(None).unwrap();
        assert!(second.seq > first.seq);

        let newer = RiskResult {
            risk_score: 0.31,
            risk_category: Some("LOW".into()),
            confidence: 0.9,
            model_version: "v1".into(),
            chronic_kidney_disease: None,
            diabetes_detected: None,
        };
        let older = RiskResult {
            risk_score: 0.95,
            risk_category: Some("CRITICAL".into()),
            ..newer.clone()
        };

        assert!(intake.complete(second.seq, &Ok(newer.clone())));
        assert!(!intake.complete(first.seq, &Ok(older)));
        assert_eq!(intake.result(), Some(&newer));
    }

    #[test]
    fn beginning_clears_previous_result_and_error() {
        let mut intake = filled_cardiac();
        let pending = intake.begin(None).unwrap();
        intake.complete(pending.seq, &Err(TriageError::Status(500)));
        assert!(intake.error().is_some());

        intake.begin(None).unwrap();
        assert!(intake.error().is_none());
        assert!(intake.result().is_none());
        assert_eq!(intake.lifecycle(), Lifecycle::Submitting);
    }

    #[test]
    fn success_after_rejected_resubmit_shows_no_error() {
        let mut intake = filled_cardiac();
        let pending = intake.begin(None).unwrap();

        intake.set_field("age", "").unwrap();
        assert!(intake.begin(None).is_err());
        assert_eq!(intake.lifecycle(), Lifecycle::Submitting);

        let result = RiskResult {
            risk_score: 0.4,
            risk_category: Some("MEDIUM".into()),
            confidence: 0.9,
            model_version: "v1".into(),
            chronic_kidney_disease: None,
            diabetes_detected: None,
        };
        assert!(intake.complete(pending.seq, &Ok(result.clone())));
        assert_eq!(intake.lifecycle(), Lifecycle::Succeeded);
        assert_eq!(intake.result(), Some(&result));
        assert!(intake.error().is_none());
    }

    #[test]
    fn cancelled_submission_is_not_applied() {
        let mut intake = filled_cardiac();
        let pending = intake.begin(None).unwrap();
        intake.cancel();
        assert!(!intake.complete(pending.seq, &Err(TriageError::Status(500))));
        assert_eq!(intake.lifecycle(), Lifecycle::Idle);
        assert!(intake.error().is_none());
    }

    #[test]
    fn coercion_enforces_kind_and_codes() {
        let renal = Domain::Renal;
        let gravity = renal.field("Specific_Gravity").unwrap();
        assert_eq!(coerce(gravity, "1.01").unwrap(), FieldValue::Float(1.01));
        assert!(coerce(gravity, "1.03").is_err());

        let albumin = renal.field("Albumin").unwrap();
        assert!(coerce(albumin, "6").is_err());
        assert!(coerce(albumin, "2.5").is_err());

        let creatinine = renal.field("Serum_Creatinine").unwrap();
        assert!(coerce(creatinine, "NaN").is_err());
        assert!(coerce(creatinine, "inf").is_err());
        assert_eq!(coerce(creatinine, " 1.2 ").unwrap(), FieldValue::Float(1.2));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut intake = AssessmentIntake::new(Domain::Hepatic);
        assert!(intake.set_field("Glucose", "120").is_err());
    }

    #[test]
    fn batch_reader_splits_patient_column() {
        let patient_id = Uuid::new_v4();
        let csv = format!(
            "patient_id,Body_Temperature,Pulse_Rate\n{patient_id},37.2,80\n,36.9,72\n"
        );
        let rows = read_batch(Domain::Vitals, csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].patient_id, Some(patient_id));
        assert_eq!(rows[0].fields["Pulse_Rate"], "80");
        assert_eq!(rows[1].patient_id, None);
        assert!(!rows[1].fields.contains_key("patient_id"));
    }

    #[test]
    fn batch_reader_rejects_foreign_columns() {
        let csv = "Glucose,Pulse_Rate\n120,80\n";
        assert!(read_batch(Domain::Vitals, csv.as_bytes()).is_err());
    }
}
