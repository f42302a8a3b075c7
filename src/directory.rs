use std::cmp::Reverse;

use tracing::info;
use uuid::Uuid;

use crate::client::Collaborator;
use crate::error::{TriageError, TriageResult};
use crate::models::{NewPatient, Patient};

/// Known patients, most recently registered first, plus the active selection.
#[derive(Debug, Default)]
pub struct PatientDirectory {
    patients: Vec<Patient>,
    selected: Option<Uuid>,
}

impl PatientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh(&mut self, collaborator: &dyn Collaborator) -> TriageResult<()> {
        let patients = collaborator.list_patients().await?;
        self.replace(patients);
        Ok(())
    }

    /// Swap in a fresh list. A still-present selection is kept; the head is only
    /// selected when there was nothing selected or the selected patient is gone.
    pub fn replace(&mut self, mut patients: Vec<Patient>) {
        // Stable: patients without an admission time keep their delivered order at the tail.
        patients.sort_by_key(|patient| Reverse(patient.admission_time));
        self.patients = patients;

        let still_present = self
            .selected
            .is_some_and(|id| self.patients.iter().any(|p| p.id == id));
        if !still_present {
            self.selected = self.patients.first().map(|p| p.id);
        }
    }

    pub async fn register(
        &mut self,
        collaborator: &dyn Collaborator,
        patient: &NewPatient,
    ) -> TriageResult<Patient> {
        let created = collaborator.register_patient(patient).await?;
        info!(patient_id = %created.id, "registered patient");

        self.patients.retain(|p| p.id != created.id);
        self.patients.insert(0, created.clone());
        self.selected = Some(created.id);
        Ok(created)
    }

    pub fn select(&mut self, id: Uuid) -> TriageResult<()> {
        if !self.patients.iter().any(|p| p.id == id) {
            return Err(TriageError::InvalidInput(format!("unknown patient {id}")));
        }
        self.selected = Some(id);
        Ok(())
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn selected(&self) -> Option<&Patient> {
        let id = self.selected?;
        self.patients.iter().find(|p| p.id == id)
    }

    pub fn selected_id(&self) -> Option<Uuid> {
        self.selected
    }
}
