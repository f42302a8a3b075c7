use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::Settings;
use crate::error::{TriageError, TriageResult};
use crate::intake::AssessmentPayload;
use crate::models::{NewPatient, Patient, QueueEntry, ResourceStatus, RiskResult};
use crate::schema::Domain;

pub const PATIENTS_PATH: &str = "/api/v1/patients/";
pub const QUEUE_PATH: &str = "/api/v1/triage/queue";
pub const RESOURCES_PATH: &str = "/api/v1/resources/status";

/// The external scoring/registry service. Any non-2xx answer is a failure.
#[async_trait]
pub trait Collaborator: Send + Sync {
    async fn list_patients(&self) -> TriageResult<Vec<Patient>>;
    async fn register_patient(&self, patient: &NewPatient) -> TriageResult<Patient>;
    async fn predict(&self, domain: Domain, payload: &AssessmentPayload) -> TriageResult<RiskResult>;
    async fn fetch_queue(&self) -> TriageResult<Vec<QueueEntry>>;
    async fn fetch_resources(&self) -> TriageResult<Vec<ResourceStatus>>;
}

#[derive(Clone)]
pub struct HttpCollaborator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCollaborator {
    pub fn new(settings: &Settings) -> TriageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|err| TriageError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: settings.api_base_url().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> TriageResult<T> {
        debug!(path, "GET");
        let response = self.client.get(self.url(path)).send().await?;
        Ok(response.error_for_status()?.json::<T>().await?)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> TriageResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        debug!(path, "POST");
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Ok(response.error_for_status()?.json::<T>().await?)
    }
}

#[async_trait]
impl Collaborator for HttpCollaborator {
    async fn list_patients(&self) -> TriageResult<Vec<Patient>> {
        self.get_json(PATIENTS_PATH).await
    }

    async fn register_patient(&self, patient: &NewPatient) -> TriageResult<Patient> {
        self.post_json(PATIENTS_PATH, patient).await
    }

    async fn predict(&self, domain: Domain, payload: &AssessmentPayload) -> TriageResult<RiskResult> {
        self.post_json(domain.endpoint(), payload).await
    }

    async fn fetch_queue(&self) -> TriageResult<Vec<QueueEntry>> {
        self.get_json(QUEUE_PATH).await
    }

    async fn fetch_resources(&self) -> TriageResult<Vec<ResourceStatus>> {
        self.get_json(RESOURCES_PATH).await
    }
}
