#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("invalid value for {field}: {reason}")]
    Validation { field: String, reason: String },
    #[error("no patient selected")]
    NoPatientSelected,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("collaborator responded with status {0}")]
    Status(u16),
    #[error("partial refresh (queue failed: {queue_failed}, resources failed: {resources_failed})")]
    PartialRefresh {
        queue_failed: bool,
        resources_failed: bool,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type TriageResult<T> = std::result::Result<T, TriageError>;

impl TriageError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        TriageError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Message suitable for intake staff. Transport-level details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            TriageError::Transport(_) | TriageError::Status(_) => {
                "Failed to reach the scoring service. Please try again.".to_string()
            }
            TriageError::PartialRefresh { .. } => {
                "Live data is degraded; showing the last complete update.".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TriageError::Validation { .. } | TriageError::NoPatientSelected
        )
    }
}

impl From<reqwest::Error> for TriageError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TriageError::Status(status.as_u16()),
            None => TriageError::Transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_status_share_generic_message() {
        let transport = TriageError::Transport("connection refused".into());
        let status = TriageError::Status(503);
        assert_eq!(transport.user_message(), status.user_message());
        assert!(!transport.user_message().contains("refused"));
    }

    #[test]
    fn validation_message_names_field() {
        let err = TriageError::validation("age", "expected an integer");
        assert_eq!(err.user_message(), "invalid value for age: expected an integer");
        assert!(err.is_validation());
    }
}
