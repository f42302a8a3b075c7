//! Runtime settings.
//!
//! Resolved once in `main` and passed into the services, so nothing reads the
//! process environment while a request or poll cycle is running.

use std::time::Duration;

use crate::error::{TriageError, TriageResult};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_POLL_SECS: u64 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct Settings {
    api_base_url: String,
    poll_interval: Duration,
    request_timeout: Duration,
}

impl Settings {
    pub fn new(api_base_url: &str, poll_secs: u64, timeout_secs: u64) -> TriageResult<Self> {
        let api_base_url = api_base_url.trim().trim_end_matches('/');
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(TriageError::Config(format!(
                "AEGIS_API_URL must be an http(s) URL, got {api_base_url:?}"
            )));
        }
        if poll_secs == 0 {
            return Err(TriageError::Config("AEGIS_POLL_SECS must be > 0".into()));
        }
        if timeout_secs == 0 {
            return Err(TriageError::Config("AEGIS_TIMEOUT_SECS must be > 0".into()));
        }

        Ok(Self {
            api_base_url: api_base_url.to_string(),
            poll_interval: Duration::from_secs(poll_secs),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn from_env() -> TriageResult<Self> {
        let api_base_url =
            std::env::var("AEGIS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let poll_secs = secs_from_env("AEGIS_POLL_SECS", DEFAULT_POLL_SECS)?;
        let timeout_secs = secs_from_env("AEGIS_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        Self::new(&api_base_url, poll_secs, timeout_secs)
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

fn secs_from_env(key: &str, default: u64) -> TriageResult<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| TriageError::Config(format!("{key} must be a whole number of seconds"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let settings = Settings::new("http://triage.local:8000/", 30, 10).unwrap();
        assert_eq!(settings.api_base_url(), "http://triage.local:8000");
        assert_eq!(settings.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn rejects_zero_intervals_and_bad_scheme() {
        assert!(Settings::new(DEFAULT_API_URL, 0, 10).is_err());
        assert!(Settings::new(DEFAULT_API_URL, 30, 0).is_err());
        assert!(Settings::new("triage.local", 30, 10).is_err());
    }
}
