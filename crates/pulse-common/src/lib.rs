use std::path::PathBuf;

pub type Result<T> = core::result::Result<T, PulseError>;

#[derive(thiserror::Error, Debug)]
pub enum PulseError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("failed to read credential file {}: {source}", .path.display())]
    Credential {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credential file {} is empty", .0.display())]
    EmptyCredential(PathBuf),
    #[error("target unreachable: {0}")]
    Unreachable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub mod credentials {
    use super::{PulseError, Result};
    use std::path::Path;

    /// Reads the bearer token once at startup.
    ///
    /// Leading and trailing whitespace is stripped so a token file ending in a
    /// newline still yields a valid header value.
    pub fn read_token(path: &Path) -> Result<String> {
        let raw = std::fs::read_to_string(path).map_err(|source| PulseError::Credential {
            path: path.to_path_buf(),
            source,
        })?;
        let token = raw.trim();
        if token.is_empty() {
            return Err(PulseError::EmptyCredential(path.to_path_buf()));
        }
        Ok(token.to_string())
    }
}

pub mod config {
    use super::{PulseError, Result};
    use serde::Deserialize;
    use std::env;
    use std::path::PathBuf;

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct PulseConfig {
        pub driver: DriverConfig,
        pub serve: ServeConfig,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct DriverConfig {
        pub url: String,
        pub token_file: PathBuf,
        pub parallelism: usize,
        pub cadence_ms: u64,
        pub max_attempts: u32,
        pub backoff_ms: u64,
        pub attempt_timeout_ms: u64,
        pub output: PathBuf,
        pub payload: serde_json::Value,
        pub max_cycles: Option<u64>,
    }

    impl Default for DriverConfig {
        fn default() -> Self {
            Self {
                url: "http://127.0.0.1:8080/".into(),
                token_file: PathBuf::from("token.txt"),
                parallelism: 100,
                cadence_ms: 1000,
                max_attempts: 3,
                backoff_ms: 500,
                attempt_timeout_ms: 10_000,
                output: PathBuf::from("data.txt"),
                payload: serde_json::json!({"user_input": "hello", "history": []}),
                max_cycles: None,
            }
        }
    }

    impl DriverConfig {
        pub fn validate(&self) -> Result<()> {
            if self.url.trim().is_empty() {
                return Err(PulseError::Config("url must not be empty".into()));
            }
            if self.max_attempts == 0 {
                return Err(PulseError::Config("max_attempts must be at least 1".into()));
            }
            if self.attempt_timeout_ms == 0 {
                return Err(PulseError::Config("attempt_timeout_ms must be positive".into()));
            }
            if self.max_cycles == Some(0) {
                return Err(PulseError::Config("max_cycles must be at least 1 when set".into()));
            }
            Ok(())
        }
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct ServeConfig {
        pub host: String,
        pub port: u16,
        pub message: String,
    }

    impl Default for ServeConfig {
        fn default() -> Self {
            Self { host: "0.0.0.0".into(), port: 8080, message: "Hello world!".into() }
        }
    }

    impl PulseConfig {
        /// Loads from the YAML file named by `PULSE_CONFIG`, or from defaults
        /// with `PULSE_*` environment overrides when it is unset.
        pub fn load() -> Result<Self> {
            if let Ok(path) = env::var("PULSE_CONFIG") {
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| PulseError::Config(format!("cannot read {}: {}", path, e)))?;
                return Self::from_yaml_str(&text);
            }
            let mut cfg = Self::default();
            cfg.apply_env();
            Ok(cfg)
        }

        pub fn from_yaml_str(text: &str) -> Result<Self> {
            Ok(serde_yaml::from_str::<PulseConfig>(text)?)
        }

        fn apply_env(&mut self) {
            let d = &mut self.driver;
            if let Ok(url) = env::var("PULSE_URL") { d.url = url; }
            if let Ok(path) = env::var("PULSE_TOKEN_FILE") { d.token_file = PathBuf::from(path); }
            if let Ok(path) = env::var("PULSE_OUTPUT") { d.output = PathBuf::from(path); }
            if let Some(v) = env::var("PULSE_PARALLELISM").ok().and_then(|v| v.parse().ok()) { d.parallelism = v; }
            if let Some(v) = env::var("PULSE_CADENCE_MS").ok().and_then(|v| v.parse().ok()) { d.cadence_ms = v; }
            if let Some(v) = env::var("PULSE_MAX_ATTEMPTS").ok().and_then(|v| v.parse().ok()) { d.max_attempts = v; }
            if let Some(v) = env::var("PULSE_BACKOFF_MS").ok().and_then(|v| v.parse().ok()) { d.backoff_ms = v; }
            if let Some(v) = env::var("PULSE_ATTEMPT_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()) { d.attempt_timeout_ms = v; }
            if let Ok(msg) = env::var("PULSE_MESSAGE") { self.serve.message = msg; }
            if let Some(v) = env::var("PULSE_PORT").ok().and_then(|v| v.parse().ok()) { self.serve.port = v; }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::config::PulseConfig;
    use super::credentials::read_token;
    use super::PulseError;
    use std::io::Write;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = PulseConfig::from_yaml_str("driver:\n  parallelism: 7\nserve:\n  message: hi\n").unwrap();
        assert_eq!(cfg.driver.parallelism, 7);
        assert_eq!(cfg.driver.max_attempts, 3);
        assert_eq!(cfg.driver.backoff_ms, 500);
        assert_eq!(cfg.serve.message, "hi");
        assert_eq!(cfg.serve.port, 8080);
    }

    #[test]
    fn default_payload_matches_greeting_request() {
        let cfg = PulseConfig::default();
        assert_eq!(cfg.driver.payload["user_input"], "hello");
        assert!(cfg.driver.payload["history"].as_array().unwrap().is_empty());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let cfg = PulseConfig::from_yaml_str("driver:\n  max_attempts: 0\n").unwrap();
        assert!(matches!(cfg.driver.validate(), Err(PulseError::Config(_))));
    }

    #[test]
    fn token_is_trimmed() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "  secret-token  ").unwrap();
        assert_eq!(read_token(f.path()).unwrap(), "secret-token");
    }

    #[test]
    fn missing_and_empty_token_files_fail() {
        let missing = std::path::Path::new("/nonexistent/pulse/token.txt");
        assert!(matches!(read_token(missing), Err(PulseError::Credential { .. })));

        let f = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(read_token(f.path()), Err(PulseError::EmptyCredential(_))));
    }
}
