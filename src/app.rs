use std::error::Error;
use std::fmt;
use std::time::Duration;

use crate::api::{self, ApiError, AppendClient, Client, Credentials};
use crate::cli::Cli;
use crate::config::{self, Config, ConfigError, ConfigStore, ConnectionFlags};

#[derive(Debug)]
pub enum AppError {
    Api(ApiError),
    Config(ConfigError),
    Io(std::io::Error),
    Json(serde_json::Error),
    InvalidArgument(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Api(err) => write!(f, "{}", err),
            AppError::Config(err) => write!(f, "{}", err),
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Json(err) => write!(f, "invalid JSON: {}", err),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Api(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::InvalidArgument(_) => None,
        }
    }
}

impl From<ApiError> for AppError {
    fn from(value: ApiError) -> Self {
        AppError::Api(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Json(value)
    }
}

/// Everything a command needs to reach a graph: the loaded config and the
/// connection flags it is layered under.
pub struct Session {
    store: ConfigStore,
    config: Config,
    flags: ConnectionFlags,
}

impl Session {
    pub fn open(cli: &Cli) -> Result<Self, AppError> {
        let store = ConfigStore::open(cli.config.as_deref())?;
        let config = store.load()?;
        let flags = ConnectionFlags {
            graph: cli.graph.clone(),
            token: cli.token.clone(),
            local: cli.local,
            base_url: cli.base_url.clone(),
            timeout_secs: cli.timeout,
            port_file: cli.port_file.clone(),
        };
        Ok(Self {
            store,
            config,
            flags,
        })
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether output should be JSON even without `--json`.
    pub fn prefers_json(&self) -> bool {
        self.config.prefers_json()
    }

    pub fn credentials(&self) -> Result<Credentials, AppError> {
        Ok(config::resolve_credentials(
            &self.flags,
            |name| std::env::var(name).ok(),
            &self.config,
        )?)
    }

    pub fn connect(&self) -> Result<Client, AppError> {
        let credentials = self.credentials()?;
        let overrides = config::resolve_overrides(&self.flags, &self.config);
        tracing::debug!(
            graph = %credentials.graph_name,
            mode = %credentials.mode,
            "connecting"
        );
        Ok(api::connect(&credentials, &overrides)?)
    }

    /// The Append API needs a token and graph whatever the configured mode.
    pub fn append_client(&self, api_url: Option<&str>) -> Result<AppendClient, AppError> {
        let credentials = self.credentials()?;
        if credentials.token.is_empty() {
            return Err(AppError::InvalidArgument(
                "API token required (set ROAM_API_TOKEN or use --token)".to_string(),
            ));
        }
        if credentials.graph_name.is_empty() {
            return Err(AppError::InvalidArgument(
                "graph name required (set ROAM_GRAPH_NAME or use --graph)".to_string(),
            ));
        }
        let mut client = AppendClient::new(credentials.graph_name, credentials.token);
        if let Some(url) = api_url.filter(|url| !url.is_empty()) {
            client = client.with_base_url(url);
        }
        let timeout = self.flags.timeout_secs.or(self.config.timeout_secs);
        if let Some(secs) = timeout.filter(|secs| *secs > 0) {
            client = client.with_timeout(Duration::from_secs(secs));
        }
        Ok(client)
    }
}
