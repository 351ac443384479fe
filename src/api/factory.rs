use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::{ApiError, CloudClient, LocalClient, RoamApi};

/// How a graph is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Hosted graph over the REST API.
    #[default]
    Cloud,
    /// Encrypted graph through the desktop app.
    Encrypted,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Cloud => "cloud",
            Mode::Encrypted => "encrypted",
        }
    }
}

impl FromStr for Mode {
    type Err = ApiError;

    /// An empty mode means cloud.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "" | "cloud" => Ok(Mode::Cloud),
            "encrypted" => Ok(Mode::Encrypted),
            other => Err(ApiError::InvalidArgument(format!(
                "unknown mode: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub graph_name: String,
    pub mode: Mode,
}

/// Optional constructor-time settings from flags or config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOverrides {
    /// Cloud only.
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    /// Local only.
    pub port_file: Option<PathBuf>,
}

/// A connected transport.
pub enum Client {
    Cloud(CloudClient),
    Local(LocalClient),
}

impl Client {
    pub fn api(&self) -> &dyn RoamApi {
        match self {
            Client::Cloud(client) => client,
            Client::Local(client) => client,
        }
    }

    pub fn as_local(&self) -> Option<&LocalClient> {
        match self {
            Client::Local(client) => Some(client),
            Client::Cloud(_) => None,
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Client::Cloud(_) => Mode::Cloud,
            Client::Local(_) => Mode::Encrypted,
        }
    }
}

/// Builds the transport for `credentials.mode`. Cloud needs a token; both
/// need a graph name.
pub fn connect(credentials: &Credentials, overrides: &ClientOverrides) -> Result<Client, ApiError> {
    if credentials.graph_name.trim().is_empty() {
        return Err(ApiError::InvalidArgument(
            "graph name required (set ROAM_GRAPH_NAME or use --graph)".to_string(),
        ));
    }
    match credentials.mode {
        Mode::Cloud => {
            if credentials.token.trim().is_empty() {
                return Err(ApiError::InvalidArgument(
                    "API token required (set ROAM_API_TOKEN or use --token)".to_string(),
                ));
            }
            let mut client = CloudClient::new(&credentials.graph_name, &credentials.token);
            if let Some(base_url) = overrides.base_url.as_deref().filter(|url| !url.is_empty()) {
                client = client.with_base_url(base_url);
            }
            if let Some(timeout) = overrides.timeout {
                client = client.with_timeout(timeout);
            }
            Ok(Client::Cloud(client))
        }
        Mode::Encrypted => {
            let mut client = LocalClient::new(&credentials.graph_name);
            if let Some(timeout) = overrides.timeout {
                client = client.with_timeout(timeout);
            }
            if let Some(path) = &overrides.port_file {
                client = client.with_port_file(path);
            }
            Ok(Client::Local(client))
        }
    }
}
