//! Configuration module
//!
//! Resolves the endpoint and credentials from the first readable config file
//! in the search path, then applies command-line / environment overrides.
//!
//! Config files are `key = value` lines; lines starting with `#` are comments.
//!
//! ```text
//! endpoint = https://api.1stblue.cloud/api/v1
//! accessId = etl
//! accessKey = ********
//! ```

use anyhow::{Context, Result};
use bluepipe_client::{Credentials, JobClient, ProtocolVersion};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Endpoint used when no config file names one
pub const DEFAULT_ENDPOINT: &str = "https://api.1stblue.cloud/api/v1";

/// Name of the config file looked up in each search directory
pub const CONFIG_FILE_NAME: &str = "bluepipe.conf";

/// Bundled fallback shipped next to the executable
pub const DEFAULT_CONFIG_FILE_NAME: &str = "bluepipe.default.conf";

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the Bluepipe API
    pub endpoint: String,

    /// Public access id
    pub access_id: String,

    /// Secret signing key
    pub access_key: String,

    /// Wire dialect of the server
    pub protocol: ProtocolVersion,

    /// Timeout of each HTTP request
    pub request_timeout: Duration,
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub access_id: Option<String>,
    pub access_key: Option<String>,
    pub protocol: Option<ProtocolVersion>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_id: String::new(),
            access_key: String::new(),
            protocol: ProtocolVersion::default(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Loads configuration
    ///
    /// With an explicit path, that file must be readable. Otherwise the first
    /// readable file of [`search_paths`] is used, and defaults apply when
    /// none is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        for path in search_paths() {
            match fs::read_to_string(&path) {
                Ok(text) => {
                    debug!("Using config file {}", path.display());
                    return Self::from_properties(&parse_properties(&text))
                        .with_context(|| format!("Invalid config file {}", path.display()));
                }
                Err(_) => continue,
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Loads configuration from one file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_properties(&parse_properties(&text))
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn from_properties(properties: &BTreeMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(endpoint) = properties.get("endpoint") {
            config.endpoint = endpoint.clone();
        }
        if let Some(access_id) = properties.get("accessId") {
            config.access_id = access_id.clone();
        }
        if let Some(access_key) = properties.get("accessKey") {
            config.access_key = access_key.clone();
        }
        if let Some(protocol) = properties.get("protocol") {
            config.protocol = protocol.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }
        if let Some(timeout) = properties.get("timeout") {
            let secs: u64 = timeout
                .parse()
                .with_context(|| format!("timeout must be a number of seconds, got '{}'", timeout))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Applies command-line and environment overrides
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(access_id) = overrides.access_id {
            self.access_id = access_id;
        }
        if let Some(access_key) = overrides.access_key {
            self.access_key = access_key;
        }
        if let Some(protocol) = overrides.protocol {
            self.protocol = protocol;
        }
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            anyhow::bail!("endpoint cannot be empty");
        }

        if !self.endpoint.trim().starts_with("http://")
            && !self.endpoint.trim().starts_with("https://")
        {
            anyhow::bail!("endpoint must start with http:// or https://");
        }

        if self.access_id.is_empty() {
            anyhow::bail!("accessId cannot be empty");
        }

        if self.access_key.is_empty() {
            anyhow::bail!("accessKey cannot be empty");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("timeout must be greater than 0");
        }

        Ok(())
    }

    /// Builds a client from this configuration
    pub fn client(&self) -> Result<JobClient> {
        JobClient::builder(self.endpoint.as_str())
            .credentials(Credentials::new(&self.access_id, &self.access_key))
            .protocol(self.protocol)
            .request_timeout(self.request_timeout)
            .build()
            .context("Failed to create Bluepipe client")
    }
}

/// Config files to try, in order
///
/// Working directory, executable directory, home directory, `/etc`, then
/// the bundled default next to the executable.
pub fn search_paths() -> Vec<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    let mut paths = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(CONFIG_FILE_NAME));
    }
    if let Some(dir) = &exe_dir {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from("/etc").join(CONFIG_FILE_NAME));
    if let Some(dir) = &exe_dir {
        paths.push(dir.join(DEFAULT_CONFIG_FILE_NAME));
    }

    paths.dedup();
    paths
}

/// Parses `key = value` lines
///
/// Everything after the first `=` is the value. Comment lines and lines
/// without `=` are skipped.
fn parse_properties(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}
