use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_API_BASE_URL: &str = "https://api.powerbi.com/v1.0/myorg";
pub const DEFAULT_SCOPE: &str = "https://analysis.windows.net/powerbi/api/.default";

/// How `list_reports_with_datasets` treats a failed dataset-name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetResolution {
    /// Leave the dataset name empty for that report and carry on.
    #[default]
    Lenient,
    /// Fail the whole listing with the lookup's error.
    Strict,
}

/// Settings consumed by `ServiceClient`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Identity provider host; the tenant id is appended to form the authority
    pub authority_host: String,

    /// Root of the analytics REST API, without trailing slash
    pub api_base_url: String,

    /// Per-request timeout in seconds. None keeps the HTTP client's default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    pub dataset_resolution: DatasetResolution,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: None,
            dataset_resolution: DatasetResolution::Lenient,
        }
    }
}

impl ClientConfig {
    /// Point both endpoints at one base, e.g. a local stub server.
    pub fn with_base_urls(authority_host: &str, api_base_url: &str) -> Self {
        Self {
            authority_host: authority_host.trim_end_matches('/').to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_dataset_resolution(mut self, mode: DatasetResolution) -> Self {
        self.dataset_resolution = mode;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,

    /// Prefer PBI_CLIENT_SECRET over storing this in the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    pub scope: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub workspace_id: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// On-disk configuration for the `pbi-cli` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub client: ClientConfig,
    pub credentials: CredentialsConfig,
    pub defaults: DefaultsConfig,
}

impl Config {
    /// Load config from the default location, falling back to defaults if there is none
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("pbi-cli").join("config.toml"))
    }

    /// Environment variables win over the file.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("PBI_TENANT_ID") {
            self.credentials.tenant_id = Some(v);
        }
        if let Some(v) = non_empty("PBI_CLIENT_ID") {
            self.credentials.client_id = Some(v);
        }
        if let Some(v) = non_empty("PBI_CLIENT_SECRET") {
            self.credentials.client_secret = Some(v);
        }
        if let Some(v) = non_empty("PBI_SCOPE") {
            self.credentials.scope = Some(v);
        }
        if let Some(v) = non_empty("PBI_WORKSPACE_ID") {
            self.defaults.workspace_id = Some(v);
        }
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        format!(
            r#"# pbi-cli configuration file
# Location: ~/.config/pbi-cli/config.toml (Linux)
#           ~/Library/Application Support/pbi-cli/config.toml (macOS)
#           %APPDATA%\pbi-cli\config.toml (Windows)

[client]
# Identity provider host; the tenant id is appended to it
authority_host = "{DEFAULT_AUTHORITY_HOST}"

# Analytics REST API root
api_base_url = "{DEFAULT_API_BASE_URL}"

# Per-request timeout in seconds (leave commented for the HTTP client default)
# timeout_secs = 60

# What to do when a report's dataset name cannot be resolved:
#   "lenient" leaves the name empty, "strict" fails the listing
dataset_resolution = "lenient"

[credentials]
# Service principal used for the client-credentials grant.
# Each value can be overridden with PBI_TENANT_ID, PBI_CLIENT_ID, PBI_SCOPE.
# tenant_id = "00000000-0000-0000-0000-000000000000"
# client_id = "00000000-0000-0000-0000-000000000000"
scope = "{DEFAULT_SCOPE}"

# Keep the secret out of this file; set PBI_CLIENT_SECRET instead.
# client_secret = ""

[defaults]
# Workspace used when --workspace is omitted (PBI_WORKSPACE_ID)
# workspace_id = "00000000-0000-0000-0000-000000000000"

# Where `docs` writes Documentation_<dataset>.xlsx (defaults to the current directory)
# output_dir = "/path/to/docs"
"#
        )
    }
}
