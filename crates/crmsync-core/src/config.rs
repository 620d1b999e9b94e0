//! Configuration parsing and validation
//!
//! All settings live in `crmsync.yaml`. The file is rendered as a Jinja
//! template before it is parsed, so secrets can be pulled from the
//! environment instead of being committed:
//!
//! ```yaml
//! pipedrive:
//!   api_token: "{{ env_var('PIPEDRIVE_API_TOKEN') }}"
//!   company_domain: acme
//!
//! mapping:
//!   - pipedrive_key: name
//!     input_key: fullName
//!   - pipedrive_key: email
//!     input_key: contact.email
//!
//! input: data/person.json
//! ```

use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::mapping::{MappingTable, TargetField};

/// Default config file name inside a project directory
pub const CONFIG_FILE: &str = "crmsync.yaml";

/// Pipedrive connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct PipedriveConfig {
    /// API token sent with every request
    #[serde(default)]
    pub api_token: String,

    /// Company subdomain, e.g. `acme` for `acme.pipedrive.com`
    #[serde(default)]
    pub company_domain: Option<String>,

    /// Explicit API root; takes precedence over `company_domain`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for PipedriveConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            company_domain: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for PipedriveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.api_token.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("PipedriveConfig")
            .field("api_token", &token)
            .field("company_domain", &self.company_domain)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl PipedriveConfig {
    /// The API root requests are sent to
    pub fn resolve_base_url(&self) -> Result<String> {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let url = match (non_empty(&self.base_url), non_empty(&self.company_domain)) {
            (Some(url), _) => url,
            (None, Some(domain)) => format!("https://{domain}.pipedrive.com/api/v1"),
            (None, None) => {
                return Err(Error::configuration(
                    "either pipedrive.base_url or pipedrive.company_domain must be set",
                ));
            }
        };

        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| Error::configuration(format!("invalid base URL '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::configuration(format!(
                "base URL '{url}' must use http or https"
            )));
        }

        Ok(url)
    }

    /// Check credentials and endpoint settings
    pub fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(Error::configuration("pipedrive.api_token is not set"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::configuration(
                "pipedrive.timeout_secs must be greater than zero",
            ));
        }
        self.resolve_base_url().map(|_| ())
    }
}

/// Where the record to sync comes from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum InputSource {
    /// JSON file, relative to the config file
    Path(PathBuf),
    /// Record written directly in the config
    Inline(Map<String, Value>),
}

/// Contents of `crmsync.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Connection settings
    #[serde(default)]
    pub pipedrive: PipedriveConfig,

    /// Ordered field mapping
    #[serde(default)]
    pub mapping: MappingTable,

    /// Record to sync
    #[serde(default)]
    pub input: Option<InputSource>,
}

impl SyncConfig {
    /// Render `contents` as a template and parse the result
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let rendered = render_template(contents)?;
        Ok(serde_yaml::from_str(&rendered)?)
    }

    /// Check that the mapping can drive a sync
    pub fn validate_mapping(&self) -> Result<()> {
        if self.mapping.is_empty() {
            return Err(Error::configuration("mapping must contain at least one entry"));
        }
        if self.mapping.identity_entry().is_none() {
            return Err(Error::configuration(format!(
                "no mapping for identifying field '{}'",
                TargetField::IDENTITY
            )));
        }
        Ok(())
    }

    /// Check connection settings and mapping
    pub fn validate(&self) -> Result<()> {
        self.pipedrive.validate()?;
        self.validate_mapping()
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Replaces `pipedrive.api_token`
    pub api_token: Option<String>,
    /// Replaces `pipedrive.company_domain`
    pub company_domain: Option<String>,
    /// Replaces `pipedrive.base_url`
    pub base_url: Option<String>,
    /// Replaces `input` with a file path, relative to the working directory
    pub input: Option<PathBuf>,
}

/// Loaded configuration plus where it came from
#[derive(Debug, Clone)]
pub struct Config {
    /// Parsed settings
    pub sync: SyncConfig,

    /// Directory relative paths are resolved against
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory or file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or crmsync.yaml file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(CONFIG_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let sync = SyncConfig::from_yaml(&contents)?;

        tracing::debug!(
            path = %config_path.display(),
            entries = sync.mapping.len(),
            "Loaded configuration"
        );

        Ok(Self { sync, base_path })
    }

    /// Apply command-line and environment overrides.
    ///
    /// A relative `input` override is resolved against the current working
    /// directory, not the config file's directory.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<()> {
        let pipedrive = &mut self.sync.pipedrive;
        if let Some(token) = overrides.api_token {
            pipedrive.api_token = token;
        }
        if let Some(domain) = overrides.company_domain {
            pipedrive.company_domain = Some(domain);
        }
        if let Some(url) = overrides.base_url {
            pipedrive.base_url = Some(url);
        }
        if let Some(input) = overrides.input {
            self.sync.input = Some(InputSource::Path(std::path::absolute(input)?));
        }
        Ok(())
    }

    /// Read the input record.
    ///
    /// Relative file paths are resolved against the config file's directory.
    /// The record must be a JSON object.
    pub fn load_input(&self) -> Result<Value> {
        let value = match &self.sync.input {
            None => return Err(Error::configuration("no input record configured")),
            Some(InputSource::Inline(record)) => Value::Object(record.clone()),
            Some(InputSource::Path(path)) => {
                let path = self.base_path.join(path);
                if !path.exists() {
                    return Err(Error::configuration(format!(
                        "input file not found: {}",
                        path.display()
                    )));
                }
                let contents = std::fs::read_to_string(&path)?;
                serde_json::from_str(&contents)?
            }
        };

        if !value.is_object() {
            return Err(Error::configuration("input record must be a JSON object"));
        }
        Ok(value)
    }
}

fn render_template(contents: &str) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env.add_function("env_var", env_var);
    Ok(env.render_str(contents, minijinja::context!())?)
}

/// `env_var(name, default=none)` template function
fn env_var(name: String, default: Option<String>) -> std::result::Result<String, minijinja::Error> {
    match std::env::var(&name) {
        Ok(value) => Ok(value),
        Err(_) => default.ok_or_else(|| {
            minijinja::Error::new(
                ErrorKind::InvalidOperation,
                format!("environment variable '{name}' is not set"),
            )
        }),
    }
}
