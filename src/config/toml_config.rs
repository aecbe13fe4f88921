use crate::core::dataset::{INDEX_COLUMN, LISTING_COLUMNS};
use crate::utils::error::{HarvestError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.yell.com/ucs/UcsSearchAction.do";
const DEFAULT_LISTING_BASE_URL: &str = "https://www.yell.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/70.0.3538.77 Safari/537.36";
const DEFAULT_CONTENT_SELECTOR: &str = "div.grid.grid-fluid";

/// Run configuration, built once at startup and passed by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    pub search: SearchConfig,
    pub areas: AreasConfig,
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub term: String,
    /// Miles from the area centre.
    #[serde(default = "default_radius")]
    pub radius: u32,
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    /// Prefix for relative `/biz/...` listing links.
    #[serde(default = "default_listing_base_url")]
    pub listing_base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaMode {
    Top,
    Named,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreasConfig {
    pub mode: AreaMode,
    pub count: Option<usize>,
    #[serde(default)]
    pub names: Vec<String>,
    /// Page holding the population-ranked area table.
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaSelection {
    Top(usize),
    Named(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    pub keywords: Vec<String>,
    #[serde(default = "default_content_selector")]
    pub content_selector: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_wait_seconds")]
    pub wait_seconds: u64,
    #[serde(default = "default_detail_max_attempts")]
    pub detail_max_attempts: u32,
    #[serde(default = "default_detail_max_wait_seconds")]
    pub detail_max_wait_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            wait_seconds: default_wait_seconds(),
            detail_max_attempts: default_detail_max_attempts(),
            detail_max_wait_seconds: default_detail_max_wait_seconds(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelephoneFormat {
    /// Leading `'` so spreadsheet tools keep the value as text.
    #[default]
    Prefixed,
    Plain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_master_file")]
    pub master_file: String,
    #[serde(default)]
    pub telephone_format: TelephoneFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            data_dir: default_data_dir(),
            master_file: default_master_file(),
            telephone_format: TelephoneFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_radius() -> u32 {
    10
}
fn default_search_endpoint() -> String {
    DEFAULT_SEARCH_ENDPOINT.to_string()
}
fn default_listing_base_url() -> String {
    DEFAULT_LISTING_BASE_URL.to_string()
}
fn default_content_selector() -> String {
    DEFAULT_CONTENT_SELECTOR.to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_wait_seconds() -> u64 {
    120
}
fn default_detail_max_attempts() -> u32 {
    8
}
fn default_detail_max_wait_seconds() -> u64 {
    600
}
fn default_root() -> String {
    ".".to_string()
}
fn default_data_dir() -> String {
    "data".to_string()
}
fn default_master_file() -> String {
    "master.csv".to_string()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_timeout_seconds() -> u64 {
    30
}

impl HarvestConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(HarvestError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HarvestError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| HarvestError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Search term as used in checkpoint file names: lower-case, spaces to `_`.
    pub fn search_word(&self) -> String {
        self.search.term.trim().to_lowercase().replace(' ', "_")
    }

    pub fn selection(&self) -> AreaSelection {
        match self.areas.mode {
            AreaMode::Top => AreaSelection::Top(self.areas.count.unwrap_or(0)),
            AreaMode::Named => AreaSelection::Named(self.areas.names.clone()),
        }
    }

    pub fn search_wait(&self) -> Duration {
        Duration::from_secs(self.retry.wait_seconds)
    }

    pub fn detail_max_wait(&self) -> Duration {
        Duration::from_secs(self.retry.detail_max_wait_seconds)
    }
}

impl Validate for HarvestConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("search.term", &self.search.term)?;
        validation::validate_url("search.endpoint", &self.search.endpoint)?;
        validation::validate_url("search.listing_base_url", &self.search.listing_base_url)?;

        match self.areas.mode {
            AreaMode::Top => {
                let count = validation::validate_required_field("areas.count", &self.areas.count)?;
                validation::validate_positive_number("areas.count", *count, 1)?;
                let url =
                    validation::validate_required_field("areas.source_url", &self.areas.source_url)?;
                validation::validate_url("areas.source_url", url)?;
            }
            AreaMode::Named => {
                if self.areas.names.is_empty() {
                    return Err(HarvestError::MissingConfigError {
                        field: "areas.names".to_string(),
                    });
                }
                if let Some(url) = &self.areas.source_url {
                    validation::validate_url("areas.source_url", url)?;
                }
            }
        }

        for (position, keyword) in self.enrichment.keywords.iter().enumerate() {
            validation::validate_non_empty_string("enrichment.keywords", keyword)?;
            validation::validate_regex("enrichment.keywords", keyword)?;
            // Keywords double as CSV column names.
            if keyword == INDEX_COLUMN || LISTING_COLUMNS.contains(&keyword.as_str()) {
                return Err(HarvestError::InvalidConfigValueError {
                    field: "enrichment.keywords".to_string(),
                    value: keyword.clone(),
                    reason: "Keyword clashes with a listing column name".to_string(),
                });
            }
            if self.enrichment.keywords[..position].contains(keyword) {
                return Err(HarvestError::InvalidConfigValueError {
                    field: "enrichment.keywords".to_string(),
                    value: keyword.clone(),
                    reason: "Keyword is listed more than once".to_string(),
                });
            }
        }
        validation::validate_selector(
            "enrichment.content_selector",
            &self.enrichment.content_selector,
        )?;

        validation::validate_positive_number(
            "retry.max_attempts",
            self.retry.max_attempts as usize,
            1,
        )?;
        validation::validate_positive_number(
            "retry.detail_max_attempts",
            self.retry.detail_max_attempts as usize,
            1,
        )?;

        validation::validate_path("output.root", &self.output.root)?;
        validation::validate_path("output.data_dir", &self.output.data_dir)?;
        validation::validate_path("output.master_file", &self.output.master_file)?;
        Ok(())
    }
}
