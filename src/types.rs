// src/types.rs
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LOOKUP_ENDPOINT: &str = "https://whoisjsonapi.com";

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub output: OutputConfig,
    pub log_file: PathBuf,
    pub domain_input: PathBuf,
    pub skip_blank_lines: bool,
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub base_name: String,
    pub extension: String,
    pub size_limit: u64,
}

#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub endpoint: String,
    pub api_token: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub requests_per_second: Option<u32>,
    pub user_agent: String,
    pub proxy: Option<String>,
}

impl LookupConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_LOOKUP_ENDPOINT.to_string(),
            api_token: api_token.into(),
            timeout: Duration::from_secs(30),
            max_retries: 0,
            requests_per_second: None,
            user_agent: format!("dscan/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
        }
    }
}

/// Registrar block of a WHOIS answer. Missing or null fields become "".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrar {
    #[serde(default, deserialize_with = "empty_if_null")]
    pub id: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub name: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub phone: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub email: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub referral_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrant {
    #[serde(default, deserialize_with = "empty_if_null")]
    pub name: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub organization: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub street: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub city: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub province: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub postal_code: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub country: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub phone: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub email: String,
}

/// The part of the lookup service's answer that gets persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WhoisResponse {
    pub registrar: Registrar,
    pub registrant: Registrant,
}

/// One output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub domain: String,
    pub scan_date: String,
    pub registrar: Registrar,
    pub registrant: Registrant,
}

impl DomainRecord {
    pub fn new(
        domain: impl Into<String>,
        scan_date: impl Into<String>,
        response: WhoisResponse,
    ) -> Self {
        Self {
            domain: domain.into(),
            scan_date: scan_date.into(),
            registrar: response.registrar,
            registrant: response.registrant,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanStats {
    pub domains_read: u64,
    pub records_written: u64,
    pub first_index: u64,
    pub last_index: u64,
    pub duration: Duration,
}

fn empty_if_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Domain file is empty: {}", .0.display())]
    EmptyInput(PathBuf),

    #[error("Domain file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Filesystem error: {context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed output index in file name {file_name:?}")]
    MalformedIndex { file_name: String },

    #[error("Transport error while looking up {domain}: {source}")]
    Transport {
        domain: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not decode lookup response for {domain}: {message}\nBody: {body}")]
    Decode {
        domain: String,
        message: String,
        body: String,
    },

    #[error("Lookup service returned {status} for {domain}. Body: {body}")]
    LookupStatus {
        domain: String,
        status: u16,
        body: String,
    },

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ScanError {
    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ScanError::ConfigError(_) => 2,
            ScanError::EmptyInput(_) | ScanError::NotFound(_) => 3,
            ScanError::Filesystem { .. } => 4,
            ScanError::MalformedIndex { .. } => 5,
            ScanError::Transport { .. } => 6,
            ScanError::Decode { .. }
            | ScanError::LookupStatus { .. }
            | ScanError::Serialize(_) => 7,
        }
    }
}
