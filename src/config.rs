use crate::cli::Args;
use crate::types::{LookupConfig, OutputConfig, ScanConfig, ScanError, DEFAULT_LOOKUP_ENDPOINT};
use log::debug;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENV_FILE: &str = ".dScan";

/// Upper bound for `lookup_max_retries`; the last backoff step is ~100 s.
pub const MAX_LOOKUP_RETRIES: u32 = 10;

/// Settings as read from the config file and the environment, before
/// validation. Every field is optional at this stage.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub output_base_name: Option<String>,
    pub output_extension: Option<String>,
    pub output_size_limit_bytes: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub log_file_path: Option<PathBuf>,
    pub domain_input_path: Option<PathBuf>,
    pub skip_blank_lines: Option<bool>,
    pub lookup_api_token: Option<String>,
    pub lookup_endpoint: Option<String>,
    pub lookup_timeout_secs: Option<u64>,
    pub lookup_max_retries: Option<u32>,
    pub lookup_requests_per_second: Option<u32>,
    pub proxy: Option<String>,
}

/// Builds the run configuration from every layer: TOML file, env file,
/// process environment and finally the command line.
pub fn load_config(args: &Args) -> Result<ScanConfig, ScanError> {
    load_env_file(args.env_file.as_deref())?;

    let mut raw = match args.config_path.as_deref() {
        Some(path) => read_config_file(path)?,
        None => RawConfig::default(),
    };

    apply_env_overrides(&mut raw, |key| env::var(key).ok())?;

    if let Some(list) = &args.domains_file {
        raw.domain_input_path = Some(list.clone());
    }

    validate_config(raw)
}

fn load_env_file(path: Option<&Path>) -> Result<(), ScanError> {
    match path {
        Some(path) => {
            dotenv::from_path(path).map_err(|e| {
                ScanError::ConfigError(format!("Failed to load env file {}: {}", path.display(), e))
            })?;
            debug!("Loaded settings from {}", path.display());
        }
        None => {
            if Path::new(DEFAULT_ENV_FILE).exists() {
                dotenv::from_path(DEFAULT_ENV_FILE).map_err(|e| {
                    ScanError::ConfigError(format!(
                        "Failed to load env file {}: {}",
                        DEFAULT_ENV_FILE, e
                    ))
                })?;
                debug!("Loaded settings from {}", DEFAULT_ENV_FILE);
            }
        }
    }
    Ok(())
}

pub fn read_config_file(path: &Path) -> Result<RawConfig, ScanError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ScanError::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    toml::from_str(&contents).map_err(|e| {
        ScanError::ConfigError(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Overlays `DSCAN_*` variables on top of `raw`. `lookup` abstracts the
/// environment so callers can feed it from anywhere.
pub fn apply_env_overrides<F>(raw: &mut RawConfig, lookup: F) -> Result<(), ScanError>
where
    F: Fn(&str) -> Option<String>,
{
    let text = |key: &str| lookup(key).map(|v| v.trim().to_string());

    if let Some(v) = text("DSCAN_JSON_FILE_NAME") {
        raw.output_base_name = Some(v);
    }
    if let Some(v) = text("DSCAN_JSON_EXTENSION") {
        raw.output_extension = Some(v);
    }
    if let Some(v) = text("DSCAN_JSON_SIZE_LIMIT") {
        raw.output_size_limit_bytes = Some(parse_number("DSCAN_JSON_SIZE_LIMIT", &v)?);
    }
    if let Some(v) = text("DSCAN_OUTPUT_DIR") {
        raw.output_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = text("DSCAN_LOG_FILE_NAME") {
        raw.log_file_path = Some(PathBuf::from(v));
    }
    if let Some(v) = text("DSCAN_DOMAIN_FILE") {
        raw.domain_input_path = Some(PathBuf::from(v));
    }
    if let Some(v) = text("DSCAN_SKIP_BLANK_LINES") {
        raw.skip_blank_lines = Some(parse_bool("DSCAN_SKIP_BLANK_LINES", &v)?);
    }
    if let Some(v) = text("DSCAN_WHOIS_API_TOKEN") {
        raw.lookup_api_token = Some(v);
    }
    if let Some(v) = text("DSCAN_WHOIS_API_URL") {
        raw.lookup_endpoint = Some(v);
    }
    if let Some(v) = text("DSCAN_WHOIS_TIMEOUT_SECS") {
        raw.lookup_timeout_secs = Some(parse_number("DSCAN_WHOIS_TIMEOUT_SECS", &v)?);
    }
    if let Some(v) = text("DSCAN_WHOIS_MAX_RETRIES") {
        raw.lookup_max_retries = Some(parse_number("DSCAN_WHOIS_MAX_RETRIES", &v)?);
    }
    if let Some(v) = text("DSCAN_WHOIS_RATE_LIMIT") {
        raw.lookup_requests_per_second = Some(parse_number("DSCAN_WHOIS_RATE_LIMIT", &v)?);
    }
    if let Some(v) = text("DSCAN_PROXY") {
        raw.proxy = Some(v);
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ScanError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| {
        ScanError::ConfigError(format!("{} has invalid value {:?}: {}", key, value, e))
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ScanError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ScanError::ConfigError(format!("{} has invalid value {:?}", key, value))),
    }
}

fn required<T>(value: Option<T>, key: &str) -> Result<T, ScanError> {
    value.ok_or_else(|| ScanError::ConfigError(format!("Missing required setting {}", key)))
}

fn non_empty(value: String, key: &str) -> Result<String, ScanError> {
    if value.is_empty() {
        return Err(ScanError::ConfigError(format!("{} must not be empty", key)));
    }
    Ok(value)
}

pub fn validate_config(raw: RawConfig) -> Result<ScanConfig, ScanError> {
    let base_name = non_empty(
        required(raw.output_base_name, "output_base_name")?,
        "output_base_name",
    )?;
    let extension = non_empty(
        required(raw.output_extension, "output_extension")?,
        "output_extension",
    )?;
    let size_limit = required(raw.output_size_limit_bytes, "output_size_limit_bytes")?;
    let log_file = required(raw.log_file_path, "log_file_path")?;
    let domain_input = required(raw.domain_input_path, "domain_input_path")?;
    let api_token = non_empty(
        required(raw.lookup_api_token, "lookup_api_token")?,
        "lookup_api_token",
    )?;

    for (key, value) in [("output_base_name", &base_name), ("output_extension", &extension)] {
        if value.contains(['/', '\\']) {
            return Err(ScanError::ConfigError(format!(
                "{} must not contain a path separator",
                key
            )));
        }
    }
    if extension.starts_with('.') {
        return Err(ScanError::ConfigError(
            "output_extension must be given without the leading dot".to_string(),
        ));
    }

    let mut lookup = LookupConfig::new(api_token);
    lookup.endpoint = raw
        .lookup_endpoint
        .unwrap_or_else(|| DEFAULT_LOOKUP_ENDPOINT.to_string());
    let endpoint = url::Url::parse(&lookup.endpoint).map_err(|e| {
        ScanError::ConfigError(format!("Invalid lookup endpoint {:?}: {}", lookup.endpoint, e))
    })?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(ScanError::ConfigError(format!(
            "Lookup endpoint must be http or https, got {}",
            endpoint.scheme()
        )));
    }

    if let Some(secs) = raw.lookup_timeout_secs {
        if secs == 0 {
            return Err(ScanError::ConfigError(
                "lookup_timeout_secs must be greater than 0".to_string(),
            ));
        }
        lookup.timeout = Duration::from_secs(secs);
    }
    if let Some(rate) = raw.lookup_requests_per_second {
        if rate == 0 {
            return Err(ScanError::ConfigError(
                "lookup_requests_per_second must be greater than 0".to_string(),
            ));
        }
        lookup.requests_per_second = Some(rate);
    }
    lookup.max_retries = raw.lookup_max_retries.unwrap_or(0);
    if lookup.max_retries > MAX_LOOKUP_RETRIES {
        return Err(ScanError::ConfigError(format!(
            "lookup_max_retries must be at most {}, got {}",
            MAX_LOOKUP_RETRIES, lookup.max_retries
        )));
    }
    lookup.proxy = raw.proxy.filter(|p| !p.is_empty());

    Ok(ScanConfig {
        output: OutputConfig {
            dir: raw.output_dir.unwrap_or_else(|| PathBuf::from(".")),
            base_name,
            extension,
            size_limit,
        },
        log_file,
        domain_input,
        skip_blank_lines: raw.skip_blank_lines.unwrap_or(false),
        lookup,
    })
}
