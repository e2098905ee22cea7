//! Configuration management for the PDF converter server

use serde::Deserialize;
use std::env;
use thiserror::Error;

use crate::render::PipelineLimits;

const MB: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub render: RenderSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderSettings {
    /// Upload ceiling in MiB
    pub max_upload_mb: usize,
    /// Per-page raster budget in MiB
    pub max_page_raster_mb: f64,
    /// Resident memory above which quality is degraded further
    pub memory_soft_limit_mb: Option<u64>,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            render: RenderSettings {
                max_upload_mb: 30,
                max_page_raster_mb: 512.0,
                memory_soft_limit_mb: None,
                request_timeout_secs: 120,
            },
        }
    }
}

impl RenderSettings {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * MB
    }

    pub fn pipeline_limits(&self) -> PipelineLimits {
        PipelineLimits {
            max_document_bytes: self.max_upload_bytes(),
            max_page_raster_mb: self.max_page_raster_mb,
            memory_soft_limit_bytes: self.memory_soft_limit_mb.map(|mb| mb * MB as u64),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let first = |names: &[&str]| names.iter().find_map(|&name| lookup(name));

        Ok(Config {
            server: ServerConfig {
                host: first(&["SERVER_HOST", "HOST"][..]).unwrap_or(defaults.server.host),
                port: parse_or("PORT", first(&["PORT", "SERVER_PORT"][..]), defaults.server.port)?,
            },
            render: RenderSettings {
                max_upload_mb: parse_or(
                    "MAX_UPLOAD_MB",
                    lookup("MAX_UPLOAD_MB"),
                    defaults.render.max_upload_mb,
                )?,
                max_page_raster_mb: parse_or(
                    "MAX_PAGE_RASTER_MB",
                    lookup("MAX_PAGE_RASTER_MB"),
                    defaults.render.max_page_raster_mb,
                )?,
                memory_soft_limit_mb: lookup("MEMORY_SOFT_LIMIT_MB")
                    .map(|v| parse_value("MEMORY_SOFT_LIMIT_MB", v))
                    .transpose()?,
                request_timeout_secs: parse_or(
                    "REQUEST_TIMEOUT_SECS",
                    lookup("REQUEST_TIMEOUT_SECS"),
                    defaults.render.request_timeout_secs,
                )?,
            },
        })
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { name, value })
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => parse_value(name, v),
        None => Ok(default),
    }
}
