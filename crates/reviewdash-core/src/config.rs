use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregate::PriorityThresholds;
use crate::sync::ReconnectPolicy;

/// Environment variable overriding `server.base_url`.
pub const SERVER_ENV: &str = "REVIEWDASH_SERVER";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub priority: PriorityConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_files_path")]
    pub files_path: String,
    #[serde(default = "default_upload_field")]
    pub upload_field: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            files_path: default_files_path(),
            upload_field: default_upload_field(),
        }
    }
}

impl ServerConfig {
    /// Absolute URL of the file collection endpoint.
    #[must_use]
    pub fn files_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.files_path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// 0 means retry forever.
    #[serde(default)]
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_attempts: 0,
        }
    }
}

impl ReconnectConfig {
    #[must_use]
    pub const fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            max_attempts: self.max_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityConfig {
    #[serde(default = "default_frequency_threshold")]
    pub frequency_threshold: f64,
    #[serde(default = "default_negative_threshold")]
    pub negative_threshold: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            frequency_threshold: default_frequency_threshold(),
            negative_threshold: default_negative_threshold(),
        }
    }
}

impl PriorityConfig {
    #[must_use]
    pub const fn thresholds(&self) -> PriorityThresholds {
        PriorityThresholds {
            frequency: self.frequency_threshold,
            negative_pct: self.negative_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_brand")]
    pub brand: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            brand: default_brand(),
        }
    }
}

/// Page geometry of the exported PDF, in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_page_width_mm")]
    pub page_width_mm: f64,
    #[serde(default = "default_page_height_mm")]
    pub page_height_mm: f64,
    #[serde(default = "default_margin_mm")]
    pub margin_mm: f64,
    #[serde(default = "default_page_break_at_mm")]
    pub page_break_at_mm: f64,
    #[serde(default = "default_title_font_size")]
    pub title_font_size: f64,
    #[serde(default = "default_raster_scale")]
    pub raster_scale: f64,
    /// External command that turns a Vega-Lite spec on stdin into PNG on stdout.
    #[serde(default = "default_rasterizer")]
    pub rasterizer: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_width_mm: default_page_width_mm(),
            page_height_mm: default_page_height_mm(),
            margin_mm: default_margin_mm(),
            page_break_at_mm: default_page_break_at_mm(),
            title_font_size: default_title_font_size(),
            raster_scale: default_raster_scale(),
            rasterizer: default_rasterizer(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Load `.reviewdash/config.toml` under `project_root`, or defaults.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    load_config_file(&project_root.join(".reviewdash/config.toml"))
}

/// Load an explicit project config file, or defaults when it is absent.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig> {
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Path of the per-user config file, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("reviewdash/config.toml"))
}

/// Load the per-user config, or defaults.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(path) = user_config_path() else {
        return Ok(UserConfig::default());
    };
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge project config, user config and environment.
///
/// `config_path` replaces the project config location when given.
///
/// # Errors
///
/// Fails if any present config file cannot be read or parsed.
pub fn resolve_config(
    project_root: &Path,
    config_path: Option<&Path>,
    cli_json: bool,
) -> Result<EffectiveConfig> {
    let mut project = match config_path {
        Some(path) => load_config_file(path)?,
        None => load_project_config(project_root)?,
    };
    let user = load_user_config()?;

    apply_server_override(
        &mut project.server,
        env::var(SERVER_ENV).ok(),
        user.server.clone(),
    );

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format);

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

/// Environment wins over the user's default server; both win over the project.
fn apply_server_override(
    server: &mut ServerConfig,
    env_server: Option<String>,
    user_server: Option<String>,
) {
    if let Some(url) = env_server
        .or(user_server)
        .filter(|url| !url.trim().is_empty())
    {
        server.base_url = url.trim().to_string();
    }
}

fn resolve_output(cli_json: bool, user_output: Option<String>, env_format: Option<String>) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_files_path() -> String {
    "/api/file/".to_string()
}

fn default_upload_field() -> String {
    "file".to_string()
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

const fn default_frequency_threshold() -> f64 {
    40.0
}

const fn default_negative_threshold() -> f64 {
    60.0
}

fn default_brand() -> String {
    "Bandon Fitness".to_string()
}

const fn default_page_width_mm() -> f64 {
    210.0
}

const fn default_page_height_mm() -> f64 {
    297.0
}

const fn default_margin_mm() -> f64 {
    10.0
}

const fn default_page_break_at_mm() -> f64 {
    250.0
}

const fn default_title_font_size() -> f64 {
    14.0
}

const fn default_raster_scale() -> f64 {
    2.0
}

fn default_rasterizer() -> String {
    "vl2png".to_string()
}
