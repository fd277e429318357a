//! Configuration for courscape.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (COURSCAPE_PROGRESS_DIR, COURSCAPE_COOKIES,
//!    SKIP_COURSES, SKIP_SPECIALIZATIONS)
//! 2. Config file (.courscape/config.yaml)
//! 3. Defaults (./progress, ./cookies.json, built-in type sets)
//!
//! Config file discovery:
//! - Searches current directory and parents for .courscape/config.yaml
//! - Falls back to the platform config dir (e.g. ~/.config/courscape/config.yaml)
//! - Paths in config file are relative to the directory holding .courscape/

pub mod paths;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::{ClassificationPolicy, ProcessorSettings};
use crate::domain::SuccessPolicy;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub classification: Option<ClassificationPolicy>,
    #[serde(default)]
    pub skip: TargetsConfig,
    #[serde(default)]
    pub targets: TargetsConfig,
    #[serde(default)]
    pub processing: Option<ProcessingConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Progress root directory (relative to the project root)
    pub progress: Option<String>,
    /// Session cookie file (relative to the project root)
    pub cookies: Option<String>,
}

/// Lists of course and specialization slugs
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TargetsConfig {
    #[serde(default)]
    pub courses: Vec<String>,
    #[serde(default)]
    pub specializations: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    pub success_policy: Option<SuccessPolicy>,
    pub requeue_stale: Option<bool>,
}

/// Values taken from the environment
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub progress_dir: Option<PathBuf>,
    pub cookies: Option<PathBuf>,
    pub skip_courses: Vec<String>,
    pub skip_specializations: Vec<String>,
}

impl EnvOverrides {
    /// Read overrides from the process environment
    pub fn from_env() -> Self {
        Self {
            progress_dir: std::env::var("COURSCAPE_PROGRESS_DIR").ok().map(PathBuf::from),
            cookies: std::env::var("COURSCAPE_COOKIES").ok().map(PathBuf::from),
            skip_courses: split_list(&std::env::var("SKIP_COURSES").unwrap_or_default()),
            skip_specializations: split_list(
                &std::env::var("SKIP_SPECIALIZATIONS").unwrap_or_default(),
            ),
        }
    }
}

/// Split a comma-separated list, trimming entries and dropping empties
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Root of the progress documents
    pub progress_dir: PathBuf,
    /// Session cookie file
    pub cookies_file: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Classification type sets
    pub classification: ClassificationPolicy,
    /// Courses and specializations never processed
    pub skip: TargetsConfig,
    /// Targets for `--from-config`
    pub targets: TargetsConfig,
    /// Processing settings
    pub processing: ProcessingSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingSettings {
    pub success_policy: SuccessPolicy,
    pub requeue_stale: bool,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            success_policy: SuccessPolicy::Lenient,
            requeue_stale: true,
        }
    }
}

impl ResolvedConfig {
    /// Processor settings for this configuration
    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            policy: self.classification.clone(),
            success_policy: self.processing.success_policy,
            requeue_stale: self.processing.requeue_stale,
            reset_progress: false,
            update_types: false,
        }
    }
}

/// Find config file by searching current directory and parents, then the
/// platform config directory
fn find_config_file() -> Option<PathBuf> {
    if let Ok(mut current) = std::env::current_dir() {
        loop {
            let config_path = current.join(paths::CONFIG_DIR).join(paths::CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }
    }

    let user_config = dirs::config_dir()?.join("courscape").join(paths::CONFIG_FILE);
    user_config.exists().then_some(user_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge a parsed config file and environment overrides over the defaults
fn resolve(config: Option<(PathBuf, ConfigFile)>, env: EnvOverrides) -> ResolvedConfig {
    let mut resolved = ResolvedConfig {
        progress_dir: PathBuf::from(paths::DEFAULT_PROGRESS_DIR),
        cookies_file: PathBuf::from(paths::DEFAULT_COOKIES_FILE),
        config_file: None,
        classification: ClassificationPolicy::default(),
        skip: TargetsConfig::default(),
        targets: TargetsConfig::default(),
        processing: ProcessingSettings::default(),
    };

    if let Some((config_path, config)) = config {
        // Base directory is the parent of .courscape/
        let base_dir = config_path
            .parent()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        if let Some(ref progress) = config.paths.progress {
            resolved.progress_dir = resolve_path(&base_dir, progress);
        }
        if let Some(ref cookies) = config.paths.cookies {
            resolved.cookies_file = resolve_path(&base_dir, cookies);
        }
        if let Some(classification) = config.classification {
            resolved.classification = classification;
        }
        if let Some(processing) = config.processing {
            if let Some(policy) = processing.success_policy {
                resolved.processing.success_policy = policy;
            }
            if let Some(requeue) = processing.requeue_stale {
                resolved.processing.requeue_stale = requeue;
            }
        }
        resolved.skip = config.skip;
        resolved.targets = config.targets;
        resolved.config_file = Some(config_path);
    }

    if let Some(dir) = env.progress_dir {
        resolved.progress_dir = dir;
    }
    if let Some(cookies) = env.cookies {
        resolved.cookies_file = cookies;
    }
    resolved.skip.courses.extend(env.skip_courses);
    resolved.skip.specializations.extend(env.skip_specializations);

    resolved
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config = match find_config_file() {
        Some(path) => {
            let file = load_config_file(&path)?;
            Some((path, file))
        }
        None => None,
    };

    Ok(resolve(config, EnvOverrides::from_env()))
}

/// Load configuration from an explicit config file plus the environment
pub fn load_config_from(path: &Path) -> Result<ResolvedConfig> {
    let file = load_config_file(path)?;
    Ok(resolve(Some((path.to_path_buf(), file)), EnvOverrides::from_env()))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
