use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::{AnnotationPattern, ScanError};
use crate::walker::ScanScope;

pub const TOKEN_ENV: &str = "KLAW_TOKEN";
const TOKEN_FILE: &str = ".gittoken";
const DEFAULT_SYMBOL: &str = "//";
const DEFAULT_KEYWORD: &str = "todo";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("No klaw.yml found at or above {0}")]
    NotFound(PathBuf),
    #[error("File extensions missing in {0}")]
    MissingExtensions(PathBuf),
    #[error("No GitHub token: set KLAW_TOKEN, `gittoken` in klaw.yml, or a .gittoken file")]
    MissingToken,
    #[error("Invalid comment pattern: {0}")]
    Pattern(#[from] ScanError),
    #[error("{0}")]
    Conflict(String),
}

/// Contents of `klaw.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KlawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gittoken: Option<String>,
    /// Scan root, relative to the config file. Defaults to its directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Directory leaf names skipped during the scan (e.g. "vendor").
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todocommentsymbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todokeyword: Option<String>,
    /// Login assigned to issues created from annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Env,
    Config,
    File,
}

impl TokenSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenSource::Env => TOKEN_ENV,
            TokenSource::Config => "klaw.yml",
            TokenSource::File => TOKEN_FILE,
        }
    }
}

/// Validated configuration with defaults applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub root: PathBuf,
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub comment_symbol: String,
    pub keyword: String,
    pub assignee: Option<String>,
    token: Option<(String, TokenSource)>,
}

impl Settings {
    pub fn scope(&self) -> ScanScope {
        ScanScope::new(&self.root, self.extensions.clone()).exclude(self.exclude.iter().cloned())
    }

    pub fn pattern(&self) -> Result<AnnotationPattern, ConfigError> {
        Ok(AnnotationPattern::new(&self.comment_symbol, &self.keyword)?)
    }

    pub fn token(&self) -> Result<&str, ConfigError> {
        self.token
            .as_ref()
            .map(|(token, _)| token.as_str())
            .ok_or(ConfigError::MissingToken)
    }

    pub fn token_source(&self) -> Option<TokenSource> {
        self.token.as_ref().map(|(_, source)| *source)
    }

    /// Key/value view for display; the token itself is never included.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("config", self.config_path.display().to_string()),
            ("directory", self.root.display().to_string()),
            ("extensions", self.extensions.join(", ")),
            ("exclude", self.exclude.join(", ")),
            ("todocommentsymbol", self.comment_symbol.clone()),
            ("todokeyword", self.keyword.clone()),
            (
                "assignee",
                self.assignee.clone().unwrap_or_else(|| "-".to_string()),
            ),
            (
                "gittoken",
                self.token_source()
                    .map(|source| format!("set ({})", source.as_str()))
                    .unwrap_or_else(|| "missing".to_string()),
            ),
        ]
    }
}

pub fn config_filename_candidates() -> [&'static str; 2] {
    ["klaw.yml", "klaw.yaml"]
}

pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    for candidate in start.ancestors() {
        for name in config_filename_candidates() {
            let path = candidate.join(name);
            if path.is_file() {
                return Some(path);
            }
        }
    }
    None
}

pub fn parse_config(path: &Path) -> Result<KlawConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if text.trim().is_empty() {
        return Ok(KlawConfig::default());
    }
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `go` -> `.go`; blanks dropped; order kept, duplicates removed.
pub fn normalize_extensions(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for ext in raw {
        let trimmed = ext.trim();
        if trimmed.is_empty() {
            continue;
        }
        let normalized = if trimmed.starts_with('.') {
            trimmed.to_string()
        } else {
            format!(".{}", trimmed)
        };
        if !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    out
}

/// Token precedence: environment, config key, `.gittoken` next to the config.
pub fn resolve_token(
    env_value: Option<String>,
    config: &KlawConfig,
    config_dir: &Path,
) -> Option<(String, TokenSource)> {
    let non_empty = |value: &str| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };
    if let Some(token) = env_value.as_deref().and_then(non_empty) {
        return Some((token, TokenSource::Env));
    }
    if let Some(token) = config.gittoken.as_deref().and_then(non_empty) {
        return Some((token, TokenSource::Config));
    }
    let text = fs::read_to_string(config_dir.join(TOKEN_FILE)).ok()?;
    non_empty(&text).map(|token| (token, TokenSource::File))
}

/// Build settings from an already parsed config.
pub fn settings_from_config(
    config: KlawConfig,
    config_path: &Path,
    root_override: Option<&Path>,
    env_token: Option<String>,
) -> Result<Settings, ConfigError> {
    let config_dir = config_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let extensions = normalize_extensions(&config.extensions);
    if extensions.is_empty() {
        return Err(ConfigError::MissingExtensions(config_path.to_path_buf()));
    }

    let root = match root_override {
        Some(root) => root.to_path_buf(),
        None => match config.directory.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => config_dir.join(dir),
            _ => config_dir.clone(),
        },
    };

    let pick = |value: &Option<String>, default: &str| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(default)
            .to_string()
    };
    let comment_symbol = pick(&config.todocommentsymbol, DEFAULT_SYMBOL);
    let keyword = pick(&config.todokeyword, DEFAULT_KEYWORD);
    let token = resolve_token(env_token, &config, &config_dir);
    let exclude = config
        .exclude
        .iter()
        .map(|name| name.trim().trim_end_matches('/').to_string())
        .filter(|name| !name.is_empty())
        .collect();
    let assignee = config
        .assignee
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    Ok(Settings {
        config_path: config_path.to_path_buf(),
        root,
        extensions,
        exclude,
        comment_symbol,
        keyword,
        assignee,
        token,
    })
}

/// Locate (or take) the config file, parse it and apply defaults.
pub fn load_settings(
    start: &Path,
    explicit: Option<&Path>,
    root_override: Option<&Path>,
) -> Result<Settings, ConfigError> {
    let config_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => find_config_file(start).ok_or_else(|| ConfigError::NotFound(start.to_path_buf()))?,
    };
    let config = parse_config(&config_path)?;
    settings_from_config(
        config,
        &config_path,
        root_override,
        std::env::var(TOKEN_ENV).ok(),
    )
}

pub fn write_config(dir: &Path, config: &KlawConfig) -> Result<PathBuf, ConfigError> {
    let path = dir.join("klaw.yml");
    let body = serde_yaml::to_string(config).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, body)?;
    Ok(path)
}
