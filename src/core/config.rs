//! Run configuration: built-in defaults, optional TOML file, CLI overrides.
//!
//! Credential resolution lives here too so the core only ever receives an
//! already-resolved [`Secret`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, ScoutError};
use crate::core::http::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::core::pacing::{DEFAULT_QUERY_DELAY, DEFAULT_STORE_DELAY, Pacing};
use crate::core::remote::Secret;
use crate::core::snapshot;
use crate::core::vcs::{CommitIdentity, DEFAULT_GIT_TIMEOUT};

/// Environment variables consulted, in order, when no token flag is given.
pub const TOKEN_ENV_VARS: &[&str] = &["GITHUB_PAT_ENV", "GH_PAT"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pacing: PacingConfig,
    pub http: HttpConfig,
    pub git: GitConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub query_delay_secs: f64,
    pub store_delay_secs: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            query_delay_secs: DEFAULT_QUERY_DELAY.as_secs_f64(),
            store_delay_secs: DEFAULT_STORE_DELAY.as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub timeout_secs: u64,
    pub user_name: String,
    pub user_email: String,
    /// Parent directory for workspaces; the system temp dir when unset.
    pub workspace_root: Option<PathBuf>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_GIT_TIMEOUT.as_secs(),
            user_name: "pricescout-bot".to_string(),
            user_email: "pricescout-bot@users.noreply.github.com".to_string(),
            workspace_root: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub branch: String,
    pub path_prefix: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            branch: "main".to_string(),
            path_prefix: "data".to_string(),
        }
    }
}

impl Config {
    /// Defaults when `path` is `None`; an explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    ScoutError::ConfigError(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_toml(&content)
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let delays = [self.pacing.query_delay_secs, self.pacing.store_delay_secs];
        if delays.iter().any(|d| Duration::try_from_secs_f64(*d).is_err()) {
            return Err(ScoutError::ConfigError(
                "pacing delays must be non-negative numbers of seconds within range".to_string(),
            ));
        }
        if self.git.timeout_secs == 0 || self.http.timeout_secs == 0 {
            return Err(ScoutError::ConfigError(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        snapshot::validate_prefix(&self.publish.path_prefix)
            .map_err(|e| ScoutError::ConfigError(e.to_string()))
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            query_delay: Duration::from_secs_f64(self.pacing.query_delay_secs),
            store_delay: Duration::from_secs_f64(self.pacing.store_delay_secs),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git.timeout_secs)
    }

    pub fn identity(&self) -> CommitIdentity {
        CommitIdentity {
            name: self.git.user_name.clone(),
            email: self.git.user_email.clone(),
        }
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.git
            .workspace_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Resolves the push credential: explicit value first, then each of
/// [`TOKEN_ENV_VARS`] in order. Blank values count as absent.
pub fn resolve_token<F>(explicit: Option<&str>, lookup: F) -> Result<Secret>
where
    F: Fn(&str) -> Option<String>,
{
    let non_blank = |v: String| {
        let v = v.trim().to_string();
        (!v.is_empty()).then_some(v)
    };
    explicit
        .map(str::to_string)
        .and_then(non_blank)
        .or_else(|| TOKEN_ENV_VARS.iter().copied().find_map(|var| lookup(var).and_then(non_blank)))
        .map(Secret::new)
        .ok_or_else(|| {
            ScoutError::CredentialError(format!(
                "access token not found; pass --token or set {}",
                TOKEN_ENV_VARS.join("/")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_policy() {
        let cfg = Config::default();
        assert_eq!(cfg.pacing(), Pacing::default());
        assert_eq!(cfg.git_timeout(), Duration::from_secs(120));
        assert_eq!(cfg.publish.branch, "main");
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let cfg = Config::from_toml(
            r#"
            [pacing]
            query_delay_secs = 0.5

            [git]
            user_name = "prices-bot"
            "#,
        )
        .expect("parse config");
        assert_eq!(cfg.pacing().query_delay, Duration::from_millis(500));
        assert_eq!(cfg.pacing().store_delay, Duration::from_secs(5));
        assert_eq!(cfg.identity().name, "prices-bot");
        assert_eq!(cfg.git.user_email, "pricescout-bot@users.noreply.github.com");
    }

    #[test]
    fn test_negative_delay_is_rejected() {
        let err = Config::from_toml("[pacing]\nstore_delay_secs = -1.0\n").expect_err("negative");
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_out_of_range_delay_is_config_error() {
        let err = Config::from_toml("[pacing]\nstore_delay_secs = 1e20\n").expect_err("huge delay");
        assert!(matches!(err, ScoutError::ConfigError(_)));
        let err = Config::from_toml("[pacing]\nquery_delay_secs = nan\n").expect_err("nan delay");
        assert!(matches!(err, ScoutError::ConfigError(_)));
    }

    #[test]
    fn test_escaping_path_prefix_is_rejected() {
        let err = Config::from_toml("[publish]\npath_prefix = \"../escaped\"\n").expect_err("escape");
        assert!(matches!(err, ScoutError::ConfigError(_)));
        let cfg = Config::from_toml("[publish]\npath_prefix = \"/prices/daily/\"\n").expect("nested prefix");
        assert_eq!(cfg.publish.path_prefix, "/prices/daily/");
    }

    #[test]
    fn test_missing_explicit_config_file_is_error() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).expect_err("missing");
        assert!(matches!(err, ScoutError::ConfigError(_)));
    }

    #[test]
    fn test_token_resolution_order() {
        let env: HashMap<&str, &str> = [("GITHUB_PAT_ENV", "from-env"), ("GH_PAT", "from-alias")]
            .into_iter()
            .collect();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        let flag = resolve_token(Some("from-flag"), lookup).expect("flag");
        assert_eq!(flag.expose(), "from-flag");
        let env_first = resolve_token(None, lookup).expect("env");
        assert_eq!(env_first.expose(), "from-env");
        let blank_flag = resolve_token(Some("  "), lookup).expect("env after blank");
        assert_eq!(blank_flag.expose(), "from-env");
    }

    #[test]
    fn test_token_alias_and_absence() {
        let only_alias = |k: &str| (k == "GH_PAT").then(|| "alias".to_string());
        assert_eq!(resolve_token(None, only_alias).expect("alias").expose(), "alias");

        let err = resolve_token(None, |_| None).expect_err("no token");
        assert!(matches!(err, ScoutError::CredentialError(_)));
    }
}
