use once_cell::sync::Lazy;
use regex::Regex;
use std::{fmt, path::PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_DB_HOST: &str = "mysql_nyc311";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_DB_NAME: &str = "nyc311_db";
pub const DEFAULT_DB_USER: &str = "app_user";
pub const DEFAULT_DB_PASS: &str = "app_password";

pub const DEFAULT_RESULTS_DIR: &str = "results";
pub const DEFAULT_SAMPLE_LIMIT: usize = 20;

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("static regex"));

/// Connection parameters for the benchmark database.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DB_HOST.into(),
            port: DEFAULT_DB_PORT,
            database: DEFAULT_DB_NAME.into(),
            user: DEFAULT_DB_USER.into(),
            password: DEFAULT_DB_PASS.into(),
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where and how a single tagged run writes its evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub tag: String,
    pub results_root: PathBuf,
    /// Result rows kept per `<artifact>.csv` sample
    pub sample_limit: usize,
}

impl RunConfig {
    pub fn new(tag: impl Into<String>) -> Result<Self> {
        let tag = tag.into();
        if !TAG_RE.is_match(&tag) {
            return Err(Error::InvalidTag(tag));
        }
        Ok(Self {
            tag,
            results_root: PathBuf::from(DEFAULT_RESULTS_DIR),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        })
    }

    pub fn with_results_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.results_root = root.into();
        self
    }

    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    /// `<results_root>/<tag>`
    pub fn out_dir(&self) -> PathBuf {
        self.results_root.join(&self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_validation() {
        for ok in ["baseline", "indexed", "run-2", "v1.2_ft"] {
            assert!(RunConfig::new(ok).is_ok(), "{ok} should be accepted");
        }
        for bad in ["", "..", "../etc", "a/b", ".hidden", "with space"] {
            assert!(
                matches!(RunConfig::new(bad), Err(Error::InvalidTag(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_out_dir() {
        let cfg = RunConfig::new("baseline").unwrap().with_results_root("/tmp/r");
        assert_eq!(cfg.out_dir(), PathBuf::from("/tmp/r/baseline"));
        assert_eq!(cfg.sample_limit, 20);
    }

    #[test]
    fn test_debug_redacts_password() {
        let cfg = DbConfig::default();
        let dbg = format!("{:?}", cfg);
        assert!(dbg.contains("mysql_nyc311"));
        assert!(!dbg.contains("app_password"));
    }
}
