//! Backup configuration (.sqlbackup.toml)
//!
//! With no file present the built-in defaults are used as-is. A file may
//! override any subset of fields; string values can reference environment
//! variables as `${NAME}`.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::ConnectionConfig;
use crate::error::{BackupError, Result};

pub const CONFIG_FILE_NAME: &str = ".sqlbackup.toml";
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// What to do when one table fails mid-export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnTableError {
    /// Stop the whole export.
    #[default]
    Abort,
    /// Note the failure in the dump and move on to the next table.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub connection: ConnectionConfig,
    pub output_dir: PathBuf,
    pub batch_size: usize,
    pub on_table_error: OnTableError,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            output_dir: PathBuf::from("."),
            batch_size: DEFAULT_BATCH_SIZE,
            on_table_error: OnTableError::default(),
        }
    }
}

impl BackupConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BackupError::ConfigLoadFailed(format!("{}: {}", path.display(), e))
        })?;
        let config: BackupConfig = toml::from_str(&content)?;
        Ok(config.resolve_env_vars())
    }

    pub fn find_and_load() -> Result<Option<(PathBuf, Self)>> {
        let cwd = env::current_dir()?;
        Self::find_in_ancestors(&cwd)
    }

    /// Load the nearest `.sqlbackup.toml` at or above `start`.
    pub fn find_in_ancestors(start: &Path) -> Result<Option<(PathBuf, Self)>> {
        let mut current = start.to_path_buf();
        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                let config = Self::load(&config_path)?;
                return Ok(Some((config_path, config)));
            }
            if !current.pop() {
                return Ok(None);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(BackupError::InvalidConfig("batch_size must be at least 1".into()));
        }
        let conn = &self.connection;
        for (field, value) in [
            ("host", &conn.host),
            ("username", &conn.username),
            ("database", &conn.database),
        ] {
            if value.trim().is_empty() {
                return Err(BackupError::InvalidConfig(format!("connection.{} is empty", field)));
            }
        }
        Ok(())
    }

    fn resolve_env_vars(mut self) -> Self {
        let conn = &mut self.connection;
        for field in [
            &mut conn.host,
            &mut conn.username,
            &mut conn.password,
            &mut conn.database,
            &mut conn.charset,
        ] {
            *field = resolve_env(field);
        }
        let dir = self.output_dir.to_string_lossy().into_owned();
        self.output_dir = PathBuf::from(resolve_env(&dir));
        self
    }
}

/// Expand `${NAME}` references in one left-to-right pass. Substituted
/// values are copied through as-is and never expanded again.
fn resolve_env(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + 2 + len];
        result.push_str(&rest[..start]);
        result.push_str(&env::var(var_name).unwrap_or_default());
        rest = &rest[start + 3 + len..];
    }
    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: BackupConfig = toml::from_str(
            r#"
            batch_size = 250

            [connection]
            database = "shop"
            "#,
        )
        .unwrap();

        assert_eq!(config.batch_size, 250);
        assert_eq!(config.connection.database, "shop");
        assert_eq!(config.connection.host, "127.0.0.1");
        assert_eq!(config.connection.port, 3306);
        assert_eq!(config.on_table_error, OnTableError::Abort);
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn on_table_error_parses_lowercase() {
        let config: BackupConfig = toml::from_str("on_table_error = \"skip\"").unwrap();
        assert_eq!(config.on_table_error, OnTableError::Skip);
    }

    #[test]
    fn resolve_env_expands_and_blanks_missing() {
        env::set_var("SQLBACKUP_TEST_PW", "s3cret");
        assert_eq!(resolve_env("pw=${SQLBACKUP_TEST_PW}!"), "pw=s3cret!");
        assert_eq!(resolve_env("${SQLBACKUP_TEST_UNSET_VAR}"), "");
        assert_eq!(resolve_env("no vars"), "no vars");
        assert_eq!(resolve_env("broken ${OPEN"), "broken ${OPEN");
        assert_eq!(resolve_env("${SQLBACKUP_TEST_PW}${SQLBACKUP_TEST_PW}"), "s3crets3cret");
    }

    #[test]
    fn resolve_env_does_not_reexpand_values() {
        env::set_var("SQLBACKUP_TEST_BRACED_PW", "ab${cd}ef");
        assert_eq!(resolve_env("${SQLBACKUP_TEST_BRACED_PW}"), "ab${cd}ef");

        env::set_var("SQLBACKUP_TEST_SELF_REF", "${SQLBACKUP_TEST_SELF_REF}");
        assert_eq!(resolve_env("x${SQLBACKUP_TEST_SELF_REF}y"), "x${SQLBACKUP_TEST_SELF_REF}y");
    }

    #[test]
    fn find_in_ancestors_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[connection]\nhost = \"db.internal\"\n",
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (path, config) = BackupConfig::find_in_ancestors(&nested).unwrap().unwrap();
        assert_eq!(path, dir.path().join(CONFIG_FILE_NAME));
        assert_eq!(config.connection.host, "db.internal");
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "batch_size = \"lots\"").unwrap();
        assert!(BackupConfig::find_in_ancestors(dir.path()).is_err());
    }

    #[test]
    fn validate_rejects_zero_batch_and_empty_database() {
        assert!(BackupConfig::default().validate().is_ok());

        let zero = BackupConfig { batch_size: 0, ..Default::default() };
        assert!(matches!(zero.validate(), Err(BackupError::InvalidConfig(_))));

        let mut no_db = BackupConfig::default();
        no_db.connection.database = " ".into();
        assert!(matches!(no_db.validate(), Err(BackupError::InvalidConfig(_))));
    }
}
