//! Error types for the backup run

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(#[source] sqlx::Error),
    #[error("Failed to export table '{table}': {source}")]
    TableFailed {
        table: String,
        #[source]
        source: Box<BackupError>,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to load configuration: {0}")]
    ConfigLoadFailed(String),
    #[error("Cannot decode value of column '{column}' (type {type_name})")]
    UnsupportedValue { column: String, type_name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, BackupError>;

impl BackupError {
    pub fn table_failed(table: &str, source: BackupError) -> Self {
        Self::TableFailed { table: table.to_string(), source: Box::new(source) }
    }

    /// True when the failure came from the database layer (connect, query,
    /// permission), as opposed to file I/O, config or decoding problems.
    pub fn is_database_error(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) | Self::Database(_) => true,
            Self::TableFailed { source, .. } => source.is_database_error(),
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        if self.is_database_error() {
            format!("Database error: {}", self)
        } else {
            format!("Export failed: {}", self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failure_is_a_database_error() {
        let err = BackupError::ConnectionFailed(sqlx::Error::PoolTimedOut);
        assert!(err.is_database_error());
        assert!(err.user_message().starts_with("Database error: Failed to connect"));
    }

    #[test]
    fn table_failure_inherits_classification() {
        let db = BackupError::table_failed("users", BackupError::Database(sqlx::Error::RowNotFound));
        assert!(db.is_database_error());

        let io = BackupError::table_failed(
            "users",
            BackupError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")),
        );
        assert!(!io.is_database_error());
        assert_eq!(io.user_message(), "Export failed: Failed to export table 'users': disk full");
    }
}
