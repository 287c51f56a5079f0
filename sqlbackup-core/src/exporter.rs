//! The backup run: connect, list tables, dump structure and rows, close.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::config::{BackupConfig, OnTableError};
use crate::db::{DatabaseConnection, SqlValue};
use crate::error::{BackupError, Result};
use crate::source::DumpSource;
use crate::writer::SqlWriter;

#[derive(Debug, Clone, PartialEq)]
pub struct TableReport {
    pub name: String,
    pub rows: u64,
    /// Set when the table was skipped after a failure.
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub bytes: u64,
    pub tables: Vec<TableReport>,
}

impl ExportSummary {
    pub fn size_mib(&self) -> f64 {
        self.bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }

    pub fn failed_tables(&self) -> impl Iterator<Item = &TableReport> {
        self.tables.iter().filter(|t| t.error.is_some())
    }
}

pub struct Exporter {
    config: BackupConfig,
}

impl Exporter {
    pub fn new(config: BackupConfig) -> Self {
        Self { config }
    }

    /// `<output_dir>/<db>_backup_<YYYYMMDD_HHMMSS>.sql`
    pub fn output_path(&self, at: &DateTime<Local>) -> PathBuf {
        let name = format!(
            "{}_backup_{}.sql",
            self.config.connection.database,
            at.format("%Y%m%d_%H%M%S")
        );
        self.config.output_dir.join(name)
    }

    /// Connect to the configured server and dump it. Nothing is written to
    /// disk when the connection cannot be opened.
    pub async fn run(&self) -> Result<ExportSummary> {
        let path = self.output_path(&Local::now());
        let conn_config = &self.config.connection;

        info!("Connecting to database {}...", conn_config.database);
        let mut conn = DatabaseConnection::connect(conn_config).await?;
        match conn.server_version().await {
            Ok(version) => debug!(%version, host = %conn_config.host, port = conn_config.port, "connected"),
            Err(e) => debug!(error = %e, "could not read server version"),
        }

        let summary = self.export_to(&mut conn, &path).await?;
        conn.close().await?;
        Ok(summary)
    }

    pub async fn export_to<S: DumpSource>(&self, source: &mut S, path: &Path) -> Result<ExportSummary> {
        let file = File::create(path)?;
        let mut writer = SqlWriter::new(BufWriter::new(file));

        let exported_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        writer.write_header(&self.config.connection.database, &exported_at)?;

        let tables = source.list_tables().await?;
        info!("Found {} tables", tables.len());

        let mut reports = Vec::with_capacity(tables.len());
        for table in &tables {
            info!("Exporting table: {}", table);
            let outcome = match self.config.on_table_error {
                OnTableError::Abort => self.export_table(source, &mut writer, table).await,
                // Stage in memory so a table that fails part way leaves nothing behind.
                OnTableError::Skip => {
                    let mut staged = SqlWriter::new(Vec::new());
                    let result = self.export_table(source, &mut staged, table).await;
                    if result.is_ok() {
                        writer.append(&staged.into_inner())?;
                    }
                    result
                }
            };
            match outcome {
                Ok(rows) => reports.push(TableReport { name: table.clone(), rows, error: None }),
                Err(e) => match self.config.on_table_error {
                    OnTableError::Abort => {
                        writer.flush()?;
                        return Err(BackupError::table_failed(table, e));
                    }
                    OnTableError::Skip => {
                        warn!(table = %table, error = %e, "skipping table");
                        writer.write_table_failure(table, &e.to_string())?;
                        reports.push(TableReport {
                            name: table.clone(),
                            rows: 0,
                            error: Some(e.to_string()),
                        });
                    }
                },
            }
            writer.write_table_end()?;
        }

        writer.write_trailer()?;
        writer.flush()?;
        drop(writer);

        let bytes = fs::metadata(path)?.len();
        let path = fs::canonicalize(path)?;
        Ok(ExportSummary { path, bytes, tables: reports })
    }

    async fn export_table<S: DumpSource, W: Write>(
        &self,
        source: &mut S,
        writer: &mut SqlWriter<W>,
        table: &str,
    ) -> Result<u64> {
        self.export_table_structure(source, writer, table).await?;
        self.export_table_data(source, writer, table).await
    }

    pub async fn export_table_structure<S: DumpSource, W: Write>(
        &self,
        source: &mut S,
        writer: &mut SqlWriter<W>,
        table: &str,
    ) -> Result<()> {
        let create_sql = source.show_create_table(table).await?;
        writer.write_structure(table, &create_sql)
    }

    /// Rows go out in `INSERT`s of at most `batch_size` tuples each. An empty
    /// table writes nothing at all, not even the data banner.
    pub async fn export_table_data<S: DumpSource, W: Write>(
        &self,
        source: &mut S,
        writer: &mut SqlWriter<W>,
        table: &str,
    ) -> Result<u64> {
        let columns = source.column_names(table).await?;
        let batch_size = self.config.batch_size.max(1);

        let mut batch = InsertBatch::new(table, &columns, batch_size);
        let rows = source
            .stream_rows(table, |row| {
                batch.rows.push(row);
                if batch.rows.len() >= batch_size {
                    batch.flush(writer)?;
                }
                Ok(())
            })
            .await?;
        batch.flush(writer)?;

        if rows == 0 {
            info!("  table is empty");
        } else {
            info!("  exported {} rows in {} statements", rows, batch.statements);
        }
        Ok(rows)
    }
}

struct InsertBatch<'a> {
    table: &'a str,
    columns: &'a [String],
    rows: Vec<Vec<SqlValue>>,
    statements: usize,
}

impl<'a> InsertBatch<'a> {
    fn new(table: &'a str, columns: &'a [String], capacity: usize) -> Self {
        Self { table, columns, rows: Vec::with_capacity(capacity), statements: 0 }
    }

    fn flush<W: Write>(&mut self, writer: &mut SqlWriter<W>) -> Result<()> {
        if self.rows.is_empty() {
            return Ok(());
        }
        if self.statements == 0 {
            writer.write_data_banner(self.table)?;
        }
        writer.write_insert(self.table, self.columns, &self.rows)?;
        self.rows.clear();
        self.statements += 1;
        Ok(())
    }
}
