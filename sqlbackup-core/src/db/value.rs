use crate::error::{BackupError, Result};
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::MySqlRow;
use sqlx::types::chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// One column value as read from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Bytes(Vec<u8>),
    Text(String),
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

pub fn decode_row(row: &MySqlRow) -> Result<Vec<SqlValue>> {
    (0..row.columns().len()).map(|i| decode_column(row, i)).collect()
}

fn decode_column(row: &MySqlRow, i: usize) -> Result<SqlValue> {
    let column = &row.columns()[i];
    let type_name = column.type_info().name();

    if row.try_get_raw(i)?.is_null() {
        return Ok(SqlValue::Null);
    }

    let decoded = match type_name {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "BOOLEAN" =>
            row.try_get::<i64, _>(i).map(SqlValue::Int).ok()
                .or_else(|| row.try_get::<bool, _>(i).map(|b| SqlValue::Int(b as i64)).ok()),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" =>
            row.try_get::<u64, _>(i).map(SqlValue::UInt).ok(),
        "YEAR" =>
            row.try_get::<u16, _>(i).ok()
                .or_else(|| row.try_get_unchecked::<u16, _>(i).ok())
                .map(|v| SqlValue::UInt(v as u64)),
        "FLOAT" =>
            row.try_get::<f32, _>(i).ok().map(|v| SqlValue::Float(widen_f32(v))),
        "DOUBLE" =>
            row.try_get::<f64, _>(i).map(SqlValue::Float).ok(),
        "DECIMAL" =>
            row.try_get::<rust_decimal::Decimal, _>(i).ok()
                .map(|v| SqlValue::Text(v.to_string())),
        "DATETIME" | "TIMESTAMP" =>
            row.try_get::<NaiveDateTime, _>(i).ok()
                .map(|v| v.to_string())
                .or_else(|| zero_date(row, i, "0000-00-00 00:00:00"))
                .map(SqlValue::Text),
        "DATE" =>
            row.try_get::<NaiveDate, _>(i).ok()
                .map(|v| v.to_string())
                .or_else(|| zero_date(row, i, "0000-00-00"))
                .map(SqlValue::Text),
        "TIME" =>
            row.try_get::<NaiveTime, _>(i).ok()
                .map(|v| v.to_string())
                // negative or >24h durations
                .or_else(|| row.try_get::<MySqlTime, _>(i).ok().map(|v| v.to_string()))
                .map(SqlValue::Text),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" =>
            row.try_get_unchecked::<Vec<u8>, _>(i).map(SqlValue::Bytes).ok(),
        "JSON" =>
            row.try_get::<String, _>(i).ok()
                .or_else(|| row.try_get::<serde_json::Value, _>(i).ok().map(|j| j.to_string()))
                .map(SqlValue::Text),
        _ =>
            row.try_get::<String, _>(i).map(SqlValue::Text).ok()
                .or_else(|| row.try_get::<i64, _>(i).map(SqlValue::Int).ok())
                .or_else(|| row.try_get::<f64, _>(i).map(SqlValue::Float).ok())
                // ENUM / SET and other textual types arrive as plain UTF-8 bytes.
                .or_else(|| row.try_get_unchecked::<String, _>(i).ok()
                    .filter(|s| !s.contains('\0'))
                    .map(SqlValue::Text))
                .or_else(|| row.try_get_unchecked::<Vec<u8>, _>(i).map(SqlValue::Bytes).ok()),
    };

    decoded.ok_or_else(|| BackupError::UnsupportedValue {
        column: column.name().to_string(),
        type_name: type_name.to_string(),
    })
}

/// Read column `i` as text. `SHOW` statements report some columns with a
/// binary collation depending on server version, so fall back to raw bytes.
pub fn text_at(row: &MySqlRow, i: usize) -> Result<String> {
    match row.try_get::<String, _>(i) {
        Ok(s) => Ok(s),
        Err(_) => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(i)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

// `sqlx::query` always prepares, so rows arrive as binary-protocol results,
// where a zero date is an empty payload.
fn zero_date(row: &MySqlRow, i: usize, literal: &str) -> Option<String> {
    row.try_get_unchecked::<Vec<u8>, _>(i).ok()
        .filter(|bytes| bytes.is_empty())
        .map(|_| literal.to_string())
}

// Keep the shortest f32 representation (1.1, not 1.100000023841858).
fn widen_f32(v: f32) -> f64 {
    v.to_string().parse().unwrap_or(v as f64)
}
