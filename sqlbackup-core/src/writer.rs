//! SQL text output for a dump file

use std::io::Write;

use crate::db::{quote_ident, SqlValue};
use crate::error::Result;

const RULE: &str = "-- ----------------------------";

pub struct SqlWriter<W: Write> {
    out: W,
}

impl<W: Write> SqlWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_header(&mut self, database: &str, exported_at: &str) -> Result<()> {
        writeln!(self.out, "-- MySQL database export")?;
        writeln!(self.out, "-- Database: {}", database)?;
        writeln!(self.out, "-- Exported at: {}", exported_at)?;
        writeln!(self.out)?;
        writeln!(self.out, "SET NAMES utf8mb4;")?;
        writeln!(self.out, "SET FOREIGN_KEY_CHECKS = 0;")?;
        writeln!(self.out)?;
        Ok(())
    }

    pub fn write_structure(&mut self, table: &str, create_sql: &str) -> Result<()> {
        self.write_banner(&format!("Table structure for {}", table))?;
        writeln!(self.out, "DROP TABLE IF EXISTS {};", quote_ident(table))?;
        writeln!(self.out, "{};", create_sql)?;
        writeln!(self.out)?;
        Ok(())
    }

    pub fn write_data_banner(&mut self, table: &str) -> Result<()> {
        self.write_banner(&format!("Records of {}", table))
    }

    /// One multi-row `INSERT` for `rows`. Writes nothing for an empty batch.
    pub fn write_insert(&mut self, table: &str, columns: &[String], rows: &[Vec<SqlValue>]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let col_list = columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
        writeln!(self.out, "INSERT INTO {} ({}) VALUES", quote_ident(table), col_list)?;

        let tuples: Vec<String> = rows.iter().map(|row| {
            let values: Vec<String> = row.iter().map(format_value).collect();
            format!("({})", values.join(", "))
        }).collect();
        write!(self.out, "{}", tuples.join(",\n"))?;
        write!(self.out, ";\n\n")?;
        Ok(())
    }

    pub fn write_table_failure(&mut self, table: &str, message: &str) -> Result<()> {
        writeln!(self.out, "-- Export of {} failed, table skipped:", table)?;
        for line in message.lines() {
            writeln!(self.out, "--   {}", line)?;
        }
        Ok(())
    }

    /// Copy already rendered SQL through unchanged.
    pub fn append(&mut self, sql: &[u8]) -> Result<()> {
        self.out.write_all(sql)?;
        Ok(())
    }

    pub fn write_table_end(&mut self) -> Result<()> {
        writeln!(self.out)?;
        Ok(())
    }

    pub fn write_trailer(&mut self) -> Result<()> {
        writeln!(self.out, "SET FOREIGN_KEY_CHECKS = 1;")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_banner(&mut self, title: &str) -> Result<()> {
        writeln!(self.out, "{}", RULE)?;
        writeln!(self.out, "-- {}", title)?;
        writeln!(self.out, "{}", RULE)?;
        Ok(())
    }
}

/// Render one value as a SQL literal.
///
/// Byte values become a quoted lowercase hex string (`'ff00'`), not a
/// `0x` literal; restoring them needs an explicit `UNHEX()`.
pub fn format_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Int(v) => v.to_string(),
        SqlValue::UInt(v) => v.to_string(),
        SqlValue::Float(v) => v.to_string(),
        SqlValue::Bytes(b) => format!("'{}'", hex::encode(b)),
        // Backslashes first, so the quote escapes are not doubled.
        SqlValue::Text(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut SqlWriter<Vec<u8>>) -> Result<()>) -> String {
        let mut writer = SqlWriter::new(Vec::new());
        f(&mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn format_value_literals() {
        assert_eq!(format_value(&SqlValue::Null), "NULL");
        assert_eq!(format_value(&SqlValue::Int(42)), "42");
        assert_eq!(format_value(&SqlValue::Int(-7)), "-7");
        assert_eq!(format_value(&SqlValue::UInt(u64::MAX)), "18446744073709551615");
        assert_eq!(format_value(&SqlValue::Float(2.5)), "2.5");
        assert_eq!(format_value(&SqlValue::Bytes(vec![0xff, 0x00])), "'ff00'");
        assert_eq!(format_value(&SqlValue::Bytes(vec![])), "''");
    }

    #[test]
    fn format_value_escapes_text() {
        assert_eq!(format_value(&"O'Brien".into()), r"'O\'Brien'");
        assert_eq!(format_value(&r"a\b".into()), r"'a\\b'");
        // a literal backslash-quote pair keeps both escapes distinct
        assert_eq!(format_value(&r"x\'y".into()), r"'x\\\'y'");
        assert_eq!(format_value(&"多字节".into()), "'多字节'");
    }

    #[test]
    fn header_and_trailer() {
        let out = render(|w| {
            w.write_header("fba", "2026-10-17 09:30:00")?;
            w.write_trailer()
        });
        assert_eq!(
            out,
            "-- MySQL database export\n\
             -- Database: fba\n\
             -- Exported at: 2026-10-17 09:30:00\n\
             \n\
             SET NAMES utf8mb4;\n\
             SET FOREIGN_KEY_CHECKS = 0;\n\
             \n\
             SET FOREIGN_KEY_CHECKS = 1;\n"
        );
    }

    #[test]
    fn structure_block() {
        let out = render(|w| w.write_structure("users", "CREATE TABLE `users` (\n  `id` int\n)"));
        assert_eq!(
            out,
            "-- ----------------------------\n\
             -- Table structure for users\n\
             -- ----------------------------\n\
             DROP TABLE IF EXISTS `users`;\n\
             CREATE TABLE `users` (\n  `id` int\n);\n\n"
        );
    }

    #[test]
    fn insert_statement_shape() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let rows = vec![
            vec![SqlValue::Int(1), "Al".into()],
            vec![SqlValue::Int(2), SqlValue::Null],
        ];
        let out = render(|w| w.write_insert("users", &columns, &rows));
        assert_eq!(out, "INSERT INTO `users` (`id`, `name`) VALUES\n(1, 'Al'),\n(2, NULL);\n\n");
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let out = render(|w| w.write_insert("users", &["id".to_string()], &[]));
        assert!(out.is_empty());
    }

    #[test]
    fn failure_note_is_commented_out() {
        let out = render(|w| w.write_table_failure("logs", "boom\nsecond line"));
        assert_eq!(out, "-- Export of logs failed, table skipped:\n--   boom\n--   second line\n");
    }
}
