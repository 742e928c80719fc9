//! 表与段的读写
//!
//! 这是记录引擎之上的一层薄组装：把 TABLES 段中的每张表读成
//! “表头 + 同类记录链表”，写出时反过来逐条调用记录写入器。
//!
//! ```text
//!   0 / TABLE
//!   2 / LAYER        ← 表头
//!  ...
//!   0 / LAYER        ← 表项，重复
//!  ...
//!   0 / ENDTAB
//! ```

use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{DxfError, Result};
use crate::list::RecordList;
use crate::reader::RecordReader;
use crate::record::Record;
use crate::scanner::TagScanner;
use crate::schema::Schema;
use crate::schemas::{SchemaCatalogue, TABLE};
use crate::version::DxfVersion;
use crate::writer::{RecordWriter, TagWriter, WriteOutcome};

/// 一张符号表
#[derive(Debug)]
pub struct Table {
    /// 表头记录
    pub header: Record,
    /// 表项
    pub records: RecordList,
}

impl Table {
    pub fn new(header_schema: &Arc<Schema>, name: &str) -> Result<Self> {
        let mut header = Record::new(header_schema);
        header.set("name", name)?;
        Ok(Self {
            header,
            records: RecordList::new(),
        })
    }

    /// 表名（如 `LAYER`）
    pub fn name(&self) -> &str {
        self.header.str("name").unwrap_or_default()
    }
}

/// 表写出统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableReport {
    pub written: usize,
    pub skipped: usize,
}

fn expect_sentinel<R: BufRead>(scanner: &mut TagScanner<R>) -> Result<String> {
    scanner
        .read_sentinel_name()?
        .ok_or(DxfError::UnexpectedEof { line: scanner.line() })
}

/// 读取组码 0 及其后的记录类型名
fn next_record_kind<R: BufRead>(scanner: &mut TagScanner<R>) -> Result<String> {
    let code = scanner.next_code()?;
    if code != 0 {
        return Err(DxfError::InvalidFormat(format!(
            "expected group code 0 at line {}, found {}",
            scanner.line(),
            code
        )));
    }
    expect_sentinel(scanner)
}

/// 定位到指定段（`0 / SECTION`、`2 / <name>` 之后）
pub fn find_section<R: BufRead>(scanner: &mut TagScanner<R>, name: &str) -> Result<bool> {
    scanner.skip_to(2, Some(name))
}

/// 从 HEADER 段读取 `$ACADVER`，读到 ENDSEC 为止
pub fn read_header_version<R: BufRead>(scanner: &mut TagScanner<R>) -> Result<Option<DxfVersion>> {
    let mut version = None;
    while let Some(pair) = scanner.next_pair()? {
        if pair.code == 0 && pair.value.trim() == "ENDSEC" {
            break;
        }
        if pair.code == 9 && pair.value.trim() == "$ACADVER" {
            if let Some(value) = scanner.next_pair()? {
                version = DxfVersion::from_acadver(&value.value);
                if version.is_none() {
                    warn!("Unknown $ACADVER {:?}", value.value);
                }
            }
        }
    }
    Ok(version)
}

/// 写出只含 `$ACADVER` 的 HEADER 段
pub fn write_header<W: Write>(out: &mut TagWriter<W>, version: DxfVersion) -> Result<()> {
    out.begin_section("HEADER")?;
    out.write_pair(9, "$ACADVER")?;
    out.write_pair(1, version.acadver())?;
    out.end_section()
}

/// 读取整个 TABLES 段（扫描器位于 `2 / TABLES` 之后）
///
/// 没有模式表的表整张跳过，表内类型不符的记录逐条跳过。
pub fn read_tables<R: BufRead>(
    scanner: &mut TagScanner<R>,
    catalogue: &SchemaCatalogue,
    reader: &mut RecordReader<'_>,
) -> Result<Vec<Table>> {
    let header_schema = catalogue
        .get(TABLE)
        .ok_or_else(|| DxfError::InvalidFormat("catalogue has no TABLE schema".to_string()))?;

    let mut tables = Vec::new();
    let mut kind = next_record_kind(scanner)?;
    loop {
        match kind.as_str() {
            "ENDSEC" => break,
            "TABLE" => {
                let header = reader.read_new(scanner, header_schema)?;
                let records = read_table_records(scanner, catalogue, reader, &header)?;
                info!(
                    "Read table {} with {} records",
                    header.str("name").unwrap_or_default(),
                    records.len()
                );
                tables.push(Table { header, records });
                kind = next_record_kind(scanner)?;
            }
            other => {
                warn!("Unexpected {} in TABLES section at line {}", other, scanner.line());
                reader.skip(scanner)?;
                kind = expect_sentinel(scanner)?;
            }
        }
    }
    Ok(tables)
}

/// 读取一张表的全部表项，直到 ENDTAB
fn read_table_records<R: BufRead>(
    scanner: &mut TagScanner<R>,
    catalogue: &SchemaCatalogue,
    reader: &mut RecordReader<'_>,
    header: &Record,
) -> Result<RecordList> {
    let name = header.str("name").unwrap_or_default().trim();
    let schema = catalogue.get(name);
    if schema.is_none() {
        warn!("No schema for table {}, records skipped", name);
    }

    let mut records = RecordList::new();
    loop {
        let kind = expect_sentinel(scanner)?;
        if kind == "ENDTAB" {
            // ENDTAB 本身没有字段，下一行是组码 0
            break;
        }
        match schema {
            Some(schema) if schema.kind() == kind => {
                records.append(reader.read_new(scanner, schema)?);
            }
            _ => {
                if schema.is_some() {
                    warn!("Unexpected {} record in table {}, skipped", kind, name);
                }
                reader.skip(scanner)?;
            }
        }
    }
    Ok(records)
}

/// 写出一张表；未通过校验的表项不计入 70 组码的数量
pub fn write_table<W: Write>(
    out: &mut TagWriter<W>,
    writer: &RecordWriter<'_>,
    table: &Table,
) -> Result<TableReport> {
    let mut header = table.header.clone();
    let count = table
        .records
        .iter()
        .filter(|r| writer.validate(r).is_none())
        .count();
    header.set("max_entries", i16::try_from(count).unwrap_or(i16::MAX))?;

    let mut report = TableReport::default();
    if let WriteOutcome::Skipped(reason) = writer.write(out, &header)? {
        warn!("Table header {} not written: {:?}", table.name(), reason);
        return Ok(report);
    }

    for record in &table.records {
        match writer.write(out, record)? {
            WriteOutcome::Written => report.written += 1,
            WriteOutcome::Skipped(_) => report.skipped += 1,
        }
    }
    out.write_pair(0, "ENDTAB")?;
    Ok(report)
}

/// 写出整个 TABLES 段
pub fn write_tables<W: Write>(
    out: &mut TagWriter<W>,
    writer: &RecordWriter<'_>,
    tables: &[Table],
) -> Result<TableReport> {
    let mut total = TableReport::default();
    out.begin_section("TABLES")?;
    for table in tables {
        let report = write_table(out, writer, table)?;
        total.written += report.written;
        total.skipped += report.skipped;
    }
    out.end_section()?;
    Ok(total)
}
