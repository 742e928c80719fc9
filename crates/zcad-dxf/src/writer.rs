//! 通用记录写入器
//!
//! 写出顺序由模式表固定，与读取顺序无关：
//! ```text
//!   0 / 类型名         ← 哨兵
//!   5 / 句柄           ← id_code 为 -1 时省略
//! 102 / {ACAD_REACTORS ... 102 / }      ← R14 起
//! 102 / {ACAD_XDICTIONARY ... 102 / }   ← R14 起
//! 100 / AcDbXxx        ← 子类标记，R13 起
//! ...                  ← 各字段，按各自最低版本门控
//! 1001 / 应用名 ...     ← 扩展数据
//! ```
//! 写出前先校验必填字段；校验失败时整条记录被丢弃（告警），不写任何字节。

use std::fmt::Display;
use std::io::Write;

use tracing::warn;

use crate::config::DxfConfig;
use crate::error::Result;
use crate::record::{Point3, Record, Value};
use crate::schema::{Fixup, Layout, Schema, REACTORS_GROUP, XDICTIONARY_GROUP};
use crate::version::DxfVersion;
use crate::xdata::{XDataGroup, XDataValue};

/// DXF 标签写入器
pub struct TagWriter<W: Write> {
    out: W,
    pairs: usize,
}

impl<W: Write> TagWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, pairs: 0 }
    }

    /// 已写出的组码-值对数
    pub fn pairs(&self) -> usize {
        self.pairs
    }

    /// 写入组码-值对
    pub fn write_pair(&mut self, code: i32, value: impl Display) -> Result<()> {
        writeln!(self.out, "{:>3}", code)?;
        writeln!(self.out, "{}", value)?;
        self.pairs += 1;
        Ok(())
    }

    /// 写入点坐标
    pub fn write_point(&mut self, base_code: i32, point: Point3) -> Result<()> {
        self.write_pair(base_code, point.x)?;
        self.write_pair(base_code + 10, point.y)?;
        self.write_pair(base_code + 20, point.z)
    }

    /// 写入注释（999）
    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        self.write_pair(999, text)
    }

    /// 写入 SECTION 开始
    pub fn begin_section(&mut self, name: &str) -> Result<()> {
        self.write_pair(0, "SECTION")?;
        self.write_pair(2, name)
    }

    /// 写入 SECTION 结束
    pub fn end_section(&mut self) -> Result<()> {
        self.write_pair(0, "ENDSEC")
    }

    /// 写入文件结束标记
    pub fn write_eof(&mut self) -> Result<()> {
        self.write_pair(0, "EOF")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// 记录未写出的原因
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// 必填字段为空
    MissingField(&'static str),
    /// 目标版本早于该记录类型
    UnsupportedVersion { kind: String, since: DxfVersion },
    /// 文本值含换行，写出会破坏两行一组的配对
    LineBreak(String),
}

/// 单条记录的写出结果
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Written,
    Skipped(SkipReason),
}

/// 通用记录写入器
pub struct RecordWriter<'a> {
    config: &'a DxfConfig,
    version: DxfVersion,
}

impl<'a> RecordWriter<'a> {
    /// `version` 为目标版本
    pub fn new(config: &'a DxfConfig, version: DxfVersion) -> Self {
        Self { config, version }
    }

    pub fn version(&self) -> DxfVersion {
        self.version
    }

    /// 写出前校验，返回不能写出的原因
    pub fn validate(&self, record: &Record) -> Option<SkipReason> {
        let schema = record.schema();
        if !self.version.supports(schema.since()) {
            return Some(SkipReason::UnsupportedVersion {
                kind: schema.kind().to_string(),
                since: schema.since(),
            });
        }
        let missing = schema
            .fields()
            .iter()
            .enumerate()
            .find(|(slot, def)| {
                def.required && self.version.supports(def.since) && record.value(*slot).is_empty()
            })
            .map(|(_, def)| SkipReason::MissingField(def.name));
        if missing.is_some() {
            return missing;
        }

        let broken = schema
            .fields()
            .iter()
            .enumerate()
            .find(|(slot, def)| {
                self.version.supports(def.since) && has_line_break(record.value(*slot))
            })
            .map(|(_, def)| SkipReason::LineBreak(def.name.to_string()));
        if broken.is_some() || !self.version.supports(DxfVersion::XDATA) {
            return broken;
        }

        record
            .xdata()
            .iter()
            .find(|group| {
                is_broken_text(&group.app_name)
                    || group.values.iter().any(|value| match value {
                        XDataValue::Str(s) | XDataValue::Control(s) | XDataValue::Handle(s) => {
                            is_broken_text(s)
                        }
                        _ => false,
                    })
            })
            .map(|group| SkipReason::LineBreak(format!("xdata {}", group.app_name.trim())))
    }

    /// 写出一条记录；校验失败时丢弃整条记录并返回 `Skipped`
    pub fn write<W: Write>(&self, out: &mut TagWriter<W>, record: &Record) -> Result<WriteOutcome> {
        if let Some(reason) = self.validate(record) {
            warn!(
                "{} record (id {:X}) not written for {}: {:?}",
                record.kind(),
                record.id_code,
                self.version,
                reason
            );
            return Ok(WriteOutcome::Skipped(reason));
        }

        let schema = record.schema();
        out.write_pair(0, schema.kind())?;

        for item in schema.layout() {
            match *item {
                Layout::Id => {
                    if record.id_code >= 0 {
                        if let Some(code) = schema.id_code() {
                            out.write_pair(code, format!("{:X}", record.id_code))?;
                        }
                    }
                }
                Layout::Reactors(slot) => {
                    self.write_group(out, record, slot, REACTORS_GROUP)?;
                }
                Layout::XDictionary(slot) => {
                    self.write_group(out, record, slot, XDICTIONARY_GROUP)?;
                }
                Layout::Subclass { marker, since } => {
                    if self.version.supports(since) {
                        out.write_pair(100, marker)?;
                    }
                }
                Layout::Field(slot) => self.write_field(out, schema, record, slot)?,
                Layout::ProxyGraphics { count, data } => {
                    self.write_proxy_graphics(out, schema, record, count, data)?;
                }
            }
        }

        if self.version.supports(DxfVersion::XDATA) {
            for group in record.xdata() {
                write_xdata(out, group)?;
            }
        }

        Ok(WriteOutcome::Written)
    }

    fn write_group<W: Write>(
        &self,
        out: &mut TagWriter<W>,
        record: &Record,
        slot: usize,
        group: &str,
    ) -> Result<()> {
        let def = record.schema().field(slot);
        let value = record.value(slot);
        if !self.version.supports(def.since) || value.is_empty() {
            return Ok(());
        }
        out.write_pair(102, format!("{{{}", group))?;
        match value {
            Value::Chain(chain) => {
                for node in chain {
                    out.write_pair(def.code, node)?;
                }
            }
            other => out.write_pair(def.code, other)?,
        }
        out.write_pair(102, "}")
    }

    fn write_field<W: Write>(
        &self,
        out: &mut TagWriter<W>,
        schema: &Schema,
        record: &Record,
        slot: usize,
    ) -> Result<()> {
        let def = schema.field(slot);
        if !self.version.supports(def.since) {
            return Ok(());
        }
        let value = record.value(slot);
        if def.optional && *value == def.default {
            return Ok(());
        }

        match value {
            Value::Point(p) => out.write_point(def.code, *p),
            Value::Chain(chain) => {
                for node in chain {
                    out.write_pair(def.code, node)?;
                }
                Ok(())
            }
            Value::Str(s) if s.is_empty() => match def.fixup {
                Some(Fixup::DefaultLinetype) => {
                    out.write_pair(def.code, &self.config.default_linetype)
                }
                Some(Fixup::DefaultLayer) => out.write_pair(def.code, &self.config.default_layer),
                None => out.write_pair(def.code, ""),
            },
            other => out.write_pair(def.code, other),
        }
    }

    fn write_proxy_graphics<W: Write>(
        &self,
        out: &mut TagWriter<W>,
        schema: &Schema,
        record: &Record,
        count: usize,
        data: usize,
    ) -> Result<()> {
        let data_def = schema.field(data);
        let Some(chain) = record.value(data).as_chain() else {
            return Ok(());
        };
        if !self.version.supports(data_def.since) || chain.is_empty() {
            return Ok(());
        }

        let size = match record.value(count).as_i32() {
            Some(n) if n > 0 => n as usize,
            _ => chain.hex_byte_len(),
        };
        let count_code = if self.version.supports(DxfVersion::PROXY_COUNT_160) {
            160
        } else {
            schema.field(count).code
        };
        out.write_pair(count_code, size)?;
        for node in chain {
            out.write_pair(data_def.code, node)?;
        }
        Ok(())
    }
}

fn is_broken_text(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

fn has_line_break(value: &Value) -> bool {
    match value {
        Value::Str(s) => is_broken_text(s),
        Value::Chain(chain) => chain.iter().any(has_line_break),
        _ => false,
    }
}

/// 写出一个应用的扩展数据
fn write_xdata<W: Write>(out: &mut TagWriter<W>, group: &XDataGroup) -> Result<()> {
    out.write_pair(1001, &group.app_name)?;
    for value in &group.values {
        let code = value.code();
        match value {
            XDataValue::Str(s) | XDataValue::Control(s) | XDataValue::Handle(s) => {
                out.write_pair(code, s)?
            }
            XDataValue::Point(p) => out.write_point(code, *p)?,
            XDataValue::Real(v) => out.write_pair(code, v)?,
            XDataValue::Int16(v) => out.write_pair(code, v)?,
            XDataValue::Int32(v) => out.write_pair(code, v)?,
        }
    }
    Ok(())
}
