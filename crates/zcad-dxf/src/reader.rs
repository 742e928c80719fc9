//! 通用记录读取器
//!
//! 按模式表驱动标签扫描器，直到遇到哨兵组码 0：
//! 1. 组码按所在 102 应用组和出现序号查表（如组内第一个 330 是反应器，组外的是所属对象）；
//!    省略了括号的流中组外重复的 330，先出现的归入反应器链，最后一个是所属对象
//! 2. 高于流版本的字段仍被读取以保持对齐，告警后按配置保留或丢弃
//! 3. 未知组码告警后丢弃，解析继续
//! 4. 续行字段追加到链尾，保持文件顺序
//! 5. 数值格式错误只告警，字段保留原值
//!
//! 标签循环结束后统一执行一次“修正省略/非法值”。
//! 只有流级错误（IO、提前结束、组码非法）会中止读取，此时不返回任何记录。

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{DxfConfig, GatedFieldPolicy};
use crate::error::Result;
use crate::record::{Record, Value};
use crate::scanner::TagScanner;
use crate::schema::{Fixup, Schema, Storage, Target};
use crate::version::DxfVersion;
use crate::xdata::{self, XDataStatus};

/// 读取过程中的局部问题（不中止读取）
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// 模式表中没有的组码，值已丢弃
    UnknownCode { kind: String, code: i32, line: usize },
    /// 数值格式错误，字段保留原值
    MalformedValue {
        field: String,
        code: i32,
        line: usize,
        text: String,
    },
    /// 字段的最低版本高于流版本
    VersionGated {
        field: &'static str,
        since: DxfVersion,
        line: usize,
    },
    /// 越界值已重置为初始值
    IllegalValue { field: &'static str, value: String },
    /// 单值字段重复出现，前值被覆盖
    Overwritten {
        field: &'static str,
        code: i32,
        line: usize,
    },
}

/// 通用记录读取器
pub struct RecordReader<'a> {
    config: &'a DxfConfig,
    version: DxfVersion,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RecordReader<'a> {
    /// `version` 为流声明的版本（`$ACADVER`）
    pub fn new(config: &'a DxfConfig, version: DxfVersion) -> Self {
        Self {
            config,
            version,
            diagnostics: Vec::new(),
        }
    }

    pub fn version(&self) -> DxfVersion {
        self.version
    }

    pub fn config(&self) -> &DxfConfig {
        self.config
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// 为指定模式新建记录并读取
    pub fn read_new<R: BufRead>(
        &mut self,
        scanner: &mut TagScanner<R>,
        schema: &Arc<Schema>,
    ) -> Result<Record> {
        self.read(scanner, Record::new(schema))
    }

    /// 读取标签直到哨兵组码 0，填充 `record`
    ///
    /// 返回时哨兵组码行已被消耗，其值行留给调用方。
    pub fn read<R: BufRead>(
        &mut self,
        scanner: &mut TagScanner<R>,
        mut record: Record,
    ) -> Result<Record> {
        let schema = Arc::clone(record.schema());
        let mut counters: HashMap<(Option<String>, i32), u32> = HashMap::new();
        let mut group: Option<String> = None;
        let mut filled: HashSet<(usize, Option<u8>)> = HashSet::new();

        loop {
            let code = scanner.next_code()?;
            if code == 0 {
                break;
            }
            let raw = scanner.next_value()?;
            let line = scanner.line();

            match code {
                999 => {
                    info!("DXF comment: {}", raw.trim());
                    continue;
                }
                102 => {
                    let marker = raw.trim();
                    if let Some(name) = marker.strip_prefix('{') {
                        group = Some(name.to_string());
                    } else {
                        group = None;
                    }
                    debug!("{}: group marker {} at line {}", schema.kind(), marker, line);
                    continue;
                }
                1000..=1071 => {
                    self.collect_xdata(&mut record, code, &raw, line);
                    continue;
                }
                _ => {}
            }

            let counter = counters.entry((group.clone(), code)).or_insert(0);
            let occurrence = *counter;
            *counter += 1;

            match schema.resolve(group.as_deref(), code, occurrence) {
                Some(target) => {
                    if let Target::Field { slot, axis } = target {
                        let def = schema.field(slot);
                        // 格式错误的值不会覆盖前值，不算重复
                        let stored =
                            def.storage == Storage::Scalar && def.kind.parse(&raw).is_some();
                        if stored && !filled.insert((slot, axis)) {
                            self.repeated(&schema, &mut record, group.is_some(), slot, code, line);
                        }
                    }
                    self.apply(&schema, &mut record, target, code, &raw, line);
                }
                None => self.unknown(&schema, code, line),
            }
        }

        self.fix_values(&schema, &mut record);
        Ok(record)
    }

    /// 跳过当前记录的全部标签，直到哨兵组码 0
    pub fn skip<R: BufRead>(&mut self, scanner: &mut TagScanner<R>) -> Result<usize> {
        let mut skipped = 0;
        loop {
            if scanner.next_code()? == 0 {
                break;
            }
            scanner.next_value()?;
            skipped += 1;
        }
        debug!("Skipped {} tags ending at line {}", skipped, scanner.line());
        Ok(skipped)
    }

    fn unknown(&mut self, schema: &Schema, code: i32, line: usize) {
        warn!(
            "{}: unknown group code {} at line {}, value discarded",
            schema.kind(),
            code,
            line
        );
        self.diagnostics.push(Diagnostic::UnknownCode {
            kind: schema.kind().to_string(),
            code,
            line,
        });
    }

    /// 单值字段再次出现
    ///
    /// 组外的 330 在前值之后重复出现时，前值移入反应器链；其他情况告警后覆盖。
    fn repeated(
        &mut self,
        schema: &Schema,
        record: &mut Record,
        in_group: bool,
        slot: usize,
        code: i32,
        line: usize,
    ) {
        let def = schema.field(slot);
        let reactors = schema
            .reactor_slot(code)
            .filter(|&r| !in_group && r != slot && self.version.supports(schema.field(r).since));

        if let Some(reactors) = reactors {
            let previous = std::mem::replace(record.value_mut(slot), def.default.clone());
            debug!(
                "{}: unbracketed reactor {} at line {}",
                schema.kind(),
                previous,
                line
            );
            if let Value::Chain(chain) = record.value_mut(reactors) {
                chain.push(previous);
            }
            return;
        }

        warn!(
            "{}: group code {} repeated at line {}, {} overwritten",
            schema.kind(),
            code,
            line,
            def.name
        );
        self.diagnostics.push(Diagnostic::Overwritten {
            field: def.name,
            code,
            line,
        });
    }

    fn malformed(&mut self, field: &str, code: i32, raw: &str, line: usize) {
        warn!(
            "Malformed value {:?} for {} (group code {}) at line {}",
            raw, field, code, line
        );
        self.diagnostics.push(Diagnostic::MalformedValue {
            field: field.to_string(),
            code,
            line,
            text: raw.to_string(),
        });
    }

    fn apply(
        &mut self,
        schema: &Schema,
        record: &mut Record,
        target: Target,
        code: i32,
        raw: &str,
        line: usize,
    ) {
        let (slot, axis) = match target {
            Target::Id => {
                match i64::from_str_radix(raw.trim(), 16) {
                    Ok(id) => record.id_code = id,
                    Err(_) => self.malformed("id_code", code, raw, line),
                }
                return;
            }
            Target::Field { slot, axis } => (slot, axis),
        };

        let def = schema.field(slot);
        if !self.version.supports(def.since) {
            warn!(
                "{}: field {} requires {} but stream is {} (line {})",
                schema.kind(),
                def.name,
                def.since,
                self.version,
                line
            );
            self.diagnostics.push(Diagnostic::VersionGated {
                field: def.name,
                since: def.since,
                line,
            });
            if self.config.gated_fields == GatedFieldPolicy::Discard {
                return;
            }
        }

        let Some(parsed) = def.kind.parse(raw) else {
            self.malformed(def.name, code, raw, line);
            return;
        };

        match (def.storage, axis, record.value_mut(slot)) {
            (Storage::Chain, _, Value::Chain(chain)) => chain.push(parsed),
            (Storage::Scalar, Some(axis), Value::Point(point)) => {
                if let Value::Double(v) = parsed {
                    point.set_axis(axis, v);
                }
            }
            (Storage::Scalar, None, slot_value) => *slot_value = parsed,
            _ => {}
        }
    }

    fn collect_xdata(&mut self, record: &mut Record, code: i32, raw: &str, line: usize) {
        match xdata::collect(record.xdata_mut(), code, raw) {
            XDataStatus::Stored => {}
            XDataStatus::Malformed => self.malformed("xdata", code, raw, line),
            XDataStatus::Orphan | XDataStatus::Unsupported => {
                let schema = Arc::clone(record.schema());
                self.unknown(&schema, code, line);
            }
        }
    }

    /// 修正省略值和非法值
    fn fix_values(&mut self, schema: &Schema, record: &mut Record) {
        for (slot, def) in schema.fields().iter().enumerate() {
            if let Some(fixup) = def.fixup {
                let value = record.value_mut(slot);
                if value.is_empty() {
                    let default = match fixup {
                        Fixup::DefaultLinetype => &self.config.default_linetype,
                        Fixup::DefaultLayer => &self.config.default_layer,
                    };
                    *value = Value::Str(default.clone());
                }
            }

            if !self.config.fix_illegal_values {
                continue;
            }
            if let Some((min, max)) = def.range {
                let value = record.value_mut(slot);
                if let Some(v) = value.as_f64() {
                    if v < min || v > max {
                        warn!(
                            "{}: illegal value {} for {}, reset to {}",
                            schema.kind(),
                            v,
                            def.name,
                            def.default
                        );
                        self.diagnostics.push(Diagnostic::IllegalValue {
                            field: def.name,
                            value: value.to_string(),
                        });
                        *value = def.default.clone();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Point3;
    use crate::schema::{FieldDef, SchemaBuilder, ValueKind};
    use std::io::Cursor;

    fn layer_like() -> Arc<Schema> {
        SchemaBuilder::new("LAYER")
            .id(5)
            .reactors(FieldDef::new("dictionary_owner_soft", 330, ValueKind::Handle))
            .xdictionary(FieldDef::new("dictionary_owner_hard", 360, ValueKind::Handle))
            .field(FieldDef::new("object_owner_soft", 330, ValueKind::Handle))
            .subclass("AcDbSymbolTableRecord")
            .field(FieldDef::new("name", 2, ValueKind::Str).required())
            .field(FieldDef::new("flags", 70, ValueKind::Int16))
            .field(FieldDef::new("color", 62, ValueKind::Int16).default_value(7).range(-256.0, 256.0))
            .field(FieldDef::new("linetype", 6, ValueKind::Str).fixup(Fixup::DefaultLinetype))
            .field(FieldDef::new("base", 10, ValueKind::Point))
            .field(FieldDef::new("lineweight", 370, ValueKind::Int16).since(DxfVersion::R2000))
            .field(FieldDef::new("preview", 310, ValueKind::Str).chain())
            .build()
            .unwrap()
    }

    fn read(text: &str, version: DxfVersion, config: &DxfConfig) -> (Record, Vec<Diagnostic>) {
        let mut scanner = TagScanner::new(Cursor::new(text.to_string()));
        let mut reader = RecordReader::new(config, version);
        let record = reader.read_new(&mut scanner, &layer_like()).unwrap();
        (record, reader.take_diagnostics())
    }

    #[test]
    fn test_owner_handles_by_group() {
        let text = "5\n10\n102\n{ACAD_REACTORS\n330\n2\n102\n}\n\
                    102\n{ACAD_XDICTIONARY\n360\n3A\n102\n}\n330\n8\n2\nWALLS\n0\n";
        let (record, diags) = read(text, DxfVersion::R2000, &DxfConfig::default());
        assert!(diags.is_empty());
        assert_eq!(record.id_code, 16);
        assert_eq!(reactors(&record), vec!["2"]);
        assert_eq!(record.str("dictionary_owner_hard"), Some("3A"));
        assert_eq!(record.str("object_owner_soft"), Some("8"));
        assert_eq!(record.str("name"), Some("WALLS"));
    }

    fn reactors(record: &Record) -> Vec<&str> {
        record
            .chain("dictionary_owner_soft")
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect()
    }

    #[test]
    fn test_several_reactors_kept_in_order() {
        let text = "5\n10\n102\n{ACAD_REACTORS\n330\nA1\n330\nA2\n330\nA3\n102\n}\n\
                    330\n8\n2\nWALLS\n0\n";
        let (record, diags) = read(text, DxfVersion::R2000, &DxfConfig::default());
        assert!(diags.is_empty());
        assert_eq!(reactors(&record), vec!["A1", "A2", "A3"]);
        assert_eq!(record.str("object_owner_soft"), Some("8"));
    }

    #[test]
    fn test_unbracketed_owner_handles() {
        let text = "5\n10\n330\nD1\n330\nO2\n2\nWALLS\n0\n";
        let (record, diags) = read(text, DxfVersion::R2000, &DxfConfig::default());
        assert!(diags.is_empty());
        assert_eq!(reactors(&record), vec!["D1"]);
        assert_eq!(record.str("object_owner_soft"), Some("O2"));

        // 只有一个组外 330 时它是所属对象
        let single = "330\nO1\n2\nA\n0\n";
        let (record, _) = read(single, DxfVersion::R2000, &DxfConfig::default());
        assert!(reactors(&record).is_empty());
        assert_eq!(record.str("object_owner_soft"), Some("O1"));

        // 低于 R14 没有反应器，重复的 330 覆盖前值
        let (record, diags) = read(text, DxfVersion::R13, &DxfConfig::default());
        assert_eq!(record.str("object_owner_soft"), Some("O2"));
        assert_eq!(
            diags,
            vec![Diagnostic::Overwritten { field: "object_owner_soft", code: 330, line: 6 }]
        );
    }

    #[test]
    fn test_repeated_scalar_reported() {
        let text = "2\nA\n70\n1\n70\n4\n0\n";
        let (record, diags) = read(text, DxfVersion::R2000, &DxfConfig::default());
        assert_eq!(record.int("flags"), Some(4));
        assert_eq!(diags, vec![Diagnostic::Overwritten { field: "flags", code: 70, line: 6 }]);
    }

    #[test]
    fn test_point_and_chain() {
        let text = "2\nA\n10\n1.5\n20\n2.5\n30\n3.5\n310\nAA\n310\nBB\n0\n";
        let (record, _) = read(text, DxfVersion::R2000, &DxfConfig::default());
        assert_eq!(record.point("base"), Some(Point3::new(1.5, 2.5, 3.5)));
        let chain: Vec<_> = record.chain("preview").unwrap().iter().collect();
        assert_eq!(chain, vec![&Value::from("AA"), &Value::from("BB")]);
    }

    #[test]
    fn test_malformed_keeps_previous() {
        let text = "2\nA\n70\n4\n70\nfour\n0\n";
        let (record, diags) = read(text, DxfVersion::R2000, &DxfConfig::default());
        assert_eq!(record.int("flags"), Some(4));
        assert!(matches!(
            diags.as_slice(),
            [Diagnostic::MalformedValue { code: 70, line: 6, .. }]
        ));
    }

    #[test]
    fn test_unknown_code_skipped() {
        let text = "2\nA\n71\n9\n70\n1\n0\n";
        let (record, diags) = read(text, DxfVersion::R2000, &DxfConfig::default());
        assert_eq!(record.int("flags"), Some(1));
        assert_eq!(
            diags,
            vec![Diagnostic::UnknownCode { kind: "LAYER".into(), code: 71, line: 4 }]
        );
    }

    #[test]
    fn test_version_gated_policy() {
        let text = "2\nA\n370\n25\n0\n";
        let (record, diags) = read(text, DxfVersion::R12, &DxfConfig::default());
        assert_eq!(record.int("lineweight"), Some(25));
        assert!(matches!(diags[0], Diagnostic::VersionGated { field: "lineweight", .. }));

        let config = DxfConfig {
            gated_fields: GatedFieldPolicy::Discard,
            ..DxfConfig::default()
        };
        let (record, _) = read(text, DxfVersion::R12, &config);
        assert_eq!(record.int("lineweight"), Some(0));
    }

    #[test]
    fn test_fixups() {
        let text = "2\nA\n6\n\n62\n999\n0\n";
        let (record, diags) = read(text, DxfVersion::R2000, &DxfConfig::default());
        assert_eq!(record.str("linetype"), Some("CONTINUOUS"));
        assert_eq!(record.int("color"), Some(7));
        assert!(matches!(diags[0], Diagnostic::IllegalValue { field: "color", .. }));
    }

    #[test]
    fn test_comment_and_xdata() {
        let text = "999\nhello\n2\nA\n1001\nZCAD\n1070\n5\n0\n";
        let (record, diags) = read(text, DxfVersion::R2000, &DxfConfig::default());
        assert!(diags.is_empty());
        assert_eq!(record.xdata().len(), 1);
        assert_eq!(record.xdata()[0].app_name, "ZCAD");
    }

    #[test]
    fn test_eof_aborts_read() {
        let mut scanner = TagScanner::new(Cursor::new("2\nA\n70\n"));
        let config = DxfConfig::default();
        let mut reader = RecordReader::new(&config, DxfVersion::R2000);
        assert!(reader.read_new(&mut scanner, &layer_like()).is_err());
    }

    #[test]
    fn test_skip() {
        let mut scanner = TagScanner::new(Cursor::new("2\nA\n70\n1\n0\nLAYER\n"));
        let config = DxfConfig::default();
        let mut reader = RecordReader::new(&config, DxfVersion::R2000);
        assert_eq!(reader.skip(&mut scanner).unwrap(), 2);
        assert_eq!(scanner.read_sentinel_name().unwrap().as_deref(), Some("LAYER"));
    }
}
