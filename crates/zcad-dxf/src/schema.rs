//! 记录模式表
//!
//! 每种记录（表项、实体、对象）对应一张模式表：
//! - 读取时：组码（+ 所在 102 应用组 + 出现序号）→ 字段槽位
//! - 写出时：固定的输出顺序 [`Layout`]，每项各自带最低版本
//!
//! 同一组码在一个模式内唯一，除非按出现顺序区分（如先后两个 330）。
//! 模式表只是配置数据，读写逻辑由 [`RecordReader`](crate::reader::RecordReader)
//! 和 [`RecordWriter`](crate::writer::RecordWriter) 通用地解释。

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{DxfError, Result};
use crate::record::{Point3, Value};
use crate::version::DxfVersion;

/// 反应器应用组名（`102 {ACAD_REACTORS`）
pub const REACTORS_GROUP: &str = "ACAD_REACTORS";

/// 扩展字典应用组名（`102 {ACAD_XDICTIONARY`）
pub const XDICTIONARY_GROUP: &str = "ACAD_XDICTIONARY";

/// 字段值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// 十六进制句柄（记录 ID）
    HexId,
    Int16,
    Int32,
    Double,
    Str,
    /// 句柄字符串（不透明，不解析）
    Handle,
    /// 点：基础组码及 +10、+20 三个坐标
    Point,
    /// 290 类布尔标志，按 16 位整数存储
    Bool,
}

impl ValueKind {
    /// 该类型的零值
    pub fn zero(self) -> Value {
        match self {
            ValueKind::HexId | ValueKind::Int32 => Value::Int32(0),
            ValueKind::Int16 | ValueKind::Bool => Value::Int16(0),
            ValueKind::Double => Value::Double(0.0),
            ValueKind::Str | ValueKind::Handle => Value::Str(String::new()),
            ValueKind::Point => Value::Point(Point3::origin()),
        }
    }

    /// 将值行文本解析为该类型；数值格式错误返回 `None`
    ///
    /// 点类型按单个坐标处理，由调用方放入对应分量。
    pub fn parse(self, raw: &str) -> Option<Value> {
        let text = raw.trim();
        match self {
            ValueKind::Int16 | ValueKind::Bool => text.parse().ok().map(Value::Int16),
            ValueKind::Int32 => text.parse().ok().map(Value::Int32),
            ValueKind::HexId => i64::from_str_radix(text, 16)
                .ok()
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::Int32),
            ValueKind::Double | ValueKind::Point => text.parse().ok().map(Value::Double),
            ValueKind::Str => Some(Value::Str(raw.to_string())),
            ValueKind::Handle => Some(Value::Str(text.to_string())),
        }
    }
}

/// 字段存储方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// 单值，重复出现时覆盖
    Scalar,
    /// 续行链，重复出现时按文件顺序追加
    Chain,
}

/// 读取后的缺省值修正
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixup {
    /// 空值替换为配置中的默认线型
    DefaultLinetype,
    /// 空值替换为配置中的默认图层
    DefaultLayer,
}

/// 字段定义
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// 字段名
    pub name: &'static str,
    /// 组码
    pub code: i32,
    /// 同一组码的第几次出现（从 0 开始）
    pub occurrence: u32,
    /// 所在 102 应用组，`None` 表示组外
    pub group: Option<&'static str>,
    /// 值类型
    pub kind: ValueKind,
    /// 最低版本
    pub since: DxfVersion,
    /// 初始值
    pub default: Value,
    /// 存储方式
    pub storage: Storage,
    /// 写出前必须非空
    pub required: bool,
    /// 等于初始值时不写出
    pub optional: bool,
    /// 合法取值范围（含端点）
    pub range: Option<(f64, f64)>,
    /// 读取后修正
    pub fixup: Option<Fixup>,
}

impl FieldDef {
    pub fn new(name: &'static str, code: i32, kind: ValueKind) -> Self {
        Self {
            name,
            code,
            occurrence: 0,
            group: None,
            kind,
            since: DxfVersion::EARLIEST,
            default: kind.zero(),
            storage: Storage::Scalar,
            required: false,
            // 句柄为空时从不写出
            optional: kind == ValueKind::Handle,
            range: None,
            fixup: None,
        }
    }

    pub fn since(mut self, version: DxfVersion) -> Self {
        self.since = version;
        self
    }

    pub fn occurrence(mut self, n: u32) -> Self {
        self.occurrence = n;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        if let Some(v) = value.into().coerce(self.kind) {
            self.default = v;
        }
        self
    }

    pub fn chain(mut self) -> Self {
        self.storage = Storage::Chain;
        self.default = Value::Chain(Default::default());
        self.optional = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn fixup(mut self, fixup: Fixup) -> Self {
        self.fixup = Some(fixup);
        self
    }

    fn in_group(mut self, group: &'static str) -> Self {
        self.group = Some(group);
        self
    }

    /// 字段在流中占用的全部组码
    fn codes(&self) -> Vec<(i32, Option<u8>)> {
        if self.kind == ValueKind::Point {
            vec![
                (self.code, Some(0)),
                (self.code + 10, Some(1)),
                (self.code + 20, Some(2)),
            ]
        } else {
            vec![(self.code, None)]
        }
    }
}

/// 写出顺序中的一项
#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    /// 记录句柄
    Id,
    /// `102 {ACAD_REACTORS` 块，内含软指针链
    Reactors(usize),
    /// `102 {ACAD_XDICTIONARY` 块，内含硬指针字段
    XDictionary(usize),
    /// 子类标记（100）
    Subclass {
        marker: &'static str,
        since: DxfVersion,
    },
    /// 普通字段
    Field(usize),
    /// 代理图形：字节数（92/160）后跟 310 数据链
    ProxyGraphics { count: usize, data: usize },
}

/// 读取分派目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Id,
    Field { slot: usize, axis: Option<u8> },
}

#[derive(Debug, Clone)]
struct CodeEntry {
    group: Option<&'static str>,
    occurrence: u32,
    target: Target,
}

/// 记录模式表（构建后不可变）
#[derive(Debug)]
pub struct Schema {
    kind: String,
    since: DxfVersion,
    id_code: Option<i32>,
    fields: Vec<FieldDef>,
    layout: Vec<Layout>,
    lookup: HashMap<i32, Vec<CodeEntry>>,
}

impl Schema {
    /// 记录类型名（组码 0 的值）
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// 该记录类型的最低版本
    pub fn since(&self) -> DxfVersion {
        self.since
    }

    /// 句柄组码
    pub fn id_code(&self) -> Option<i32> {
        self.id_code
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, slot: usize) -> &FieldDef {
        &self.fields[slot]
    }

    pub fn layout(&self) -> &[Layout] {
        &self.layout
    }

    /// 按字段名查找槽位
    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// 使用该组码的反应器链槽位
    ///
    /// 宽松的生成器会省略 `102` 括号，把反应器句柄直接写在组外。
    pub fn reactor_slot(&self, code: i32) -> Option<usize> {
        self.layout.iter().find_map(|item| match *item {
            Layout::Reactors(slot) if self.fields[slot].code == code => Some(slot),
            _ => None,
        })
    }

    /// 某组码是否按出现顺序映射到多个槽位
    pub fn is_multi_valued(&self, code: i32) -> bool {
        self.lookup.get(&code).is_some_and(|entries| entries.len() > 1)
    }

    /// 按组码、所在应用组和出现序号查找分派目标
    ///
    /// 出现次数超过定义时落到序号最大的那一项（后值覆盖前值）。
    pub fn resolve(&self, group: Option<&str>, code: i32, occurrence: u32) -> Option<Target> {
        self.lookup
            .get(&code)?
            .iter()
            .filter(|e| e.group == group && e.occurrence <= occurrence)
            .max_by_key(|e| e.occurrence)
            .map(|e| e.target)
    }
}

/// 模式表构建器
pub struct SchemaBuilder {
    kind: String,
    since: DxfVersion,
    id_code: Option<i32>,
    fields: Vec<FieldDef>,
    layout: Vec<Layout>,
    aliases: Vec<(i32, &'static str)>,
}

impl SchemaBuilder {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            since: DxfVersion::EARLIEST,
            id_code: None,
            fields: Vec::new(),
            layout: Vec::new(),
            aliases: Vec::new(),
        }
    }

    /// 记录类型本身的最低版本
    pub fn since(mut self, version: DxfVersion) -> Self {
        self.since = version;
        self
    }

    /// 句柄字段（通常为 5）
    pub fn id(mut self, code: i32) -> Self {
        self.id_code = Some(code);
        self.layout.push(Layout::Id);
        self
    }

    fn push_field(&mut self, def: FieldDef) -> usize {
        self.fields.push(def);
        self.fields.len() - 1
    }

    /// 反应器块中的软指针（330），可重复，按文件顺序成链
    pub fn reactors(mut self, def: FieldDef) -> Self {
        let def = def.in_group(REACTORS_GROUP).since(DxfVersion::REACTORS).chain();
        let slot = self.push_field(def);
        self.layout.push(Layout::Reactors(slot));
        self
    }

    /// 扩展字典块中的硬指针（360）
    pub fn xdictionary(mut self, def: FieldDef) -> Self {
        let slot = self.push_field(def.in_group(XDICTIONARY_GROUP).since(DxfVersion::REACTORS));
        self.layout.push(Layout::XDictionary(slot));
        self
    }

    /// 子类标记，R13 起写出
    pub fn subclass(mut self, marker: &'static str) -> Self {
        self.layout.push(Layout::Subclass {
            marker,
            since: DxfVersion::SUBCLASS_MARKERS,
        });
        self
    }

    pub fn field(mut self, def: FieldDef) -> Self {
        let slot = self.push_field(def);
        self.layout.push(Layout::Field(slot));
        self
    }

    /// 代理图形：字节数字段与 310 数据链
    pub fn proxy_graphics(mut self, count: FieldDef, data: FieldDef) -> Self {
        let count = self.push_field(count);
        let data = self.push_field(data.chain());
        self.layout.push(Layout::ProxyGraphics { count, data });
        self
    }

    /// 只读别名：另一个组码也写入同一字段
    pub fn alias(mut self, code: i32, field: &'static str) -> Self {
        self.aliases.push((code, field));
        self
    }

    pub fn build(self) -> Result<Arc<Schema>> {
        let mut lookup: HashMap<i32, Vec<CodeEntry>> = HashMap::new();

        let mut insert = |code: i32, entry: CodeEntry| -> Result<()> {
            let entries = lookup.entry(code).or_default();
            if entries
                .iter()
                .any(|e| e.group == entry.group && e.occurrence == entry.occurrence)
            {
                return Err(DxfError::InvalidFormat(format!(
                    "{}: duplicate group code {} (occurrence {})",
                    self.kind, code, entry.occurrence
                )));
            }
            entries.push(entry);
            Ok(())
        };

        if let Some(code) = self.id_code {
            insert(code, CodeEntry { group: None, occurrence: 0, target: Target::Id })?;
        }

        for (slot, def) in self.fields.iter().enumerate() {
            for (code, axis) in def.codes() {
                insert(
                    code,
                    CodeEntry {
                        group: def.group,
                        occurrence: def.occurrence,
                        target: Target::Field { slot, axis },
                    },
                )?;
            }
        }

        for (code, name) in &self.aliases {
            let slot = self.fields.iter().position(|f| f.name == *name).ok_or_else(|| {
                DxfError::UnknownField {
                    kind: self.kind.clone(),
                    field: name.to_string(),
                }
            })?;
            let def = &self.fields[slot];
            insert(
                *code,
                CodeEntry {
                    group: def.group,
                    occurrence: def.occurrence,
                    target: Target::Field { slot, axis: None },
                },
            )?;
        }

        Ok(Arc::new(Schema {
            kind: self.kind,
            since: self.since,
            id_code: self.id_code,
            fields: self.fields,
            layout: self.layout,
            lookup,
        }))
    }
}
