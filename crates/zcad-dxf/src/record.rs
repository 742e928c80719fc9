//! 通用记录
//!
//! 一条记录是某个模式表的实例：一个句柄 `id_code`（-1 表示写出时省略）、
//! 按模式槽位排列的字段值、以及可选的扩展数据。所有记录类型共用
//! [`Record::new`] 按模式初始值构造。

use std::fmt;
use std::sync::Arc;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::error::{DxfError, Result};
use crate::schema::{Schema, Storage, ValueKind};
use crate::xdata::XDataGroup;

/// 三维点
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    /// 按分量下标设置坐标（0=X, 1=Y, 2=Z）
    pub fn set_axis(&mut self, axis: u8, value: f64) {
        match axis {
            0 => self.x = value,
            1 => self.y = value,
            _ => self.z = value,
        }
    }
}

/// 字段值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int16(i16),
    Int32(i32),
    Double(f64),
    Str(String),
    Point(Point3),
    Chain(Chain),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int16(v) => Some(i32::from(*v)),
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int16(v) => Some(f64::from(*v)),
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<Point3> {
        match self {
            Value::Point(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_chain(&self) -> Option<&Chain> {
        match self {
            Value::Chain(c) => Some(c),
            _ => None,
        }
    }

    /// 空字符串或空链
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Str(s) => s.is_empty(),
            Value::Chain(c) => c.is_empty(),
            _ => false,
        }
    }

    /// 转换为指定类型的存储形式，不能无损转换时返回 `None`
    pub fn coerce(self, kind: ValueKind) -> Option<Value> {
        match (kind, self) {
            (ValueKind::Int16 | ValueKind::Bool, Value::Int16(v)) => Some(Value::Int16(v)),
            (ValueKind::Int16 | ValueKind::Bool, Value::Int32(v)) => {
                i16::try_from(v).ok().map(Value::Int16)
            }
            (ValueKind::Int32 | ValueKind::HexId, Value::Int32(v)) => Some(Value::Int32(v)),
            (ValueKind::Int32 | ValueKind::HexId, Value::Int16(v)) => {
                Some(Value::Int32(i32::from(v)))
            }
            (ValueKind::Double, v @ (Value::Double(_) | Value::Int16(_) | Value::Int32(_))) => {
                v.as_f64().map(Value::Double)
            }
            (ValueKind::Str | ValueKind::Handle, Value::Str(s)) => Some(Value::Str(s)),
            (ValueKind::Point, Value::Point(p)) => Some(Value::Point(p)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Str(s) => f.write_str(s),
            Value::Point(p) => write!(f, "({}, {}, {})", p.x, p.y, p.z),
            Value::Chain(c) => write!(f, "<{} nodes>", c.len()),
        }
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Point3> for Value {
    fn from(v: Point3) -> Self {
        Value::Point(v)
    }
}

/// 通用记录
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<Schema>,
    /// 句柄，-1 表示写出时省略
    pub id_code: i64,
    values: Vec<Value>,
    xdata: Vec<XDataGroup>,
}

impl Record {
    /// 按模式初始值构造记录
    pub fn new(schema: &Arc<Schema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            id_code: -1,
            values: schema.fields().iter().map(|f| f.default.clone()).collect(),
            xdata: Vec::new(),
        }
    }

    /// 记录类型名
    pub fn kind(&self) -> &str {
        self.schema.kind()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn slot(&self, name: &str) -> Result<usize> {
        self.schema.slot_of(name).ok_or_else(|| DxfError::UnknownField {
            kind: self.kind().to_string(),
            field: name.to_string(),
        })
    }

    /// 文本值不能含换行，否则会打乱后续的组码-值配对
    fn check_text(name: &str, value: &Value) -> Result<()> {
        match value {
            Value::Str(s) if s.contains(['\n', '\r']) => Err(DxfError::LineBreak {
                field: name.to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.slot_of(name).map(|slot| &self.values[slot])
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(Value::as_i32)
    }

    pub fn double(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn point(&self, name: &str) -> Option<Point3> {
        self.get(name).and_then(Value::as_point)
    }

    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.get(name).and_then(Value::as_chain)
    }

    /// 设置标量字段，值类型须与模式一致（整数可在无损时转换）
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let slot = self.slot(name)?;
        let def = self.schema.field(slot);
        if def.storage == Storage::Chain {
            return Err(DxfError::KindMismatch {
                field: name.to_string(),
                expected: def.kind,
            });
        }
        let kind = def.kind;
        let value = value.into().coerce(kind).ok_or_else(|| DxfError::KindMismatch {
            field: name.to_string(),
            expected: kind,
        })?;
        Self::check_text(name, &value)?;
        self.values[slot] = value;
        Ok(())
    }

    /// 在续行链字段尾部追加一个节点
    pub fn push(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let slot = self.slot(name)?;
        let kind = self.schema.field(slot).kind;
        let mismatch = || DxfError::KindMismatch {
            field: name.to_string(),
            expected: kind,
        };
        let value = value.into().coerce(kind).ok_or_else(mismatch)?;
        Self::check_text(name, &value)?;
        match &mut self.values[slot] {
            Value::Chain(chain) => {
                chain.push(value);
                Ok(())
            }
            _ => Err(mismatch()),
        }
    }

    pub(crate) fn value(&self, slot: usize) -> &Value {
        &self.values[slot]
    }

    pub(crate) fn value_mut(&mut self, slot: usize) -> &mut Value {
        &mut self.values[slot]
    }

    pub fn xdata(&self) -> &[XDataGroup] {
        &self.xdata
    }

    pub fn xdata_mut(&mut self) -> &mut Vec<XDataGroup> {
        &mut self.xdata
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", self.kind())?;
        if self.id_code >= 0 {
            map.serialize_entry("id_code", &format!("{:X}", self.id_code))?;
        }
        for (def, value) in self.schema.fields().iter().zip(&self.values) {
            if !(def.optional && *value == def.default) {
                map.serialize_entry(def.name, value)?;
            }
        }
        if !self.xdata.is_empty() {
            map.serialize_entry("xdata", &self.xdata)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, SchemaBuilder};

    fn schema() -> Arc<Schema> {
        SchemaBuilder::new("TEST")
            .id(5)
            .field(FieldDef::new("name", 2, ValueKind::Str).required())
            .field(FieldDef::new("flags", 70, ValueKind::Int16))
            .field(FieldDef::new("scale", 48, ValueKind::Double).default_value(1.0))
            .field(FieldDef::new("base", 10, ValueKind::Point))
            .field(FieldDef::new("data", 310, ValueKind::Str).chain())
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_uses_schema_defaults() {
        let record = Record::new(&schema());
        assert_eq!(record.id_code, -1);
        assert_eq!(record.kind(), "TEST");
        assert_eq!(record.str("name"), Some(""));
        assert_eq!(record.int("flags"), Some(0));
        assert_eq!(record.double("scale"), Some(1.0));
        assert_eq!(record.point("base"), Some(Point3::origin()));
        assert!(record.chain("data").unwrap().is_empty());
    }

    #[test]
    fn test_set_coerces_integers() {
        let mut record = Record::new(&schema());
        record.set("flags", 64).unwrap();
        assert_eq!(record.get("flags"), Some(&Value::Int16(64)));
        record.set("scale", 2).unwrap();
        assert_eq!(record.double("scale"), Some(2.0));
    }

    #[test]
    fn test_set_rejects_line_break() {
        let mut record = Record::new(&schema());
        assert!(matches!(
            record.set("name", "WALLS\n70"),
            Err(DxfError::LineBreak { .. })
        ));
        assert!(matches!(
            record.push("data", "0A\r"),
            Err(DxfError::LineBreak { .. })
        ));
        assert_eq!(record.str("name"), Some(""));
        assert!(record.chain("data").unwrap().is_empty());
    }

    #[test]
    fn test_set_rejects_mismatch() {
        let mut record = Record::new(&schema());
        assert!(matches!(
            record.set("flags", "text"),
            Err(DxfError::KindMismatch { .. })
        ));
        assert!(matches!(
            record.set("flags", 70_000),
            Err(DxfError::KindMismatch { .. })
        ));
        assert!(matches!(
            record.set("missing", 1),
            Err(DxfError::UnknownField { .. })
        ));
        assert!(record.set("data", "AA").is_err());
    }

    #[test]
    fn test_push_chain() {
        let mut record = Record::new(&schema());
        record.push("data", "AA").unwrap();
        record.push("data", "BB").unwrap();
        assert_eq!(record.chain("data").unwrap().len(), 2);
        assert!(record.push("name", "x").is_err());
    }

    #[test]
    fn test_serialize_skips_empty_optional() {
        let mut record = Record::new(&schema());
        record.id_code = 0x2F;
        record.set("name", "A").unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "TEST");
        assert_eq!(json["id_code"], "2F");
        assert_eq!(json["name"], "A");
        assert!(json.get("data").is_none());
    }
}
