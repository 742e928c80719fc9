//! 扩展数据（xdata）
//!
//! 记录末尾由 1001 应用名开头的若干组应用自定义数据。

use serde::Serialize;

use crate::record::Point3;

/// 扩展数据值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum XDataValue {
    /// 1000
    Str(String),
    /// 1002，`{` 或 `}`
    Control(String),
    /// 1005
    Handle(String),
    /// 1010/1020/1030
    Point(Point3),
    /// 1040
    Real(f64),
    /// 1070
    Int16(i16),
    /// 1071
    Int32(i32),
}

impl XDataValue {
    /// 写出时使用的组码（点为 X 分量的组码）
    pub fn code(&self) -> i32 {
        match self {
            XDataValue::Str(_) => 1000,
            XDataValue::Control(_) => 1002,
            XDataValue::Handle(_) => 1005,
            XDataValue::Point(_) => 1010,
            XDataValue::Real(_) => 1040,
            XDataValue::Int16(_) => 1070,
            XDataValue::Int32(_) => 1071,
        }
    }
}

/// 一个应用的扩展数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XDataGroup {
    pub app_name: String,
    pub values: Vec<XDataValue>,
}

impl XDataGroup {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: XDataValue) -> Self {
        self.values.push(value);
        self
    }
}

/// 收集一个扩展数据标签的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XDataStatus {
    Stored,
    /// 数值格式错误，值被丢弃
    Malformed,
    /// 出现在任何 1001 之前
    Orphan,
    /// 不支持的扩展数据组码
    Unsupported,
}

/// 把一个 10xx 标签收入扩展数据组列表
pub fn collect(groups: &mut Vec<XDataGroup>, code: i32, raw: &str) -> XDataStatus {
    if code == 1001 {
        groups.push(XDataGroup::new(raw.trim()));
        return XDataStatus::Stored;
    }

    let Some(group) = groups.last_mut() else {
        return XDataStatus::Orphan;
    };

    let text = raw.trim();
    let value = match code {
        1000 => Some(XDataValue::Str(raw.to_string())),
        1002 => Some(XDataValue::Control(text.to_string())),
        1005 => Some(XDataValue::Handle(text.to_string())),
        1010 => text
            .parse()
            .ok()
            .map(|x| XDataValue::Point(Point3::new(x, 0.0, 0.0))),
        1020 | 1030 => {
            let Ok(v) = text.parse::<f64>() else {
                return XDataStatus::Malformed;
            };
            return match group.values.last_mut() {
                Some(XDataValue::Point(p)) => {
                    p.set_axis(if code == 1020 { 1 } else { 2 }, v);
                    XDataStatus::Stored
                }
                _ => XDataStatus::Orphan,
            };
        }
        1040 => text.parse().ok().map(XDataValue::Real),
        1070 => text.parse().ok().map(XDataValue::Int16),
        1071 => text.parse().ok().map(XDataValue::Int32),
        _ => return XDataStatus::Unsupported,
    };

    match value {
        Some(v) => {
            group.values.push(v);
            XDataStatus::Stored
        }
        None => XDataStatus::Malformed,
    }
}
