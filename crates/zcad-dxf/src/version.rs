//! DXF 格式版本
//!
//! 版本按发布顺序排列，字段/块的版本门控只做序数比较 `>=`。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DxfError;

/// DXF 格式版本（从早到晚）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DxfVersion {
    R10,
    R11,
    R12,
    R13,
    R14,
    R2000,
    R2004,
    R2007,
    R2010,
    R2013,
    R2018,
}

impl DxfVersion {
    /// 全部版本，按顺序
    pub const ALL: [DxfVersion; 11] = [
        DxfVersion::R10,
        DxfVersion::R11,
        DxfVersion::R12,
        DxfVersion::R13,
        DxfVersion::R14,
        DxfVersion::R2000,
        DxfVersion::R2004,
        DxfVersion::R2007,
        DxfVersion::R2010,
        DxfVersion::R2013,
        DxfVersion::R2018,
    ];

    /// 最早的版本
    pub const EARLIEST: DxfVersion = DxfVersion::R10;

    /// 最新的版本
    pub const LATEST: DxfVersion = DxfVersion::R2018;

    /// 支持 102 反应器/扩展字典块的最早版本
    pub const REACTORS: DxfVersion = DxfVersion::R14;

    /// 引入子类标记（100）的最早版本
    pub const SUBCLASS_MARKERS: DxfVersion = DxfVersion::R13;

    /// 支持扩展数据（xdata）的最早版本
    pub const XDATA: DxfVersion = DxfVersion::R11;

    /// 代理图形字节数改用 160 组码的版本
    pub const PROXY_COUNT_160: DxfVersion = DxfVersion::R2010;

    /// 解析 `$ACADVER` 字符串，如 `AC1015`
    pub fn from_acadver(s: &str) -> Option<Self> {
        let v = match s.trim() {
            "AC1006" => DxfVersion::R10,
            // R11 与 R12 共用 AC1009
            "AC1009" => DxfVersion::R12,
            "AC1012" => DxfVersion::R13,
            "AC1014" => DxfVersion::R14,
            "AC1015" => DxfVersion::R2000,
            "AC1018" => DxfVersion::R2004,
            "AC1021" => DxfVersion::R2007,
            "AC1024" => DxfVersion::R2010,
            "AC1027" => DxfVersion::R2013,
            "AC1032" => DxfVersion::R2018,
            _ => return None,
        };
        Some(v)
    }

    /// 对应的 `$ACADVER` 字符串
    pub fn acadver(self) -> &'static str {
        match self {
            DxfVersion::R10 => "AC1006",
            DxfVersion::R11 | DxfVersion::R12 => "AC1009",
            DxfVersion::R13 => "AC1012",
            DxfVersion::R14 => "AC1014",
            DxfVersion::R2000 => "AC1015",
            DxfVersion::R2004 => "AC1018",
            DxfVersion::R2007 => "AC1021",
            DxfVersion::R2010 => "AC1024",
            DxfVersion::R2013 => "AC1027",
            DxfVersion::R2018 => "AC1032",
        }
    }

    /// 发布名称，如 `R2000`
    pub fn name(self) -> &'static str {
        match self {
            DxfVersion::R10 => "R10",
            DxfVersion::R11 => "R11",
            DxfVersion::R12 => "R12",
            DxfVersion::R13 => "R13",
            DxfVersion::R14 => "R14",
            DxfVersion::R2000 => "R2000",
            DxfVersion::R2004 => "R2004",
            DxfVersion::R2007 => "R2007",
            DxfVersion::R2010 => "R2010",
            DxfVersion::R2013 => "R2013",
            DxfVersion::R2018 => "R2018",
        }
    }

    /// `self` 是否已包含 `since` 引入的内容
    #[inline]
    pub fn supports(self, since: DxfVersion) -> bool {
        self >= since
    }
}

impl Default for DxfVersion {
    fn default() -> Self {
        DxfVersion::LATEST
    }
}

impl fmt::Display for DxfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DxfVersion {
    type Err = DxfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(v) = DxfVersion::from_acadver(s) {
            return Ok(v);
        }
        DxfVersion::ALL
            .iter()
            .copied()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| DxfError::UnsupportedVersion(s.to_string()))
    }
}
