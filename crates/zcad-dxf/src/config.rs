//! 读写配置
//!
//! 默认线型、默认图层等作为显式配置传入读写器，不使用全局状态。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 读取到高于流版本的字段时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatedFieldPolicy {
    /// 告警后仍保留（兼容宽松的生成器）
    #[default]
    Keep,
    /// 告警后丢弃
    Discard,
}

/// DXF 读写配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DxfConfig {
    /// 线型为空时使用的默认线型
    pub default_linetype: String,
    /// 图层为空时使用的默认图层
    pub default_layer: String,
    /// 版本门控字段的读取策略
    pub gated_fields: GatedFieldPolicy,
    /// 读取后把越界数值重置为初始值
    pub fix_illegal_values: bool,
}

impl Default for DxfConfig {
    fn default() -> Self {
        Self {
            default_linetype: "CONTINUOUS".to_string(),
            default_layer: "0".to_string(),
            gated_fields: GatedFieldPolicy::Keep,
            fix_illegal_values: true,
        }
    }
}

impl DxfConfig {
    /// 从 JSON 文本解析，缺省项取默认值
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json() {
        let config = DxfConfig::from_json(r#"{ "default_layer": "BASE" }"#).unwrap();
        assert_eq!(config.default_layer, "BASE");
        assert_eq!(config.default_linetype, "CONTINUOUS");
        assert_eq!(config.gated_fields, GatedFieldPolicy::Keep);
        assert!(config.fix_illegal_values);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "gated_fields": "discard", "fix_illegal_values": false }}"#).unwrap();

        let config = DxfConfig::load(file.path()).unwrap();
        assert_eq!(config.gated_fields, GatedFieldPolicy::Discard);
        assert!(!config.fix_illegal_values);
    }

    #[test]
    fn test_invalid_json() {
        assert!(DxfConfig::from_json("{ not json").is_err());
    }
}
