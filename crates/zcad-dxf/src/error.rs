//! DXF 读写错误定义

use thiserror::Error;

use crate::schema::ValueKind;

#[derive(Error, Debug)]
pub enum DxfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected end of file at line {line}")]
    UnexpectedEof { line: usize },

    #[error("Invalid group code at line {line}: {text:?}")]
    InvalidGroupCode { line: usize, text: String },

    #[error("Unknown field `{field}` for record kind {kind}")]
    UnknownField { kind: String, field: String },

    #[error("Field `{field}` expects a {expected:?} value")]
    KindMismatch { field: String, expected: ValueKind },

    #[error("Field `{field}` contains a line break")]
    LineBreak { field: String },

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
}

impl DxfError {
    /// 是否为流级错误（会中止当前记录的读取）
    pub fn is_stream_error(&self) -> bool {
        matches!(
            self,
            DxfError::Io(_) | DxfError::UnexpectedEof { .. } | DxfError::InvalidGroupCode { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DxfError>;
