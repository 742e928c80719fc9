//! ZCAD DXF 标签流读写
//!
//! DXF 中的每个结构单元（表项、实体、对象）都是一串有序的
//! （组码, 值）对，以组码 0 结束。本 crate 用一套通用引擎处理这一模式：
//! - [`scanner`]：两行一组读取组码-值对
//! - [`schema`]：每种记录的组码 → 字段槽位表，带版本门控
//! - [`reader`] / [`writer`]：按模式表通用地读写记录
//! - [`chain`]：跨多个标签对的续行字段
//! - [`list`]：同类记录的有序链表
//!
//! 具体的记录字段表只是配置数据，见 [`schemas`]。
//!
//! # 示例
//!
//! ```rust
//! use std::io::Cursor;
//! use zcad_dxf::prelude::*;
//!
//! let schema = zcad_dxf::schemas::appid().unwrap();
//! let config = DxfConfig::default();
//!
//! let mut scanner = TagScanner::new(Cursor::new("5\n1A\n2\nFLOOR1\n70\n0\n0\n"));
//! let mut reader = RecordReader::new(&config, DxfVersion::R12);
//! let record = reader.read_new(&mut scanner, &schema).unwrap();
//! assert_eq!(record.id_code, 26);
//! assert_eq!(record.str("name"), Some("FLOOR1"));
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod list;
pub mod reader;
pub mod record;
pub mod scanner;
pub mod schema;
pub mod schemas;
pub mod table;
pub mod version;
pub mod writer;
pub mod xdata;

pub use error::DxfError;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::chain::Chain;
    pub use crate::config::{DxfConfig, GatedFieldPolicy};
    pub use crate::error::DxfError;
    pub use crate::list::RecordList;
    pub use crate::reader::{Diagnostic, RecordReader};
    pub use crate::record::{Point3, Record, Value};
    pub use crate::scanner::{DxfPair, TagScanner};
    pub use crate::schema::{FieldDef, Fixup, Schema, SchemaBuilder, ValueKind};
    pub use crate::schemas::SchemaCatalogue;
    pub use crate::table::{Table, TableReport};
    pub use crate::version::DxfVersion;
    pub use crate::writer::{RecordWriter, SkipReason, TagWriter, WriteOutcome};
    pub use crate::xdata::{XDataGroup, XDataValue};
}
