//! 内置模式表
//!
//! 常用表项与实体的字段表。它们只是交给通用读写器的配置数据，
//! 其他记录类型可以用 [`SchemaBuilder`] 按同样方式补充。

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::record::Point3;
use crate::schema::{FieldDef, Fixup, Schema, SchemaBuilder, ValueKind};
use crate::version::DxfVersion;

use DxfVersion::*;
use ValueKind::*;

/// 表头（`0 / TABLE`）
pub const TABLE: &str = "TABLE";

/// 所有表项、实体共有的前导：句柄、反应器、扩展字典、所属对象
fn owned(kind: &str) -> SchemaBuilder {
    SchemaBuilder::new(kind)
        .id(5)
        .reactors(FieldDef::new("dictionary_owner_soft", 330, Handle))
        .xdictionary(FieldDef::new("dictionary_owner_hard", 360, Handle))
        .field(FieldDef::new("object_owner_soft", 330, Handle).since(R13))
}

fn table_record(kind: &str, subclass: &'static str) -> SchemaBuilder {
    owned(kind)
        .subclass("AcDbSymbolTableRecord")
        .subclass(subclass)
        .field(FieldDef::new("name", 2, Str).required())
        .field(FieldDef::new("flags", 70, Int16))
}

/// 实体公共字段（AcDbEntity）
fn entity(kind: &str) -> SchemaBuilder {
    owned(kind)
        .subclass("AcDbEntity")
        .field(FieldDef::new("paperspace", 67, Int16).optional().range(0.0, 1.0))
        .field(FieldDef::new("layer", 8, Str).fixup(Fixup::DefaultLayer))
        .field(FieldDef::new("linetype", 6, Str).fixup(Fixup::DefaultLinetype))
        .field(FieldDef::new("material", 347, Handle).since(R2007))
        .field(
            FieldDef::new("color", 62, Int16)
                .default_value(256)
                .range(0.0, 257.0),
        )
        .field(
            FieldDef::new("lineweight", 370, Int16)
                .since(R2000)
                .default_value(-1)
                .range(-3.0, 211.0),
        )
        .field(
            FieldDef::new("linetype_scale", 48, Double)
                .since(R13)
                .default_value(1.0),
        )
        .field(
            FieldDef::new("visibility", 60, Int16)
                .since(R13)
                .optional()
                .range(0.0, 1.0),
        )
        .proxy_graphics(
            FieldDef::new("proxy_graphics_size", 92, Int32).since(R2000),
            FieldDef::new("proxy_graphics", 310, Str).since(R2000),
        )
        .alias(160, "proxy_graphics_size")
        .field(
            FieldDef::new("color24", 420, Int32)
                .since(R2004)
                .default_value(-1)
                .optional(),
        )
        .field(FieldDef::new("color_name", 430, Str).since(R2004).optional())
        .field(FieldDef::new("transparency", 440, Int32).since(R2004).optional())
        .field(FieldDef::new("plot_style_name", 390, Handle).since(R2007))
        .field(FieldDef::new("shadow_mode", 284, Int16).since(R2007).optional())
}

fn extrusion() -> FieldDef {
    FieldDef::new("extrusion", 210, Point)
        .default_value(Point3::new(0.0, 0.0, 1.0))
        .optional()
}

fn thickness() -> FieldDef {
    FieldDef::new("thickness", 39, Double).optional()
}

/// 表头
pub fn table_header() -> Result<Arc<Schema>> {
    SchemaBuilder::new(TABLE)
        .field(FieldDef::new("name", 2, Str).required())
        .id(5)
        .xdictionary(FieldDef::new("dictionary_owner_hard", 360, Handle))
        .field(FieldDef::new("object_owner_soft", 330, Handle).since(R13))
        .subclass("AcDbSymbolTable")
        .field(FieldDef::new("max_entries", 70, Int16))
        .build()
}

pub fn appid() -> Result<Arc<Schema>> {
    table_record("APPID", "AcDbRegAppTableRecord").build()
}

pub fn layer() -> Result<Arc<Schema>> {
    table_record("LAYER", "AcDbLayerTableRecord")
        .field(
            FieldDef::new("color", 62, Int16)
                .default_value(7)
                .range(-256.0, 256.0),
        )
        .field(FieldDef::new("linetype", 6, Str).fixup(Fixup::DefaultLinetype))
        .field(FieldDef::new("plotting_flag", 290, Bool).since(R2000).default_value(1))
        .field(
            FieldDef::new("lineweight", 370, Int16)
                .since(R2000)
                .default_value(-3)
                .range(-3.0, 211.0),
        )
        .field(FieldDef::new("plot_style_name", 390, Handle).since(R2000))
        .field(FieldDef::new("material", 347, Handle).since(R2007))
        .build()
}

pub fn ltype() -> Result<Arc<Schema>> {
    table_record("LTYPE", "AcDbLinetypeTableRecord")
        .field(FieldDef::new("description", 3, Str))
        .field(FieldDef::new("alignment", 72, Int16).default_value(65))
        .field(FieldDef::new("element_count", 73, Int16))
        .field(FieldDef::new("pattern_length", 40, Double))
        .field(FieldDef::new("dash_lengths", 49, Double).chain())
        .build()
}

pub fn style() -> Result<Arc<Schema>> {
    table_record("STYLE", "AcDbTextStyleTableRecord")
        .field(FieldDef::new("height", 40, Double))
        .field(FieldDef::new("width_factor", 41, Double).default_value(1.0))
        .field(FieldDef::new("oblique_angle", 50, Double))
        .field(FieldDef::new("generation_flags", 71, Int16))
        .field(FieldDef::new("last_height", 42, Double).default_value(2.5))
        .field(FieldDef::new("font_file", 3, Str).default_value("txt"))
        .field(FieldDef::new("big_font_file", 4, Str).optional())
        .build()
}

pub fn block_record() -> Result<Arc<Schema>> {
    owned("BLOCK_RECORD")
        .since(R13)
        .subclass("AcDbSymbolTableRecord")
        .subclass("AcDbBlockTableRecord")
        .field(FieldDef::new("name", 2, Str).required())
        .field(FieldDef::new("layout", 340, Handle).since(R2000))
        .field(FieldDef::new("insert_units", 70, Int16).since(R2007))
        .field(FieldDef::new("explodability", 280, Int16).since(R2007).default_value(1))
        .field(FieldDef::new("scalability", 281, Int16).since(R2007))
        .field(FieldDef::new("preview", 310, Str).since(R2000).chain())
        .build()
}

pub fn line() -> Result<Arc<Schema>> {
    entity("LINE")
        .subclass("AcDbLine")
        .field(thickness())
        .field(FieldDef::new("start", 10, Point))
        .field(FieldDef::new("end", 11, Point))
        .field(extrusion())
        .build()
}

pub fn point() -> Result<Arc<Schema>> {
    entity("POINT")
        .subclass("AcDbPoint")
        .field(FieldDef::new("location", 10, Point))
        .field(thickness())
        .field(extrusion())
        .field(FieldDef::new("x_axis_angle", 50, Double).optional())
        .build()
}

pub fn circle() -> Result<Arc<Schema>> {
    entity("CIRCLE")
        .subclass("AcDbCircle")
        .field(thickness())
        .field(FieldDef::new("center", 10, Point))
        .field(FieldDef::new("radius", 40, Double).default_value(1.0))
        .field(extrusion())
        .build()
}

/// 按记录类型名索引的模式表集合
#[derive(Debug, Default, Clone)]
pub struct SchemaCatalogue {
    schemas: HashMap<String, Arc<Schema>>,
}

impl SchemaCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置表项和实体模式
    pub fn builtin() -> Result<Self> {
        let mut catalogue = Self::new();
        for schema in [
            table_header()?,
            appid()?,
            layer()?,
            ltype()?,
            style()?,
            block_record()?,
            line()?,
            point()?,
            circle()?,
        ] {
            catalogue.insert(schema);
        }
        Ok(catalogue)
    }

    pub fn insert(&mut self, schema: Arc<Schema>) {
        self.schemas.insert(schema.kind().to_string(), schema);
    }

    pub fn get(&self, kind: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(kind)
    }

    /// 已登记的记录类型名（排序）
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}
