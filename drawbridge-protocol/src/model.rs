//! Diagram document model as exchanged on the wire
//!
//! All types use camelCase field names and tolerate unknown fields so newer
//! editors can add properties without breaking older bridges.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default table colour used by the editor.
pub const DEFAULT_TABLE_COLOR: &str = "#175e7a";

/// A column of a table or of a custom type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub primary: bool,
    pub unique: bool,
    pub not_null: bool,
    pub increment: bool,
    pub default: String,
    pub check: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub locked: bool,
    pub fields: Vec<Field>,
    pub comment: String,
    pub indices: Vec<Value>,
    pub color: String,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            x: 0.0,
            y: 0.0,
            locked: false,
            fields: Vec::new(),
            comment: String::new(),
            indices: Vec::new(),
            color: DEFAULT_TABLE_COLOR.to_string(),
        }
    }
}

impl Table {
    /// Look up a field by id.
    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == field_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    #[default]
    OneToMany,
    ManyToOne,
}

/// Referential action on update/delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    #[default]
    #[serde(rename = "No action")]
    NoAction,
    Restrict,
    Cascade,
    #[serde(rename = "Set null")]
    SetNull,
    #[serde(rename = "Set default")]
    SetDefault,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Relationship {
    pub id: String,
    pub name: String,
    pub start_table_id: String,
    pub start_field_id: String,
    pub end_table_id: String,
    pub end_field_id: String,
    pub cardinality: Cardinality,
    pub update_constraint: Constraint,
    pub delete_constraint: Constraint,
}

/// A coloured rectangle grouping tables on the canvas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Area {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnumType {
    pub id: String,
    pub name: String,
    pub values: Vec<String>,
}

/// User-defined composite type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomType {
    pub id: String,
    pub name: String,
    pub fields: Vec<Field>,
}

/// Full diagram snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Diagram {
    pub database: String,
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
    pub areas: Vec<Area>,
    pub notes: Vec<Note>,
    pub enums: Vec<EnumType>,
    pub types: Vec<CustomType>,
}

/// Diagram payload for `importDiagram`: only the sections present are applied
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagramImport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<Table>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<Relationship>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub areas: Option<Vec<Area>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<Note>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enums: Option<Vec<EnumType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<CustomType>>,
}

impl From<Diagram> for DiagramImport {
    fn from(diagram: Diagram) -> Self {
        Self {
            database: Some(diagram.database),
            tables: Some(diagram.tables),
            relationships: Some(diagram.relationships),
            areas: Some(diagram.areas),
            notes: Some(diagram.notes),
            enums: Some(diagram.enums),
            types: Some(diagram.types),
        }
    }
}
