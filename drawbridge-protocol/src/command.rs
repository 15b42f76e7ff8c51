//! Typed command contract
//!
//! [`Command`] is the closed set of operations the bridge can ask a client to
//! perform. On the wire it becomes the `command`/`params` pair of a
//! [`CommandFrame`]; the client parses it back with [`Command::from_frame`].

use crate::frame::CommandFrame;
use crate::model::{Area, CustomType, DiagramImport, EnumType, Field, Note, Relationship, Table};
use crate::patch::{
    AreaUpdate, EnumUpdate, FieldUpdate, NoteUpdate, RelationshipUpdate, TableUpdate, TypeUpdate,
};
use drawbridge_common::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Every command name a client must support.
pub const COMMAND_NAMES: &[&str] = &[
    "addTable",
    "updateTable",
    "deleteTable",
    "addField",
    "updateField",
    "deleteField",
    "addRelationship",
    "updateRelationship",
    "deleteRelationship",
    "addArea",
    "updateArea",
    "deleteArea",
    "addNote",
    "updateNote",
    "deleteNote",
    "addEnum",
    "updateEnum",
    "deleteEnum",
    "addType",
    "updateType",
    "deleteType",
    "setDatabase",
    "getTables",
    "getTable",
    "getRelationships",
    "getAreas",
    "getNotes",
    "getEnums",
    "getTypes",
    "getDiagram",
    "importDiagram",
];

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "params", rename_all = "camelCase")]
pub enum Command {
    // Tables
    /// `data: None` asks the editor to create a default table and return it
    #[serde(rename_all = "camelCase")]
    AddTable {
        #[serde(default)]
        data: Option<Table>,
        #[serde(default = "default_true")]
        add_to_history: bool,
    },
    UpdateTable {
        id: String,
        updates: TableUpdate,
    },
    #[serde(rename_all = "camelCase")]
    DeleteTable {
        id: String,
        #[serde(default = "default_true")]
        add_to_history: bool,
    },

    // Fields
    #[serde(rename_all = "camelCase")]
    AddField { table_id: String, field: Field },
    #[serde(rename_all = "camelCase")]
    UpdateField {
        table_id: String,
        field_id: String,
        updates: FieldUpdate,
    },
    #[serde(rename_all = "camelCase")]
    DeleteField {
        table_id: String,
        field_id: String,
        #[serde(default = "default_true")]
        add_to_history: bool,
    },

    // Relationships
    #[serde(rename_all = "camelCase")]
    AddRelationship {
        data: Relationship,
        #[serde(default = "default_true")]
        add_to_history: bool,
    },
    UpdateRelationship {
        id: String,
        updates: RelationshipUpdate,
    },
    #[serde(rename_all = "camelCase")]
    DeleteRelationship {
        id: String,
        #[serde(default = "default_true")]
        add_to_history: bool,
    },

    // Areas, matched by id or name
    #[serde(rename_all = "camelCase")]
    AddArea {
        data: Area,
        #[serde(default = "default_true")]
        add_to_history: bool,
    },
    UpdateArea {
        id: String,
        updates: AreaUpdate,
    },
    #[serde(rename_all = "camelCase")]
    DeleteArea {
        id: String,
        #[serde(default = "default_true")]
        add_to_history: bool,
    },

    // Notes, matched by id or title
    #[serde(rename_all = "camelCase")]
    AddNote {
        data: Note,
        #[serde(default = "default_true")]
        add_to_history: bool,
    },
    UpdateNote {
        id: String,
        updates: NoteUpdate,
    },
    #[serde(rename_all = "camelCase")]
    DeleteNote {
        id: String,
        #[serde(default = "default_true")]
        add_to_history: bool,
    },

    // Enums
    #[serde(rename_all = "camelCase")]
    AddEnum {
        data: EnumType,
        #[serde(default = "default_true")]
        add_to_history: bool,
    },
    UpdateEnum {
        id: String,
        updates: EnumUpdate,
    },
    #[serde(rename_all = "camelCase")]
    DeleteEnum {
        id: String,
        #[serde(default = "default_true")]
        add_to_history: bool,
    },

    // Custom types
    #[serde(rename_all = "camelCase")]
    AddType {
        data: CustomType,
        #[serde(default = "default_true")]
        add_to_history: bool,
    },
    UpdateType {
        id: String,
        updates: TypeUpdate,
    },
    #[serde(rename_all = "camelCase")]
    DeleteType {
        id: String,
        #[serde(default = "default_true")]
        add_to_history: bool,
    },

    SetDatabase {
        database: String,
    },

    // Read-only queries
    GetTables {},
    /// Looked up by id first, then by name
    #[serde(rename_all = "camelCase")]
    GetTable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table_name: Option<String>,
    },
    GetRelationships {},
    GetAreas {},
    GetNotes {},
    GetEnums {},
    GetTypes {},
    GetDiagram {},

    /// Bulk replace of the document
    #[serde(rename_all = "camelCase")]
    ImportDiagram {
        diagram: DiagramImport,
        #[serde(default = "default_true")]
        clear_current: bool,
    },
}

impl Command {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddTable { .. } => "addTable",
            Command::UpdateTable { .. } => "updateTable",
            Command::DeleteTable { .. } => "deleteTable",
            Command::AddField { .. } => "addField",
            Command::UpdateField { .. } => "updateField",
            Command::DeleteField { .. } => "deleteField",
            Command::AddRelationship { .. } => "addRelationship",
            Command::UpdateRelationship { .. } => "updateRelationship",
            Command::DeleteRelationship { .. } => "deleteRelationship",
            Command::AddArea { .. } => "addArea",
            Command::UpdateArea { .. } => "updateArea",
            Command::DeleteArea { .. } => "deleteArea",
            Command::AddNote { .. } => "addNote",
            Command::UpdateNote { .. } => "updateNote",
            Command::DeleteNote { .. } => "deleteNote",
            Command::AddEnum { .. } => "addEnum",
            Command::UpdateEnum { .. } => "updateEnum",
            Command::DeleteEnum { .. } => "deleteEnum",
            Command::AddType { .. } => "addType",
            Command::UpdateType { .. } => "updateType",
            Command::DeleteType { .. } => "deleteType",
            Command::SetDatabase { .. } => "setDatabase",
            Command::GetTables {} => "getTables",
            Command::GetTable { .. } => "getTable",
            Command::GetRelationships {} => "getRelationships",
            Command::GetAreas {} => "getAreas",
            Command::GetNotes {} => "getNotes",
            Command::GetEnums {} => "getEnums",
            Command::GetTypes {} => "getTypes",
            Command::GetDiagram {} => "getDiagram",
            Command::ImportDiagram { .. } => "importDiagram",
        }
    }

    /// True for queries that never mutate the document.
    pub fn is_read_only(&self) -> bool {
        self.name().starts_with("get")
    }

    /// Build the command frame sent on the wire.
    pub fn into_frame(self, id: impl Into<String>) -> Result<CommandFrame> {
        let name = self.name();
        let mut tagged = serde_json::to_value(self)?;
        let params = tagged
            .get_mut("params")
            .map_or_else(|| json!({}), Value::take);
        Ok(CommandFrame {
            id: id.into(),
            command: name.to_string(),
            params,
        })
    }

    /// Parse a received command frame.
    ///
    /// Names outside [`COMMAND_NAMES`] yield [`BridgeError::UnknownCommand`];
    /// params that do not fit the command yield [`BridgeError::MalformedFrame`].
    pub fn from_frame(frame: &CommandFrame) -> Result<Self> {
        Self::from_parts(&frame.command, frame.params.clone())
    }

    pub fn from_parts(name: &str, params: Value) -> Result<Self> {
        if !COMMAND_NAMES.contains(&name) {
            return Err(BridgeError::UnknownCommand(name.to_string()));
        }
        let params = if params.is_null() { json!({}) } else { params };
        serde_json::from_value(json!({ "command": name, "params": params }))
            .map_err(|e| BridgeError::MalformedFrame(format!("invalid params for {name}: {e}")))
    }
}
