//! Typed helpers over [`CommandBridge`] for the tool layer.
//!
//! Each method sends one command and deserialises the returned `data`.

use drawbridge_common::{BridgeError, Result};
use drawbridge_core::CommandBridge;
use drawbridge_protocol::{
    Area, AreaUpdate, Command, CustomType, Diagram, DiagramImport, EnumType, EnumUpdate, Field,
    FieldUpdate, Note, NoteUpdate, Relationship, RelationshipUpdate, Table, TableUpdate,
    TypeUpdate,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A diagram editor reached through the bridge
#[derive(Debug, Clone)]
pub struct RemoteDiagram {
    bridge: CommandBridge,
}

fn decode<T: DeserializeOwned>(command: &str, data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| {
        BridgeError::Serialization(format!("unexpected data for {command}: {e}"))
    })
}

impl RemoteDiagram {
    pub fn new(bridge: CommandBridge) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &CommandBridge {
        &self.bridge
    }

    pub fn is_connected(&self) -> bool {
        self.bridge.is_connected()
    }

    async fn query<T: DeserializeOwned>(&self, command: Command) -> Result<T> {
        let name = command.name();
        let data = self.bridge.send_command(command).await?;
        decode(name, data)
    }

    async fn run(&self, command: Command) -> Result<()> {
        self.bridge.send_command(command).await.map(drop)
    }

    pub async fn get_diagram(&self) -> Result<Diagram> {
        self.query(Command::GetDiagram {}).await
    }

    pub async fn get_tables(&self) -> Result<Vec<Table>> {
        self.query(Command::GetTables {}).await
    }

    /// Look a table up by id, falling back to name when no id is given
    pub async fn get_table(
        &self,
        table_id: Option<String>,
        table_name: Option<String>,
    ) -> Result<Table> {
        self.query(Command::GetTable {
            table_id,
            table_name,
        })
        .await
    }

    pub async fn get_table_by_id(&self, table_id: impl Into<String>) -> Result<Table> {
        self.query(Command::GetTable {
            table_id: Some(table_id.into()),
            table_name: None,
        })
        .await
    }

    pub async fn get_table_by_name(&self, table_name: impl Into<String>) -> Result<Table> {
        self.query(Command::GetTable {
            table_id: None,
            table_name: Some(table_name.into()),
        })
        .await
    }

    pub async fn get_relationships(&self) -> Result<Vec<Relationship>> {
        self.query(Command::GetRelationships {}).await
    }

    pub async fn get_areas(&self) -> Result<Vec<Area>> {
        self.query(Command::GetAreas {}).await
    }

    pub async fn get_notes(&self) -> Result<Vec<Note>> {
        self.query(Command::GetNotes {}).await
    }

    pub async fn get_enums(&self) -> Result<Vec<EnumType>> {
        self.query(Command::GetEnums {}).await
    }

    pub async fn get_types(&self) -> Result<Vec<CustomType>> {
        self.query(Command::GetTypes {}).await
    }

    /// Add a table; `None` lets the editor create a default one. Returns the
    /// stored table.
    pub async fn add_table(&self, data: Option<Table>) -> Result<Table> {
        self.query(Command::AddTable {
            data,
            add_to_history: true,
        })
        .await
    }

    pub async fn update_table(&self, id: impl Into<String>, updates: TableUpdate) -> Result<()> {
        self.run(Command::UpdateTable {
            id: id.into(),
            updates,
        })
        .await
    }

    pub async fn delete_table(&self, id: impl Into<String>) -> Result<()> {
        self.run(Command::DeleteTable {
            id: id.into(),
            add_to_history: true,
        })
        .await
    }

    pub async fn add_field(&self, table_id: impl Into<String>, field: Field) -> Result<()> {
        self.run(Command::AddField {
            table_id: table_id.into(),
            field,
        })
        .await
    }

    pub async fn update_field(
        &self,
        table_id: impl Into<String>,
        field_id: impl Into<String>,
        updates: FieldUpdate,
    ) -> Result<()> {
        self.run(Command::UpdateField {
            table_id: table_id.into(),
            field_id: field_id.into(),
            updates,
        })
        .await
    }

    pub async fn delete_field(
        &self,
        table_id: impl Into<String>,
        field_id: impl Into<String>,
    ) -> Result<()> {
        self.run(Command::DeleteField {
            table_id: table_id.into(),
            field_id: field_id.into(),
            add_to_history: true,
        })
        .await
    }

    pub async fn add_relationship(&self, data: Relationship) -> Result<()> {
        self.run(Command::AddRelationship {
            data,
            add_to_history: true,
        })
        .await
    }

    pub async fn update_relationship(
        &self,
        id: impl Into<String>,
        updates: RelationshipUpdate,
    ) -> Result<()> {
        self.run(Command::UpdateRelationship {
            id: id.into(),
            updates,
        })
        .await
    }

    pub async fn delete_relationship(&self, id: impl Into<String>) -> Result<()> {
        self.run(Command::DeleteRelationship {
            id: id.into(),
            add_to_history: true,
        })
        .await
    }

    pub async fn add_area(&self, data: Area) -> Result<()> {
        self.run(Command::AddArea {
            data,
            add_to_history: true,
        })
        .await
    }

    /// `key` is the area id or name
    pub async fn update_area(&self, key: impl Into<String>, updates: AreaUpdate) -> Result<()> {
        self.run(Command::UpdateArea {
            id: key.into(),
            updates,
        })
        .await
    }

    pub async fn delete_area(&self, key: impl Into<String>) -> Result<()> {
        self.run(Command::DeleteArea {
            id: key.into(),
            add_to_history: true,
        })
        .await
    }

    pub async fn add_note(&self, data: Note) -> Result<()> {
        self.run(Command::AddNote {
            data,
            add_to_history: true,
        })
        .await
    }

    /// `key` is the note id or title
    pub async fn update_note(&self, key: impl Into<String>, updates: NoteUpdate) -> Result<()> {
        self.run(Command::UpdateNote {
            id: key.into(),
            updates,
        })
        .await
    }

    pub async fn delete_note(&self, key: impl Into<String>) -> Result<()> {
        self.run(Command::DeleteNote {
            id: key.into(),
            add_to_history: true,
        })
        .await
    }

    pub async fn add_enum(&self, data: EnumType) -> Result<()> {
        self.run(Command::AddEnum {
            data,
            add_to_history: true,
        })
        .await
    }

    pub async fn update_enum(&self, id: impl Into<String>, updates: EnumUpdate) -> Result<()> {
        self.run(Command::UpdateEnum {
            id: id.into(),
            updates,
        })
        .await
    }

    pub async fn delete_enum(&self, id: impl Into<String>) -> Result<()> {
        self.run(Command::DeleteEnum {
            id: id.into(),
            add_to_history: true,
        })
        .await
    }

    pub async fn add_type(&self, data: CustomType) -> Result<()> {
        self.run(Command::AddType {
            data,
            add_to_history: true,
        })
        .await
    }

    pub async fn update_type(&self, id: impl Into<String>, updates: TypeUpdate) -> Result<()> {
        self.run(Command::UpdateType {
            id: id.into(),
            updates,
        })
        .await
    }

    pub async fn delete_type(&self, id: impl Into<String>) -> Result<()> {
        self.run(Command::DeleteType {
            id: id.into(),
            add_to_history: true,
        })
        .await
    }

    pub async fn set_database(&self, database: impl Into<String>) -> Result<()> {
        self.run(Command::SetDatabase {
            database: database.into(),
        })
        .await
    }

    /// Replace the editor's diagram. With `clear_current` every section is
    /// emptied first; otherwise only the sections present are overwritten.
    pub async fn import_diagram(
        &self,
        diagram: impl Into<DiagramImport>,
        clear_current: bool,
    ) -> Result<()> {
        self.run(Command::ImportDiagram {
            diagram: diagram.into(),
            clear_current,
        })
        .await
    }
}
