//! In-memory diagram document
//!
//! Behaves like the editor's stores: ids are generated when missing, deleting
//! a table or field drops the relationships pointing at it, and mutations
//! flagged `add_to_history` are appended to an undo log.

use super::document::{DiagramDocument, DocumentError, DocumentResult};
use drawbridge_protocol::{
    Area, AreaUpdate, CustomType, Diagram, DiagramImport, EnumType, EnumUpdate, Field,
    FieldUpdate, Note, NoteUpdate, Relationship, RelationshipUpdate, Table, TableUpdate,
    TypeUpdate,
};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Position of tables created without explicit data
const DEFAULT_TABLE_POSITION: f64 = 100.0;

/// One undoable mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub action: &'static str,
    pub target: String,
}

#[derive(Debug, Default)]
struct State {
    diagram: Diagram,
    history: Vec<HistoryEntry>,
}

impl State {
    fn record(&mut self, add_to_history: bool, action: &'static str, target: &str) {
        if add_to_history {
            self.history.push(HistoryEntry {
                action,
                target: target.to_string(),
            });
        }
    }

    fn table_mut(&mut self, id: &str) -> DocumentResult<&mut Table> {
        self.diagram
            .tables
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| DocumentError::not_found("Table", id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryDiagram {
    state: RwLock<State>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn ensure_id(id: &mut String) {
    if id.is_empty() {
        *id = new_id();
    }
}

fn default_table(index: usize) -> Table {
    Table {
        id: new_id(),
        name: format!("table_{index}"),
        x: DEFAULT_TABLE_POSITION,
        y: DEFAULT_TABLE_POSITION,
        fields: vec![Field {
            id: new_id(),
            name: "id".to_string(),
            data_type: "INTEGER".to_string(),
            primary: true,
            unique: true,
            not_null: true,
            increment: true,
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// Remove the first element matching `pred`, or fail with `err`.
fn remove_where<T>(
    items: &mut Vec<T>,
    pred: impl Fn(&T) -> bool,
    err: impl FnOnce() -> DocumentError,
) -> DocumentResult<T> {
    match items.iter().position(pred) {
        Some(index) => Ok(items.remove(index)),
        None => Err(err()),
    }
}

fn find_mut<T>(
    items: &mut [T],
    pred: impl Fn(&T) -> bool,
    err: impl FnOnce() -> DocumentError,
) -> DocumentResult<&mut T> {
    items.iter_mut().find(|item| pred(item)).ok_or_else(err)
}

impl MemoryDiagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diagram(diagram: Diagram) -> Self {
        Self {
            state: RwLock::new(State {
                diagram,
                history: Vec::new(),
            }),
        }
    }

    /// Mutations recorded for undo, oldest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.read().history.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DiagramDocument for MemoryDiagram {
    fn add_table(&self, data: Option<Table>, add_to_history: bool) -> DocumentResult<Table> {
        let mut state = self.write();
        let table = match data {
            Some(mut table) => {
                ensure_id(&mut table.id);
                for field in &mut table.fields {
                    ensure_id(&mut field.id);
                }
                table
            }
            None => default_table(state.diagram.tables.len()),
        };
        if state.diagram.tables.iter().any(|t| t.id == table.id) {
            return Err(DocumentError::Invalid(format!(
                "Table {} already exists",
                table.id
            )));
        }
        state.diagram.tables.push(table.clone());
        state.record(add_to_history, "addTable", &table.id);
        Ok(table)
    }

    fn update_table(&self, id: &str, updates: TableUpdate) -> DocumentResult<()> {
        let mut state = self.write();
        updates.apply_to(state.table_mut(id)?);
        Ok(())
    }

    fn delete_table(&self, id: &str, add_to_history: bool) -> DocumentResult<()> {
        let mut state = self.write();
        remove_where(
            &mut state.diagram.tables,
            |t| t.id == id,
            || DocumentError::not_found("Table", id),
        )?;
        state
            .diagram
            .relationships
            .retain(|r| r.start_table_id != id && r.end_table_id != id);
        state.record(add_to_history, "deleteTable", id);
        Ok(())
    }

    fn add_field(&self, table_id: &str, mut field: Field) -> DocumentResult<()> {
        let mut state = self.write();
        ensure_id(&mut field.id);
        state.table_mut(table_id)?.fields.push(field);
        Ok(())
    }

    fn update_field(
        &self,
        table_id: &str,
        field_id: &str,
        updates: FieldUpdate,
    ) -> DocumentResult<()> {
        let mut state = self.write();
        let table = state.table_mut(table_id)?;
        let field = find_mut(
            &mut table.fields,
            |f| f.id == field_id,
            || DocumentError::not_found("Field", field_id),
        )?;
        updates.apply_to(field);
        Ok(())
    }

    fn delete_field(
        &self,
        table_id: &str,
        field_id: &str,
        add_to_history: bool,
    ) -> DocumentResult<()> {
        let mut state = self.write();
        let table = state.table_mut(table_id)?;
        remove_where(
            &mut table.fields,
            |f| f.id == field_id,
            || DocumentError::not_found("Field", field_id),
        )?;
        state.diagram.relationships.retain(|r| {
            !(r.start_table_id == table_id && r.start_field_id == field_id)
                && !(r.end_table_id == table_id && r.end_field_id == field_id)
        });
        state.record(add_to_history, "deleteField", field_id);
        Ok(())
    }

    fn add_relationship(&self, mut data: Relationship, add_to_history: bool) -> DocumentResult<()> {
        let mut state = self.write();
        for (table_id, field_id) in [
            (&data.start_table_id, &data.start_field_id),
            (&data.end_table_id, &data.end_field_id),
        ] {
            let table = state
                .diagram
                .tables
                .iter()
                .find(|t| &t.id == table_id)
                .ok_or_else(|| DocumentError::not_found("Table", table_id.as_str()))?;
            if table.field(field_id).is_none() {
                return Err(DocumentError::not_found("Field", field_id.as_str()));
            }
        }
        ensure_id(&mut data.id);
        state.record(add_to_history, "addRelationship", &data.id);
        state.diagram.relationships.push(data);
        Ok(())
    }

    fn update_relationship(&self, id: &str, updates: RelationshipUpdate) -> DocumentResult<()> {
        let mut state = self.write();
        let relationship = find_mut(
            &mut state.diagram.relationships,
            |r| r.id == id,
            || DocumentError::not_found("Relationship", id),
        )?;
        updates.apply_to(relationship);
        Ok(())
    }

    fn delete_relationship(&self, id: &str, add_to_history: bool) -> DocumentResult<()> {
        let mut state = self.write();
        remove_where(
            &mut state.diagram.relationships,
            |r| r.id == id,
            || DocumentError::not_found("Relationship", id),
        )?;
        state.record(add_to_history, "deleteRelationship", id);
        Ok(())
    }

    fn add_area(&self, mut data: Area, add_to_history: bool) -> DocumentResult<()> {
        let mut state = self.write();
        ensure_id(&mut data.id);
        state.record(add_to_history, "addArea", &data.id);
        state.diagram.areas.push(data);
        Ok(())
    }

    fn update_area(&self, key: &str, updates: AreaUpdate) -> DocumentResult<()> {
        let mut state = self.write();
        let area = find_mut(
            &mut state.diagram.areas,
            |a| a.name == key || a.id == key,
            || DocumentError::no_match("Area", key),
        )?;
        updates.apply_to(area);
        Ok(())
    }

    fn delete_area(&self, key: &str, add_to_history: bool) -> DocumentResult<()> {
        let mut state = self.write();
        let area = remove_where(
            &mut state.diagram.areas,
            |a| a.name == key || a.id == key,
            || DocumentError::no_match("Area", key),
        )?;
        state.record(add_to_history, "deleteArea", &area.id);
        Ok(())
    }

    fn add_note(&self, mut data: Note, add_to_history: bool) -> DocumentResult<()> {
        let mut state = self.write();
        ensure_id(&mut data.id);
        state.record(add_to_history, "addNote", &data.id);
        state.diagram.notes.push(data);
        Ok(())
    }

    fn update_note(&self, key: &str, updates: NoteUpdate) -> DocumentResult<()> {
        let mut state = self.write();
        let note = find_mut(
            &mut state.diagram.notes,
            |n| n.title == key || n.id == key,
            || DocumentError::no_match("Note", key),
        )?;
        updates.apply_to(note);
        Ok(())
    }

    fn delete_note(&self, key: &str, add_to_history: bool) -> DocumentResult<()> {
        let mut state = self.write();
        let note = remove_where(
            &mut state.diagram.notes,
            |n| n.title == key || n.id == key,
            || DocumentError::no_match("Note", key),
        )?;
        state.record(add_to_history, "deleteNote", &note.id);
        Ok(())
    }

    fn add_enum(&self, mut data: EnumType, add_to_history: bool) -> DocumentResult<()> {
        let mut state = self.write();
        ensure_id(&mut data.id);
        state.record(add_to_history, "addEnum", &data.id);
        state.diagram.enums.push(data);
        Ok(())
    }

    fn update_enum(&self, id: &str, updates: EnumUpdate) -> DocumentResult<()> {
        let mut state = self.write();
        let item = find_mut(
            &mut state.diagram.enums,
            |e| e.id == id,
            || DocumentError::not_found("Enum", id),
        )?;
        updates.apply_to(item);
        Ok(())
    }

    fn delete_enum(&self, id: &str, add_to_history: bool) -> DocumentResult<()> {
        let mut state = self.write();
        remove_where(
            &mut state.diagram.enums,
            |e| e.id == id,
            || DocumentError::not_found("Enum", id),
        )?;
        state.record(add_to_history, "deleteEnum", id);
        Ok(())
    }

    fn add_type(&self, mut data: CustomType, add_to_history: bool) -> DocumentResult<()> {
        let mut state = self.write();
        ensure_id(&mut data.id);
        state.record(add_to_history, "addType", &data.id);
        state.diagram.types.push(data);
        Ok(())
    }

    fn update_type(&self, id: &str, updates: TypeUpdate) -> DocumentResult<()> {
        let mut state = self.write();
        let item = find_mut(
            &mut state.diagram.types,
            |t| t.id == id,
            || DocumentError::not_found("Type", id),
        )?;
        updates.apply_to(item);
        Ok(())
    }

    fn delete_type(&self, id: &str, add_to_history: bool) -> DocumentResult<()> {
        let mut state = self.write();
        remove_where(
            &mut state.diagram.types,
            |t| t.id == id,
            || DocumentError::not_found("Type", id),
        )?;
        state.record(add_to_history, "deleteType", id);
        Ok(())
    }

    fn set_database(&self, database: &str) -> DocumentResult<()> {
        if database.trim().is_empty() {
            return Err(DocumentError::Invalid(
                "Database type must not be empty".into(),
            ));
        }
        self.write().diagram.database = database.to_string();
        Ok(())
    }

    fn tables(&self) -> Vec<Table> {
        self.read().diagram.tables.clone()
    }

    fn relationships(&self) -> Vec<Relationship> {
        self.read().diagram.relationships.clone()
    }

    fn areas(&self) -> Vec<Area> {
        self.read().diagram.areas.clone()
    }

    fn notes(&self) -> Vec<Note> {
        self.read().diagram.notes.clone()
    }

    fn enums(&self) -> Vec<EnumType> {
        self.read().diagram.enums.clone()
    }

    fn types(&self) -> Vec<CustomType> {
        self.read().diagram.types.clone()
    }

    fn diagram(&self) -> Diagram {
        self.read().diagram.clone()
    }

    fn import_diagram(&self, diagram: DiagramImport, clear_current: bool) -> DocumentResult<()> {
        let mut state = self.write();
        let current = &mut state.diagram;
        if clear_current {
            current.tables.clear();
            current.relationships.clear();
            current.areas.clear();
            current.notes.clear();
            current.enums.clear();
            current.types.clear();
        }

        if let Some(database) = diagram.database.filter(|d| !d.is_empty()) {
            current.database = database;
        }
        if let Some(tables) = diagram.tables {
            current.tables = tables;
        }
        if let Some(relationships) = diagram.relationships {
            current.relationships = relationships;
        }
        if let Some(areas) = diagram.areas {
            current.areas = areas;
        }
        if let Some(notes) = diagram.notes {
            current.notes = notes;
        }
        if let Some(enums) = diagram.enums {
            current.enums = enums;
        }
        if let Some(types) = diagram.types {
            current.types = types;
        }
        Ok(())
    }
}
