//! The document capability the client dispatches commands to

use drawbridge_protocol::{
    Area, AreaUpdate, CustomType, Diagram, DiagramImport, EnumType, EnumUpdate, Field,
    FieldUpdate, Note, NoteUpdate, Relationship, RelationshipUpdate, Table, TableUpdate,
    TypeUpdate,
};
use thiserror::Error;

/// Errors raised by a document operation. The display text becomes the
/// `error` of the failed response frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Lookup by id or name matched nothing
    #[error("{kind} not found: {key}")]
    NoMatch { kind: &'static str, key: String },

    #[error("{0}")]
    Invalid(String),
}

impl DocumentError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        DocumentError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn no_match(kind: &'static str, key: impl Into<String>) -> Self {
        DocumentError::NoMatch {
            kind,
            key: key.into(),
        }
    }
}

pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

/// A diagram the remote-control client can mutate and query.
///
/// Implementations use interior mutability; the client calls them from its
/// own task while the owner may read concurrently.
pub trait DiagramDocument: Send + Sync + 'static {
    /// Add `data`, or a default table when `None`. Returns the stored table.
    fn add_table(&self, data: Option<Table>, add_to_history: bool) -> DocumentResult<Table>;
    fn update_table(&self, id: &str, updates: TableUpdate) -> DocumentResult<()>;
    fn delete_table(&self, id: &str, add_to_history: bool) -> DocumentResult<()>;

    fn add_field(&self, table_id: &str, field: Field) -> DocumentResult<()>;
    fn update_field(&self, table_id: &str, field_id: &str, updates: FieldUpdate)
        -> DocumentResult<()>;
    fn delete_field(&self, table_id: &str, field_id: &str, add_to_history: bool)
        -> DocumentResult<()>;

    fn add_relationship(&self, data: Relationship, add_to_history: bool) -> DocumentResult<()>;
    fn update_relationship(&self, id: &str, updates: RelationshipUpdate) -> DocumentResult<()>;
    fn delete_relationship(&self, id: &str, add_to_history: bool) -> DocumentResult<()>;

    fn add_area(&self, data: Area, add_to_history: bool) -> DocumentResult<()>;
    /// `key` matches an area id or name
    fn update_area(&self, key: &str, updates: AreaUpdate) -> DocumentResult<()>;
    fn delete_area(&self, key: &str, add_to_history: bool) -> DocumentResult<()>;

    fn add_note(&self, data: Note, add_to_history: bool) -> DocumentResult<()>;
    /// `key` matches a note id or title
    fn update_note(&self, key: &str, updates: NoteUpdate) -> DocumentResult<()>;
    fn delete_note(&self, key: &str, add_to_history: bool) -> DocumentResult<()>;

    fn add_enum(&self, data: EnumType, add_to_history: bool) -> DocumentResult<()>;
    fn update_enum(&self, id: &str, updates: EnumUpdate) -> DocumentResult<()>;
    fn delete_enum(&self, id: &str, add_to_history: bool) -> DocumentResult<()>;

    fn add_type(&self, data: CustomType, add_to_history: bool) -> DocumentResult<()>;
    fn update_type(&self, id: &str, updates: TypeUpdate) -> DocumentResult<()>;
    fn delete_type(&self, id: &str, add_to_history: bool) -> DocumentResult<()>;

    fn set_database(&self, database: &str) -> DocumentResult<()>;

    fn tables(&self) -> Vec<Table>;
    fn relationships(&self) -> Vec<Relationship>;
    fn areas(&self) -> Vec<Area>;
    fn notes(&self) -> Vec<Note>;
    fn enums(&self) -> Vec<EnumType>;
    fn types(&self) -> Vec<CustomType>;
    fn diagram(&self) -> Diagram;

    /// Look up a table by id when given, otherwise by name.
    fn table(&self, table_id: Option<&str>, table_name: Option<&str>) -> DocumentResult<Table> {
        let tables = self.tables();
        let found = match (table_id, table_name) {
            (Some(id), _) => tables.into_iter().find(|t| t.id == id),
            (None, Some(name)) => tables.into_iter().find(|t| t.name == name),
            (None, None) => None,
        };
        found.ok_or_else(|| {
            DocumentError::no_match("Table", table_id.or(table_name).unwrap_or_default())
        })
    }

    /// Replace document content. With `clear_current` everything is emptied
    /// first; then only the sections present in `diagram` are written.
    fn import_diagram(&self, diagram: DiagramImport, clear_current: bool) -> DocumentResult<()>;
}
