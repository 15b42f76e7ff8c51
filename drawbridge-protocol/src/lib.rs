//! `Drawbridge` wire protocol
//!
//! This crate defines the JSON frames exchanged between the command bridge
//! and the remote-control client, the typed command contract carried inside
//! command frames, and the diagram model those commands operate on.

pub mod codec;
pub mod command;
pub mod constants;
pub mod frame;
pub mod model;
pub mod patch;

pub use codec::FrameCodec;
pub use command::{Command, COMMAND_NAMES};
pub use frame::{CommandFrame, Frame, Heartbeat, ResponseFrame};
pub use model::{
    Area, Cardinality, Constraint, CustomType, Diagram, DiagramImport, EnumType, Field, Note,
    Relationship, Table, DEFAULT_TABLE_COLOR,
};
pub use patch::{
    AreaUpdate, EnumUpdate, FieldUpdate, NoteUpdate, RelationshipUpdate, TableUpdate, TypeUpdate,
};
