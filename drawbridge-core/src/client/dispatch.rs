//! Command dispatch on the client side
//!
//! Every command frame yields exactly one response frame carrying the
//! original id; document errors become `success: false` responses rather than
//! transport errors.

use super::document::{DiagramDocument, DocumentError};
use drawbridge_common::BridgeError;
use drawbridge_protocol::codec::recover_id;
use drawbridge_protocol::{Command, CommandFrame, Frame, FrameCodec, Heartbeat, ResponseFrame};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Successful outcome of one command
#[derive(Debug, Clone, Default, PartialEq)]
struct Reply {
    data: Option<Value>,
    message: Option<String>,
}

impl Reply {
    fn message(message: &str) -> Self {
        Self {
            data: None,
            message: Some(message.to_string()),
        }
    }

    fn data(data: impl Serialize) -> Result<Self, BridgeError> {
        Ok(Self {
            data: Some(serde_json::to_value(data)?),
            message: None,
        })
    }
}

/// Failure reasons a dispatched command can produce
#[derive(Debug, Error)]
enum DispatchError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Routes command frames to a [`DiagramDocument`]
pub struct Dispatcher<D> {
    document: Arc<D>,
    codec: FrameCodec,
}

impl<D> Clone for Dispatcher<D> {
    fn clone(&self) -> Self {
        Self {
            document: self.document.clone(),
            codec: self.codec,
        }
    }
}

impl<D: DiagramDocument> Dispatcher<D> {
    pub fn new(document: Arc<D>) -> Self {
        Self {
            document,
            codec: FrameCodec::new(),
        }
    }

    pub fn document(&self) -> &Arc<D> {
        &self.document
    }

    /// Handle one incoming text frame; returns the text to send back, if any.
    ///
    /// Pongs are consumed, pings answered with a pong, commands answered with
    /// exactly one response. Undecodable input is answered with a failure
    /// response carrying whatever id could be recovered.
    pub fn handle_text(&self, text: &str) -> Option<String> {
        let reply = match self.codec.decode(text) {
            Ok(Frame::Heartbeat(Heartbeat::Pong)) => {
                debug!("Pong received");
                return None;
            }
            Ok(Frame::Heartbeat(Heartbeat::Ping)) => Frame::pong(),
            Ok(Frame::Command(frame)) => Frame::Response(self.dispatch(&frame)),
            Ok(Frame::Response(response)) => {
                warn!(id = %response.id, "Ignoring response frame sent to the client");
                return None;
            }
            Err(e) => {
                warn!("Failed to parse message: {}", e);
                let id = recover_id(text).unwrap_or_default();
                Frame::Response(ResponseFrame::failure(id, e.to_string()))
            }
        };
        self.encode_reply(&reply)
    }

    fn encode_reply(&self, reply: &Frame) -> Option<String> {
        match self.codec.encode(reply) {
            Ok(text) => Some(text),
            Err(e) => {
                error!("Failed to encode reply: {}", e);
                // Still answer the command so the caller is not left waiting
                let Frame::Response(response) = reply else {
                    return None;
                };
                let fallback = ResponseFrame::failure(response.id.clone(), e.to_string());
                self.codec.encode(&Frame::Response(fallback)).ok()
            }
        }
    }

    /// Execute one command frame against the document.
    pub fn dispatch(&self, frame: &CommandFrame) -> ResponseFrame {
        let result = Command::from_frame(frame)
            .map_err(DispatchError::from)
            .and_then(|command| self.execute(command));

        match result {
            Ok(reply) => {
                debug!(id = %frame.id, command = %frame.command, "Command executed");
                ResponseFrame::ok(frame.id.clone(), reply.data, reply.message)
            }
            Err(e) => {
                warn!(id = %frame.id, command = %frame.command, "Error executing command: {}", e);
                ResponseFrame::failure(frame.id.clone(), e.to_string())
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn execute(&self, command: Command) -> Result<Reply, DispatchError> {
        let doc = self.document.as_ref();
        let reply = match command {
            Command::AddTable {
                data,
                add_to_history,
            } => {
                let table = doc.add_table(data, add_to_history)?;
                Reply {
                    message: Some("Table added".to_string()),
                    ..Reply::data(table)?
                }
            }
            Command::UpdateTable { id, updates } => {
                doc.update_table(&id, updates)?;
                Reply::message("Table updated")
            }
            Command::DeleteTable { id, add_to_history } => {
                doc.delete_table(&id, add_to_history)?;
                Reply::message("Table deleted")
            }

            Command::AddField { table_id, field } => {
                doc.add_field(&table_id, field)?;
                Reply::message("Field added")
            }
            Command::UpdateField {
                table_id,
                field_id,
                updates,
            } => {
                doc.update_field(&table_id, &field_id, updates)?;
                Reply::message("Field updated")
            }
            Command::DeleteField {
                table_id,
                field_id,
                add_to_history,
            } => {
                doc.delete_field(&table_id, &field_id, add_to_history)?;
                Reply::message("Field deleted")
            }

            Command::AddRelationship {
                data,
                add_to_history,
            } => {
                doc.add_relationship(data, add_to_history)?;
                Reply::message("Relationship added")
            }
            Command::UpdateRelationship { id, updates } => {
                doc.update_relationship(&id, updates)?;
                Reply::message("Relationship updated")
            }
            Command::DeleteRelationship { id, add_to_history } => {
                doc.delete_relationship(&id, add_to_history)?;
                Reply::message("Relationship deleted")
            }

            Command::AddArea {
                data,
                add_to_history,
            } => {
                doc.add_area(data, add_to_history)?;
                Reply::message("Area added")
            }
            Command::UpdateArea { id, updates } => {
                doc.update_area(&id, updates)?;
                Reply::message("Area updated")
            }
            Command::DeleteArea { id, add_to_history } => {
                doc.delete_area(&id, add_to_history)?;
                Reply::message("Area deleted")
            }

            Command::AddNote {
                data,
                add_to_history,
            } => {
                doc.add_note(data, add_to_history)?;
                Reply::message("Note added")
            }
            Command::UpdateNote { id, updates } => {
                doc.update_note(&id, updates)?;
                Reply::message("Note updated")
            }
            Command::DeleteNote { id, add_to_history } => {
                doc.delete_note(&id, add_to_history)?;
                Reply::message("Note deleted")
            }

            Command::AddEnum {
                data,
                add_to_history,
            } => {
                doc.add_enum(data, add_to_history)?;
                Reply::message("Enum added")
            }
            Command::UpdateEnum { id, updates } => {
                doc.update_enum(&id, updates)?;
                Reply::message("Enum updated")
            }
            Command::DeleteEnum { id, add_to_history } => {
                doc.delete_enum(&id, add_to_history)?;
                Reply::message("Enum deleted")
            }

            Command::AddType {
                data,
                add_to_history,
            } => {
                doc.add_type(data, add_to_history)?;
                Reply::message("Type added")
            }
            Command::UpdateType { id, updates } => {
                doc.update_type(&id, updates)?;
                Reply::message("Type updated")
            }
            Command::DeleteType { id, add_to_history } => {
                doc.delete_type(&id, add_to_history)?;
                Reply::message("Type deleted")
            }

            Command::SetDatabase { database } => {
                doc.set_database(&database)?;
                Reply::message("Database type set")
            }

            Command::GetTables {} => Reply::data(doc.tables())?,
            Command::GetTable {
                table_id,
                table_name,
            } => Reply::data(doc.table(table_id.as_deref(), table_name.as_deref())?)?,
            Command::GetRelationships {} => Reply::data(doc.relationships())?,
            Command::GetAreas {} => Reply::data(doc.areas())?,
            Command::GetNotes {} => Reply::data(doc.notes())?,
            Command::GetEnums {} => Reply::data(doc.enums())?,
            Command::GetTypes {} => Reply::data(doc.types())?,
            Command::GetDiagram {} => Reply::data(doc.diagram())?,

            Command::ImportDiagram {
                diagram,
                clear_current,
            } => {
                doc.import_diagram(diagram, clear_current)?;
                Reply::message("Diagram imported")
            }
        };
        Ok(reply)
    }
}
