//! Partial updates carried by `update*` commands
//!
//! Every patch field is optional; only the fields present on the wire are
//! written to the target.

use crate::model::{
    Area, Cardinality, Constraint, CustomType, EnumType, Field, Note, Relationship, Table,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

macro_rules! patch {
    (
        $(#[$meta:meta])*
        $name:ident => $target:ty {
            $( $field:ident : $ty:ty $( => $rename:literal )? ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none" $(, rename = $rename)?)]
                pub $field: Option<$ty>,
            )*
        }

        impl $name {
            /// Write the present fields into `target`.
            pub fn apply_to(self, target: &mut $target) {
                $(
                    if let Some(value) = self.$field {
                        target.$field = value;
                    }
                )*
            }

            /// True when the patch carries no field at all.
            pub fn is_empty(&self) -> bool {
                true $( && self.$field.is_none() )*
            }
        }
    };
}

patch! {
    TableUpdate => Table {
        name: String,
        x: f64,
        y: f64,
        locked: bool,
        fields: Vec<Field>,
        comment: String,
        indices: Vec<Value>,
        color: String,
    }
}

patch! {
    FieldUpdate => Field {
        name: String,
        data_type: String => "type",
        primary: bool,
        unique: bool,
        not_null: bool,
        increment: bool,
        default: String,
        check: String,
        comment: String,
    }
}

patch! {
    RelationshipUpdate => Relationship {
        name: String,
        start_table_id: String,
        start_field_id: String,
        end_table_id: String,
        end_field_id: String,
        cardinality: Cardinality,
        update_constraint: Constraint,
        delete_constraint: Constraint,
    }
}

patch! {
    AreaUpdate => Area {
        name: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
    }
}

patch! {
    NoteUpdate => Note {
        title: String,
        content: String,
        x: f64,
        y: f64,
    }
}

patch! {
    EnumUpdate => EnumType {
        name: String,
        values: Vec<String>,
    }
}

patch! {
    TypeUpdate => CustomType {
        name: String,
        fields: Vec<Field>,
    }
}
