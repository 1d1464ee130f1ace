// ABOUTME: Turns exported `_all_docs` rows into documents the cluster accepts for insertion
// ABOUTME: Strips the server-assigned revision marker and validates the row shape

use serde_json::{Map, Value};
use thiserror::Error;

/// Revision marker the cluster assigns to every stored document
pub const REVISION_FIELD: &str = "_rev";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("row {index} is not a JSON object")]
    RowNotObject { index: usize },

    #[error("row {index} (id '{id}') has no document body; export must include documents")]
    MissingDocument { index: usize, id: String },

    #[error("document body of row {index} (id '{id}') is not a JSON object")]
    DocumentNotObject { index: usize, id: String },
}

/// A document ready for bulk insertion: a JSON object without `_rev`
#[derive(Debug, Clone, PartialEq)]
pub struct InsertableDocument(Map<String, Value>);

impl InsertableDocument {
    /// Extract the `doc` body of one `_all_docs` row and drop its revision marker
    pub fn from_row(index: usize, row: &Value) -> Result<Self, RecordError> {
        let row = row
            .as_object()
            .ok_or(RecordError::RowNotObject { index })?;
        let id = row
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("<unknown>")
            .to_string();

        let doc = match row.get("doc") {
            None | Some(Value::Null) => return Err(RecordError::MissingDocument { index, id }),
            Some(Value::Object(doc)) => doc,
            Some(_) => return Err(RecordError::DocumentNotObject { index, id }),
        };

        let mut doc = doc.clone();
        if doc.remove(REVISION_FIELD).is_none() {
            tracing::debug!("Document '{}' carries no {} field", id, REVISION_FIELD);
        }

        Ok(Self(doc))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Prepare every row of a snapshot for insertion
///
/// Fails on the first malformed row so a database with broken source data is
/// skipped as a whole instead of being partially imported.
pub fn prepare_documents(rows: &[Value]) -> Result<Vec<Value>, RecordError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| InsertableDocument::from_row(index, row).map(InsertableDocument::into_value))
        .collect()
}
