use mongodb::bson::{self, Bson, Document};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Identifier key on the wire.
pub const ID_FIELD: &str = "id";
/// Identifier key in the document store.
pub const STORE_ID_FIELD: &str = "_id";

/// User-supplied fields of a record, keyed by field name.
pub type Fields = Map<String, Value>;

/// A stored record: its identifier plus arbitrary JSON fields.
///
/// Serializes flat, `{"id": "...", "name": "a"}`, so the identifier sits next
/// to the fields the client sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

#[derive(Debug, Error)]
pub enum RecordDecodeError {
    #[error("stored document has no _id")]
    MissingId,
    #[error("stored document has an unsupported _id type: {0:?}")]
    UnsupportedId(Bson),
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Identifiers are UUID v4 strings, assigned once at insert.
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Store representation, `_id` first.
    pub fn to_document(&self) -> Result<Document, bson::ser::Error> {
        let mut document = Document::new();
        document.insert(STORE_ID_FIELD, self.id.clone());
        for (key, value) in fields_to_document(&self.fields)? {
            document.insert(key, value);
        }
        Ok(document)
    }

    pub fn from_document(mut document: Document) -> Result<Self, RecordDecodeError> {
        let id = match document.remove(STORE_ID_FIELD) {
            Some(Bson::String(id)) => id,
            // Documents written by other tools may still carry ObjectIds.
            Some(Bson::ObjectId(oid)) => oid.to_hex(),
            Some(other) => return Err(RecordDecodeError::UnsupportedId(other)),
            None => return Err(RecordDecodeError::MissingId),
        };

        let fields = document
            .into_iter()
            .map(|(key, value)| (key, bson_to_json(value)))
            .collect();

        Ok(Self { id, fields })
    }
}

pub fn fields_to_document(fields: &Fields) -> Result<Document, bson::ser::Error> {
    bson::to_document(fields)
}

/// Plain JSON for the BSON types a JSON payload can produce; extended JSON
/// for everything else.
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::from(i),
        Bson::Int64(i) => Value::from(i),
        Bson::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Bson::Double(f).into_relaxed_extjson()),
        Bson::String(s) => Value::String(s),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(document) => Value::Object(
            document
                .into_iter()
                .map(|(key, value)| (key, bson_to_json(value)))
                .collect(),
        ),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        other => other.into_relaxed_extjson(),
    }
}
