pub mod record;

pub use record::{Fields, Record, RecordDecodeError, ID_FIELD, STORE_ID_FIELD};
