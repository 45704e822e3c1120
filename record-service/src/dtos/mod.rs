pub mod records;

pub use records::{
    ListParams, RecordPatch, RecordPayload, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
