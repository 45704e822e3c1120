pub mod gateway;
pub mod memory;
pub mod metrics;
pub mod mongo;

pub use gateway::{GatewayError, Page, RecordGateway, RecordStream};
pub use memory::InMemoryRecordGateway;
pub use self::metrics::{get_metrics, init_metrics, record_operation};
pub use mongo::MongoRecordGateway;
