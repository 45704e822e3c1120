use crate::models::{Fields, Record};
use crate::services::gateway::{GatewayError, Page, RecordGateway, RecordStream};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Process-local record store for development and tests.
///
/// Keeps insertion order, which is what `find` pages over. Nothing survives a
/// restart.
#[derive(Default)]
pub struct InMemoryRecordGateway {
    records: RwLock<Vec<Record>>,
}

impl InMemoryRecordGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Record>>, GatewayError> {
        self.records
            .read()
            .map_err(|e| GatewayError::Store(anyhow::anyhow!("In-memory store poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Record>>, GatewayError> {
        self.records
            .write()
            .map_err(|e| GatewayError::Store(anyhow::anyhow!("In-memory store poisoned: {}", e)))
    }
}

#[async_trait]
impl RecordGateway for InMemoryRecordGateway {
    async fn health_check(&self) -> Result<(), GatewayError> {
        self.read().map(|_| ())
    }

    async fn insert(&self, fields: Fields) -> Result<Record, GatewayError> {
        let record = Record::new(Record::generate_id(), fields);
        let mut records = self.write()?;

        if records.iter().any(|r| r.id == record.id) {
            return Err(GatewayError::Conflict(anyhow::anyhow!(
                "Record {} already exists",
                record.id
            )));
        }

        records.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Record>, GatewayError> {
        Ok(self.read()?.iter().find(|r| r.id == id).cloned())
    }

    async fn find(&self, page: Page) -> Result<RecordStream, GatewayError> {
        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);

        let snapshot: Vec<Record> = self
            .read()?
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok(stream::iter(snapshot.into_iter().map(Ok)).boxed())
    }

    async fn replace(&self, id: &str, fields: Fields) -> Result<Option<Record>, GatewayError> {
        let mut records = self.write()?;
        Ok(records.iter_mut().find(|r| r.id == id).map(|record| {
            record.fields = fields;
            record.clone()
        }))
    }

    async fn update_fields(
        &self,
        id: &str,
        fields: Fields,
    ) -> Result<Option<Record>, GatewayError> {
        let mut records = self.write()?;
        Ok(records.iter_mut().find(|r| r.id == id).map(|record| {
            record.fields.extend(fields);
            record.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, GatewayError> {
        let mut records = self.write()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }
}
