use crate::config::MongoConfig;
use crate::models::{record::fields_to_document, Fields, Record, RecordDecodeError};
use crate::services::gateway::{GatewayError, Page, RecordGateway, RecordStream};
use async_trait::async_trait;
use futures::stream::StreamExt;
use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    options::{
        ClientOptions, FindOneAndReplaceOptions, FindOneAndUpdateOptions, FindOptions,
        ReturnDocument,
    },
    Client as MongoClient, Collection,
};
use secrecy::ExposeSecret;

const DUPLICATE_KEY_CODE: i32 = 11000;

impl From<mongodb::error::Error> for GatewayError {
    fn from(err: mongodb::error::Error) -> Self {
        let unavailable = matches!(
            err.kind.as_ref(),
            ErrorKind::ServerSelection { .. }
                | ErrorKind::Io(_)
                | ErrorKind::ConnectionPoolCleared { .. }
        );
        let duplicate = match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
                write_error.code == DUPLICATE_KEY_CODE
            }
            ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
            _ => false,
        };
        let codec = matches!(
            err.kind.as_ref(),
            ErrorKind::BsonSerialization(_) | ErrorKind::BsonDeserialization(_)
        );

        if unavailable {
            GatewayError::Unavailable(anyhow::Error::new(err))
        } else if duplicate {
            GatewayError::Conflict(anyhow::Error::new(err))
        } else if codec {
            GatewayError::InvalidDocument(anyhow::Error::new(err))
        } else {
            GatewayError::Store(anyhow::Error::new(err))
        }
    }
}

impl From<RecordDecodeError> for GatewayError {
    fn from(err: RecordDecodeError) -> Self {
        GatewayError::InvalidDocument(anyhow::Error::new(err))
    }
}

impl From<mongodb::bson::ser::Error> for GatewayError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        GatewayError::InvalidDocument(anyhow::Error::new(err))
    }
}

/// Record gateway backed by a single MongoDB collection.
///
/// The driver pools connections: each call checks one out for its duration
/// and gives it back when the operation future completes or is dropped.
#[derive(Clone)]
pub struct MongoRecordGateway {
    client: MongoClient,
    records: Collection<Document>,
}

impl MongoRecordGateway {
    pub async fn connect(config: &MongoConfig) -> Result<Self, GatewayError> {
        tracing::info!(
            database = %config.database,
            collection = %config.collection,
            "Connecting to MongoDB"
        );

        let mut options = ClientOptions::parse(config.url.expose_secret())
            .await
            .map_err(|e| {
                tracing::error!("Failed to parse MongoDB connection string: {}", e);
                GatewayError::from(e)
            })?;
        options.app_name = Some("record-service".to_string());
        options.server_selection_timeout = Some(config.server_selection_timeout());
        options.connect_timeout = Some(config.connect_timeout());

        let client = MongoClient::with_options(options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            GatewayError::from(e)
        })?;
        let records = client
            .database(&config.database)
            .collection(&config.collection);

        Ok(Self { client, records })
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn collection(&self) -> &Collection<Document> {
        &self.records
    }
}

#[async_trait]
impl RecordGateway for MongoRecordGateway {
    async fn health_check(&self) -> Result<(), GatewayError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                GatewayError::from(e)
            })?;
        Ok(())
    }

    async fn insert(&self, fields: Fields) -> Result<Record, GatewayError> {
        let record = Record::new(Record::generate_id(), fields);
        let document = record.to_document()?;

        self.records.insert_one(document, None).await.map_err(|e| {
            tracing::error!(record_id = %record.id, "Failed to insert record: {}", e);
            GatewayError::from(e)
        })?;

        // Echo what the store holds; fall back to the inserted copy if a
        // concurrent delete got there first.
        Ok(self.find_by_id(&record.id).await?.unwrap_or(record))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Record>, GatewayError> {
        let document = self
            .records
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| {
                tracing::error!(record_id = %id, "Failed to fetch record: {}", e);
                GatewayError::from(e)
            })?;

        document
            .map(Record::from_document)
            .transpose()
            .map_err(GatewayError::from)
    }

    async fn find(&self, page: Page) -> Result<RecordStream, GatewayError> {
        let options = FindOptions::builder()
            .skip(page.offset)
            .limit(i64::try_from(page.limit).unwrap_or(i64::MAX))
            .build();

        let cursor = self.records.find(doc! {}, options).await.map_err(|e| {
            tracing::error!("Failed to list records: {}", e);
            GatewayError::from(e)
        })?;

        Ok(cursor
            .map(|document| {
                document
                    .map_err(GatewayError::from)
                    .and_then(|d| Record::from_document(d).map_err(GatewayError::from))
            })
            .boxed())
    }

    async fn replace(&self, id: &str, fields: Fields) -> Result<Option<Record>, GatewayError> {
        let replacement = fields_to_document(&fields)?;
        let options = FindOneAndReplaceOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let document = self
            .records
            .find_one_and_replace(doc! { "_id": id }, replacement, options)
            .await
            .map_err(|e| {
                tracing::error!(record_id = %id, "Failed to replace record: {}", e);
                GatewayError::from(e)
            })?;

        document
            .map(Record::from_document)
            .transpose()
            .map_err(GatewayError::from)
    }

    async fn update_fields(
        &self,
        id: &str,
        fields: Fields,
    ) -> Result<Option<Record>, GatewayError> {
        if fields.is_empty() {
            return self.find_by_id(id).await;
        }

        let set = fields_to_document(&fields)?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let document = self
            .records
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options)
            .await
            .map_err(|e| {
                tracing::error!(record_id = %id, "Failed to update record: {}", e);
                GatewayError::from(e)
            })?;

        document
            .map(Record::from_document)
            .transpose()
            .map_err(GatewayError::from)
    }

    async fn delete(&self, id: &str) -> Result<bool, GatewayError> {
        let result = self
            .records
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| {
                tracing::error!(record_id = %id, "Failed to delete record: {}", e);
                GatewayError::from(e)
            })?;

        Ok(result.deleted_count == 1)
    }

    async fn shutdown(&self) {
        tracing::info!("Closing MongoDB connections");
        self.client.clone().shutdown().await;
    }
}

