#![allow(dead_code)]

use record_service::config::{MongoConfig, RecordConfig, StoreBackend, StoreConfig};
use record_service::services::{InMemoryRecordGateway, MongoRecordGateway, RecordGateway};
use record_service::startup::Application;
use secrecy::Secret;
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub gateway: Arc<dyn RecordGateway>,
    pub client: reqwest::Client,
    mongo: Option<(MongoRecordGateway, String)>,
}

fn memory_config() -> RecordConfig {
    RecordConfig {
        common: CoreConfig {
            port: 0, // Random port for testing
            ..CoreConfig::default()
        },
        store: StoreConfig {
            backend: StoreBackend::Memory,
            mongodb: None,
        },
    }
}

impl TestApp {
    /// Spawn the service on a random port backed by the in-memory store.
    pub async fn spawn() -> Self {
        Self::spawn_with_gateway(memory_config(), Arc::new(InMemoryRecordGateway::new())).await
    }

    /// Spawn the service against a throwaway MongoDB database.
    pub async fn spawn_mongo() -> Self {
        let db_name = format!("record_test_{}", Uuid::new_v4().simple());
        let mongo_config = MongoConfig {
            url: Secret::new(
                std::env::var("TEST_MONGODB_URL")
                    .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            ),
            database: db_name.clone(),
            collection: "records".to_string(),
            server_selection_timeout_ms: 2000,
            connect_timeout_ms: 2000,
        };

        let gateway = MongoRecordGateway::connect(&mongo_config)
            .await
            .expect("Failed to create MongoDB gateway");

        let mut config = memory_config();
        config.store = StoreConfig {
            backend: StoreBackend::Mongodb,
            mongodb: Some(mongo_config),
        };

        let mut app = Self::spawn_with_gateway(config, Arc::new(gateway.clone())).await;
        app.mongo = Some((gateway, db_name));
        app
    }

    pub async fn spawn_with_gateway(config: RecordConfig, gateway: Arc<dyn RecordGateway>) -> Self {
        let app = Application::build_with_gateway(config, gateway)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let gateway = app.gateway();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            gateway,
            client,
            mongo: None,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn create(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/records"))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Create a record and return its JSON body.
    pub async fn create_ok(&self, body: &Value) -> Value {
        let response = self.create(body).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        response.json().await.expect("Failed to parse JSON")
    }

    pub async fn get(&self, id: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/records/{}", id)))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, id: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(self.url(&format!("/records/{}", id)))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn patch(&self, id: &str, body: &Value) -> reqwest::Response {
        self.client
            .patch(self.url(&format!("/records/{}", id)))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, id: &str) -> reqwest::Response {
        self.client
            .delete(self.url(&format!("/records/{}", id)))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn list(&self, query: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/records{}", query)))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Drop the throwaway database, if any.
    pub async fn cleanup(&self) {
        if let Some((gateway, db_name)) = &self.mongo {
            let _ = gateway.client().database(db_name).drop(None).await;
        }
    }
}
