use anyhow::{Context, Result};
use async_trait::async_trait;
use gcloud_gax::conn::Environment;
use gcloud_gax::grpc::{Code, Status};
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig, Error as SpannerError};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation::{delete, insert, update};
use gcloud_spanner::row::Row;
use gcloud_spanner::statement::Statement;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::{require_id, ItemStore, WriteOutcome};
use crate::config::SpannerConfig;
use crate::models::Item;

/// One row of the items table before it is folded back into an `Item`
#[derive(Debug, Clone)]
struct StoredRow {
    data: String,
    created_at: String,
    updated_at: Option<String>,
}

impl StoredRow {
    fn from_row(row: &Row) -> Result<Self, Status> {
        let data = row.column_by_name::<String>("data").map_err(decode_status)?;
        let created_at = row.column_by_name::<String>("created_at").map_err(decode_status)?;
        let updated_at = row
            .column_by_name::<Option<String>>("updated_at")
            .map_err(decode_status)?;
        Ok(Self {
            data,
            created_at,
            updated_at,
        })
    }

    fn into_item(self) -> Result<Item> {
        let mut item: Item = match serde_json::from_str(&self.data)
            .context("Failed to deserialize item data")?
        {
            JsonValue::Object(attributes) => Item::from(attributes),
            other => anyhow::bail!("Stored item data is not a JSON object: {}", other),
        };
        item.set_created_at(self.created_at);
        if let Some(updated_at) = self.updated_at {
            item.set_updated_at(updated_at);
        }
        Ok(item)
    }
}

fn decode_status(err: impl std::fmt::Display) -> Status {
    Status::new(Code::Internal, format!("Failed to decode row: {}", err))
}

/// Client attributes only; the timestamps live in their own columns
fn encode_data(item: &Item) -> Result<(String, Option<String>, Option<String>)> {
    let mut attributes = item.clone();
    let (created_at, updated_at) = attributes.take_timestamps();
    let data = serde_json::to_string(&attributes).context("Failed to serialize item data")?;
    Ok((data, created_at, updated_at))
}

/// `ItemStore` backed by a Cloud Spanner table
#[derive(Clone)]
pub struct SpannerStore {
    inner: Arc<Client>,
    table: Arc<str>,
}

impl SpannerStore {
    /// Connect to the configured database and make sure `table` exists.
    ///
    /// When an emulator host is configured, both the admin and data clients are
    /// pointed at it explicitly; otherwise the library's default environment
    /// detection applies.
    ///
    /// This also performs auto-provisioning: the instance, database and table
    /// are created if they don't exist.
    pub async fn connect(config: &SpannerConfig, table: &str) -> Result<Self> {
        auto_provision(config, table).await?;

        let database_path = config.database_path();

        let client_config = match &config.emulator_host {
            Some(host) => {
                tracing::info!("Connecting to Spanner emulator at: {}", host);
                ClientConfig {
                    environment: Environment::Emulator(host.clone()),
                    ..Default::default()
                }
            }
            None => {
                tracing::info!("Connecting to production Spanner");
                ClientConfig::default()
            }
        };

        let client = Client::new(&database_path, client_config)
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {} (table: {})",
            database_path,
            table
        );

        Ok(Self {
            inner: Arc::new(client),
            table: Arc::from(table),
        })
    }

    async fn query_rows(&self, statement: Statement) -> Result<Vec<StoredRow>> {
        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query items from Spanner")?;

        let mut rows = Vec::new();
        while let Some(row) = result_set.next().await? {
            rows.push(StoredRow::from_row(&row)?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl ItemStore for SpannerStore {
    /// Read every row of the items table
    ///
    /// # Returns
    /// * `Ok(items)` - All stored items, in no particular order
    ///
    /// # Errors
    /// Returns an error if the Spanner query fails or a row's `data` is not a JSON object
    async fn scan_all(&self) -> Result<Vec<Item>> {
        let sql = format!("SELECT data, created_at, updated_at FROM {}", self.table);
        let statement = Statement::new(&sql);

        let items = self
            .query_rows(statement)
            .await?
            .into_iter()
            .map(StoredRow::into_item)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Scanned {} items from {}", items.len(), self.table);
        Ok(items)
    }

    /// Read one item by its primary key
    ///
    /// # Arguments
    /// * `id` - Primary key of the item to retrieve
    ///
    /// # Returns
    /// * `Ok(Some(item))` - Item found and returned
    /// * `Ok(None)` - No row with this key
    ///
    /// # Errors
    /// Returns an error if the Spanner query fails or the stored JSON cannot be decoded
    async fn get_by_key(&self, id: &str) -> Result<Option<Item>> {
        let sql = format!(
            "SELECT data, created_at, updated_at FROM {} WHERE id = @id",
            self.table
        );
        let key = id.to_string();
        let mut statement = Statement::new(&sql);
        statement.add_param("id", &key);

        match self.query_rows(statement).await?.into_iter().next() {
            Some(row) => {
                tracing::debug!("Read item with id: {}", id);
                Ok(Some(row.into_item()?))
            }
            None => {
                tracing::debug!("Item not found with id: {}", id);
                Ok(None)
            }
        }
    }

    /// Insert a new row; an existing row with the same key makes Spanner reject the mutation
    ///
    /// # Arguments
    /// * `item` - Item to store, carrying a string `id`
    ///
    /// # Returns
    /// * `Ok(WriteOutcome::Written(item))` - Row inserted
    /// * `Ok(WriteOutcome::PreconditionFailed)` - Spanner answered `ALREADY_EXISTS`
    ///
    /// # Errors
    /// Returns an error if the item has no `id` or the commit fails for any other reason
    async fn put_if_absent(&self, item: Item) -> Result<WriteOutcome> {
        let id = require_id(&item)?;
        let (data, created_at, _) = encode_data(&item)?;
        let created_at = created_at.context("Item is missing createdAt")?;

        // `insert` fails with ALREADY_EXISTS when the key is taken.
        let mutation = insert(
            &self.table,
            &["id", "data", "created_at"],
            &[&id, &data, &created_at],
        );

        match self.inner.apply(vec![mutation]).await {
            Ok(_) => {
                tracing::debug!("Inserted item with id: {}", id);
                let mut stored = item;
                stored.remove(crate::models::UPDATED_AT);
                Ok(WriteOutcome::Written(stored))
            }
            Err(SpannerError::GRPC(status)) if status.code() == Code::AlreadyExists => {
                tracing::debug!("Insert rejected, id already exists: {}", id);
                Ok(WriteOutcome::PreconditionFailed)
            }
            Err(err) => Err(anyhow::Error::new(err).context("Failed to insert item into Spanner")),
        }
    }

    /// Replace an existing row inside a read-write transaction
    ///
    /// The stored `created_at` is carried over onto the replacement.
    ///
    /// # Arguments
    /// * `item` - Replacement item, carrying a string `id`
    ///
    /// # Returns
    /// * `Ok(WriteOutcome::Written(item))` - Row replaced
    /// * `Ok(WriteOutcome::PreconditionFailed)` - No row with this key; nothing written
    ///
    /// # Errors
    /// Returns an error if the item has no `id` or the transaction fails
    async fn put_if_present(&self, item: Item) -> Result<WriteOutcome> {
        let id = require_id(&item)?;
        let (data, _, updated_at) = encode_data(&item)?;
        let updated_at = updated_at.context("Item is missing updatedAt")?;
        let table = self.table.clone();

        // The existence read and the buffered update commit together.
        let result: Result<(_, Option<String>), SpannerError> = self
            .inner
            .read_write_transaction(|tx| {
                let table = table.clone();
                let id = id.clone();
                let data = data.clone();
                let updated_at = updated_at.clone();
                Box::pin(async move {
                    let sql = format!("SELECT created_at FROM {} WHERE id = @id", table);
                    let mut statement = Statement::new(&sql);
                    statement.add_param("id", &id);

                    let created_at = {
                        let mut rows = tx.query(statement).await?;
                        match rows.next().await? {
                            Some(row) => Some(
                                row.column_by_name::<String>("created_at")
                                    .map_err(decode_status)?,
                            ),
                            None => None,
                        }
                    };

                    if created_at.is_some() {
                        tx.buffer_write(vec![update(
                            &table,
                            &["id", "data", "updated_at"],
                            &[&id, &data, &updated_at],
                        )]);
                    }
                    Ok(created_at)
                })
            })
            .await;

        let (_, created_at) = result.context("Failed to update item in Spanner")?;

        match created_at {
            Some(created_at) => {
                tracing::debug!("Updated item with id: {}", id);
                let mut stored = item;
                stored.set_created_at(created_at);
                Ok(WriteOutcome::Written(stored))
            }
            None => {
                tracing::debug!("Update rejected, id not found: {}", id);
                Ok(WriteOutcome::PreconditionFailed)
            }
        }
    }

    /// Delete a row inside a read-write transaction, returning what it held
    ///
    /// # Arguments
    /// * `id` - Primary key of the item to remove
    ///
    /// # Returns
    /// * `Ok(Some(item))` - Row removed
    /// * `Ok(None)` - No row with this key
    ///
    /// # Errors
    /// Returns an error if the transaction fails
    async fn delete_if_present(&self, id: &str) -> Result<Option<Item>> {
        let table = self.table.clone();
        let key = id.to_string();

        let result: Result<(_, Option<StoredRow>), SpannerError> = self
            .inner
            .read_write_transaction(|tx| {
                let table = table.clone();
                let key = key.clone();
                Box::pin(async move {
                    let sql = format!(
                        "SELECT data, created_at, updated_at FROM {} WHERE id = @id",
                        table
                    );
                    let mut statement = Statement::new(&sql);
                    statement.add_param("id", &key);

                    let removed = {
                        let mut rows = tx.query(statement).await?;
                        match rows.next().await? {
                            Some(row) => Some(StoredRow::from_row(&row)?),
                            None => None,
                        }
                    };

                    if removed.is_some() {
                        tx.buffer_write(vec![delete(&table, Key::new(&key))]);
                    }
                    Ok(removed)
                })
            })
            .await;

        let (_, removed) = result.context("Failed to delete item from Spanner")?;

        match removed {
            Some(row) => {
                tracing::debug!("Deleted item with id: {}", id);
                Ok(Some(row.into_item()?))
            }
            None => {
                tracing::debug!("Delete found no item with id: {}", id);
                Ok(None)
            }
        }
    }

    /// Runs `SELECT 1` to confirm the database answers queries
    async fn health_check(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }
}

/// Create the Spanner instance, database and items table when missing.
///
/// Safe to run on every startup; existing resources are left alone.
async fn auto_provision(config: &SpannerConfig, table: &str) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_config = match &config.emulator_host {
        Some(host) => AdminClientConfig {
            environment: Environment::Emulator(host.clone()),
            ..Default::default()
        },
        None => AdminClientConfig::default(),
    };

    let admin_client = AdminClient::new(admin_config)
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.project);
    let instance_path = format!("{}/instances/{}", project_path, config.instance);
    let database_path = config.database_path();

    ensure_instance_exists(&admin_client, config, &project_path, &instance_path).await?;
    ensure_database_exists(&admin_client, &instance_path, &database_path).await?;
    ensure_table_exists(&admin_client, &database_path, table).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

/// Ensure the Spanner instance exists, creating it if necessary
async fn ensure_instance_exists(
    admin_client: &AdminClient,
    config: &SpannerConfig,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let get_request = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };

    match admin_client.instance().get_instance(get_request, None).await {
        Ok(_) => {
            tracing::info!("Instance already exists: {}", instance_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Instance not found, creating: {}", instance_path);

            let instance_config = if config.emulator_host.is_some() {
                format!("{}/instanceConfigs/emulator-config", project_path)
            } else {
                format!("{}/instanceConfigs/regional-us-central1", project_path)
            };

            let create_request = CreateInstanceRequest {
                parent: project_path.to_string(),
                instance_id: config.instance.clone(),
                instance: Some(Instance {
                    name: instance_path.to_string(),
                    config: instance_config,
                    display_name: format!("{} instance", config.instance),
                    node_count: 1,
                    ..Default::default()
                }),
            };

            let mut operation = admin_client
                .instance()
                .create_instance(create_request, None)
                .await
                .context("Failed to start instance creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create instance")?;

            tracing::info!("Instance created successfully: {}", instance_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check instance existence: {}",
            e.message()
        )),
    }
}

/// Ensure the Spanner database exists, creating it if necessary
async fn ensure_database_exists(
    admin_client: &AdminClient,
    instance_path: &str,
    database_path: &str,
) -> Result<()> {
    let get_request = GetDatabaseRequest {
        name: database_path.to_string(),
    };

    match admin_client
        .database()
        .get_database(get_request, None)
        .await
    {
        Ok(_) => {
            tracing::info!("Database already exists: {}", database_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Database not found, creating: {}", database_path);

            let database_id = database_path
                .split('/')
                .next_back()
                .context("Invalid database path")?;

            let create_request = CreateDatabaseRequest {
                parent: instance_path.to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: vec![],
                encryption_config: None,
                database_dialect: 1, // Google Standard SQL
                proto_descriptors: vec![],
            };

            let mut operation = admin_client
                .database()
                .create_database(create_request, None)
                .await
                .context("Failed to start database creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create database")?;

            tracing::info!("Database created successfully: {}", database_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check database existence: {}",
            e.message()
        )),
    }
}

/// DDL for the items table: JSON payload plus timestamp columns
fn items_table_ddl(table: &str) -> String {
    format!(
        r#"
CREATE TABLE {table} (
    id STRING(MAX) NOT NULL,
    data JSON NOT NULL,
    created_at STRING(64) NOT NULL,
    updated_at STRING(64),
) PRIMARY KEY (id)
"#
    )
    .trim()
    .to_string()
}

fn ddl_declares_table(statement: &str, table: &str) -> bool {
    statement.contains(&format!("CREATE TABLE {} ", table))
        || statement.contains(&format!("CREATE TABLE {}(", table))
        || statement.contains(&format!("CREATE TABLE `{}`", table))
}

/// Ensure the items table exists in the database, creating it if necessary
async fn ensure_table_exists(
    admin_client: &AdminClient,
    database_path: &str,
    table: &str,
) -> Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let ddl_response = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?;

    let table_exists = ddl_response
        .into_inner()
        .statements
        .iter()
        .any(|stmt| ddl_declares_table(stmt, table));

    if table_exists {
        tracing::info!("Table '{}' already exists", table);
        return Ok(());
    }

    tracing::info!("Table '{}' not found, creating...", table);

    let update_request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: vec![items_table_ddl(table)],
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin_client
        .database()
        .update_database_ddl(update_request, None)
        .await
        .context("Failed to start table creation")?;

    operation
        .wait(None)
        .await
        .context("Failed to create table")?;

    tracing::info!("Table '{}' created successfully", table);
    Ok(())
}
