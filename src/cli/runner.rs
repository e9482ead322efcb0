//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::ConnectorConfig;
use crate::connector::{ShopConnector, SyncParams};
use crate::continuation::{Continuation, ContinuationStore};
use crate::entity::ResourceKind;
use crate::error::{Error, Result, ResultExt};
use crate::schema::DefinitionCache;
use crate::update::{RowEdit, UpdateSummary};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check().await,
            Commands::Resources => self.resources(),
            Commands::Columns { resource } => self.columns(resource).await,
            Commands::Sync {
                resource,
                keys,
                filters,
                state,
                all,
                max_slices,
            } => {
                let params = SyncParams {
                    selected: keys.clone(),
                    filters: filters.iter().cloned().collect(),
                };
                self.sync(resource, &params, state.as_deref(), *all, *max_slices)
                    .await
            }
            Commands::Update { resource, edits } => self.update(resource, edits).await,
            Commands::Delete { resource, id } => self.delete(resource, *id).await,
        }
    }

    /// Load the store configuration
    fn load_config(&self) -> Result<ConnectorConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -C flag)"))?;
        ConnectorConfig::from_file(path)
    }

    fn connector(&self) -> Result<ShopConnector> {
        ShopConnector::new(self.load_config()?)
    }

    /// Load continuation state
    fn load_state(path: Option<&Path>) -> Result<ContinuationStore> {
        match path {
            Some(path) => ContinuationStore::from_file(path),
            None => Ok(ContinuationStore::in_memory()),
        }
    }

    /// Check connection
    async fn check(&self) -> Result<()> {
        let connector = self.connector()?;
        let result = connector.check().await;
        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": {
                "status": if result.success { "SUCCEEDED" } else { "FAILED" },
                "message": result.message
            }
        }));
        Ok(())
    }

    /// List the resource catalog
    fn resources(&self) -> Result<()> {
        let resources: Vec<Value> = ResourceKind::ALL
            .iter()
            .map(|kind| {
                let descriptor = kind.descriptor();
                let caps = descriptor.capabilities;
                json!({
                    "name": descriptor.plural,
                    "title": descriptor.name,
                    "custom_fields": caps.secondary_augmentation,
                    "create": caps.create,
                    "update": caps.update,
                    "delete": caps.delete
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "RESOURCES",
            "resources": resources
        }));
        Ok(())
    }

    /// Print standard and custom-field columns
    async fn columns(&self, resource: &str) -> Result<()> {
        let kind: ResourceKind = resource.parse()?;
        let connector = self.connector()?;
        let mut cache = DefinitionCache::new();
        let columns = connector.columns(kind, &mut cache).await?;

        self.output_message(&json!({
            "type": "COLUMNS",
            "resource": kind.as_str(),
            "columns": columns
        }));
        Ok(())
    }

    /// Run one slice, or all of them
    async fn sync(
        &self,
        resource: &str,
        params: &SyncParams,
        state_path: Option<&Path>,
        all: bool,
        max_slices: Option<usize>,
    ) -> Result<()> {
        let kind: ResourceKind = resource.parse()?;
        let connector = self.connector()?;
        let store = Self::load_state(state_path)?;
        let mut cache = DefinitionCache::new();
        let start = Instant::now();

        let mut previous = store
            .get(kind.as_str())
            .await
            .map(|c| c.to_json())
            .transpose()?;
        let mut slices = 0usize;
        let mut total_rows = 0usize;

        loop {
            let output = connector
                .run_sync_slice(kind, previous.as_deref(), params, &mut cache)
                .await?;
            slices += 1;
            total_rows += output.rows.len();

            for row in &output.rows {
                self.output_message(&json!({
                    "type": "RECORD",
                    "record": {
                        "resource": kind.as_str(),
                        "data": row
                    }
                }));
            }

            let next = output
                .continuation
                .as_deref()
                .map(Continuation::from_json)
                .transpose()?;
            store.set(kind.as_str(), next).await?;
            self.output_message(&json!({
                "type": "STATE",
                "state": {
                    "resource": kind.as_str(),
                    "continuation": output.continuation
                }
            }));

            if output.is_final() {
                break;
            }
            if !all || max_slices.is_some_and(|max| slices >= max) {
                break;
            }
            if let Some(wait) = output.deferred_by {
                info!("Waiting {}ms for rate budget", wait.as_millis());
                tokio::time::sleep(wait).await;
            }
            previous = output.continuation;
        }

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "{kind}: {total_rows} rows in {slices} slice(s), {}ms",
                    start.elapsed().as_millis()
                )
            }
        }));
        Ok(())
    }

    /// Apply edits from a file
    async fn update(&self, resource: &str, edits_path: &Path) -> Result<()> {
        let kind: ResourceKind = resource.parse()?;
        let content = fs::read_to_string(edits_path)
            .with_context(|| format!("Failed to read edits file '{}'", edits_path.display()))?;
        let edits: Vec<RowEdit> = serde_json::from_str(&content).context("Invalid edits JSON")?;

        let connector = self.connector()?;
        let mut cache = DefinitionCache::new();
        let results = connector.run_update_batch(kind, &edits, &mut cache).await?;

        for (index, result) in results.iter().enumerate() {
            let message = match result {
                Ok(row) => json!({"type": "UPDATED", "index": index, "row": row}),
                Err(e) => json!({"type": "UPDATE_FAILED", "index": index, "error": e.to_string()}),
            };
            self.output_message(&message);
        }

        let summary = UpdateSummary::from_results(&results);
        self.output_message(&json!({
            "type": "UPDATE_SUMMARY",
            "summary": summary
        }));
        if summary.is_clean() {
            Ok(())
        } else {
            Err(Error::Other(format!(
                "{} of {} edits failed",
                summary.failed,
                results.len()
            )))
        }
    }

    /// Delete one record
    async fn delete(&self, resource: &str, id: u64) -> Result<()> {
        let kind: ResourceKind = resource.parse()?;
        self.connector()?.delete(kind, id).await?;
        self.output_message(&json!({
            "type": "DELETED",
            "resource": kind.as_str(),
            "id": id
        }));
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
