//! Update module
//!
//! Applies row-level edits back to the store. Every edit is validated
//! before anything is sent, runs as its own remote write and fails on its
//! own: one bad row never affects its siblings.

mod types;

pub use types::{RowEdit, UpdateSummary};

use crate::entity::{EntityModel, MutationPayload, ResourceKind};
use crate::error::{Error, Result};
use crate::fetch::Mutator;
use crate::schema::{FieldSelection, MetafieldDefinition};
use crate::types::Row;
use futures::future::join_all;
use tracing::{debug, info, warn};

/// Turns row edits into creates, updates and custom-field writes
pub struct UpdateReconciler<'a> {
    mutator: &'a dyn Mutator,
}

impl<'a> UpdateReconciler<'a> {
    pub fn new(mutator: &'a dyn Mutator) -> Self {
        Self { mutator }
    }

    /// Apply a batch of edits concurrently
    ///
    /// Results are returned in input order. `definitions` supply the
    /// metafield types of custom-field columns.
    pub async fn run_update_batch(
        &self,
        kind: ResourceKind,
        edits: &[RowEdit],
        definitions: &[MetafieldDefinition],
    ) -> Vec<Result<Row>> {
        let results = join_all(
            edits
                .iter()
                .map(|edit| self.apply_edit(kind, edit, definitions)),
        )
        .await;

        let summary = UpdateSummary::from_results(&results);
        info!(
            "{kind} update batch: {} succeeded, {} failed",
            summary.succeeded, summary.failed
        );
        results
    }

    /// Apply one edit; returns the previous row merged with the stored values
    pub async fn apply_edit(
        &self,
        kind: ResourceKind,
        edit: &RowEdit,
        definitions: &[MetafieldDefinition],
    ) -> Result<Row> {
        let model = EntityModel::from_row(kind, &edit.new);
        model.validate()?;

        let capabilities = kind.capabilities();
        let id = model.id();
        match id {
            Some(_) if !capabilities.update => {
                return Err(Error::unsupported(kind.to_string(), "update"));
            }
            None if !capabilities.create => {
                return Err(Error::unsupported(kind.to_string(), "create"));
            }
            _ => {}
        }

        let mut merged = edit.previous.clone();
        merged.extend(edit.new.clone());

        let changed = edit.changed();
        let (fields, metafields) = match model.to_mutation_input(&changed, definitions) {
            MutationPayload::NoOp => {
                debug!("{kind} edit has nothing writable, skipping");
                return Ok(merged);
            }
            MutationPayload::Write { fields, metafields } => (fields, metafields),
        };

        let stored = match id {
            Some(id) if fields.is_empty() => {
                debug!("{kind} {id}: only custom fields changed");
                None
            }
            Some(id) => Some(self.mutator.update(&model, id, &fields).await?),
            None => Some(self.mutator.create(&model, &fields).await?),
        };

        let owner_gid = stored
            .as_ref()
            .map(|raw| EntityModel::new(kind, raw.clone()))
            .and_then(|stored| stored.gid())
            .or_else(|| model.gid());

        if let Some(stored) = &stored {
            let projected = EntityModel::new(kind, stored.clone())
                .project(&FieldSelection::all_standard(kind));
            merged.extend(projected);
        }

        if !metafields.is_empty() {
            let Some(owner_gid) = owner_gid else {
                return Err(Error::decode(format!(
                    "{kind} write returned no id for custom fields"
                )));
            };
            let written = self.mutator.set_metafields(&owner_gid, &metafields).await?;
            merged.extend(written);
        }

        Ok(merged)
    }

    /// Delete a record; a record that is already gone counts as deleted
    pub async fn delete(&self, kind: ResourceKind, id: u64) -> Result<()> {
        if !kind.capabilities().delete {
            return Err(Error::unsupported(kind.to_string(), "delete"));
        }
        match self.mutator.delete(kind, id).await {
            Ok(()) => {
                info!("Deleted {kind} {id}");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!("{kind} {id} was already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for UpdateReconciler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateReconciler").finish_non_exhaustive()
    }
}
