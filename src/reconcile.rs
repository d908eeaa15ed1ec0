//! Child-row reconciliation for quotation updates.
//!
//! An update carries the complete list of services (or installments) the
//! quotation should own afterwards. Rows that keep their `id` are updated in
//! place, rows without one are inserted, and every persisted row that the
//! request no longer names is deleted. An id the quotation does not own is
//! treated like a missing one: the row is inserted and the store assigns its
//! id, so clients never steer the id generator. [`reconcile`] works out that plan
//! without touching storage; [`apply`] runs it against a [`ChildStore`],
//! deletes first and upserts second.

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::db::StoreError;
use crate::models::{InstallmentFields, ServiceFields};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildTable {
    Services,
    Installments,
}

impl ChildTable {
    pub fn table_name(self) -> &'static str {
        match self {
            ChildTable::Services => "services",
            ChildTable::Installments => "payments",
        }
    }

    /// Name of the collection in request and response bodies.
    pub fn field_name(self) -> &'static str {
        match self {
            ChildTable::Services => "services",
            ChildTable::Installments => "installments",
        }
    }
}

impl fmt::Display for ChildTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A child row that should exist once the update is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Desired<F> {
    pub id: Option<i32>,
    pub fields: F,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Upsert<F> {
    /// Overwrite a row the quotation already owns.
    Update { id: i32, fields: F },
    /// Write a new row under an id assigned by the store.
    Insert { fields: F },
}

impl<F> Upsert<F> {
    pub fn fields(&self) -> &F {
        match self {
            Upsert::Update { fields, .. } | Upsert::Insert { fields } => fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan<F> {
    pub delete_ids: BTreeSet<i32>,
    pub upserts: Vec<Upsert<F>>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    #[error("{} row {id} is listed more than once", .table.field_name())]
    DuplicateId { table: ChildTable, id: i32 },
}

/// Field sets that live in one of the child tables.
pub trait ChildFields: Clone + Send + Sync + 'static {
    const TABLE: ChildTable;

    fn rows(upserts: &[Upsert<Self>]) -> ChildRows<'_>;
}

impl ChildFields for ServiceFields {
    const TABLE: ChildTable = ChildTable::Services;

    fn rows(upserts: &[Upsert<Self>]) -> ChildRows<'_> {
        ChildRows::Services(upserts)
    }
}

impl ChildFields for InstallmentFields {
    const TABLE: ChildTable = ChildTable::Installments;

    fn rows(upserts: &[Upsert<Self>]) -> ChildRows<'_> {
        ChildRows::Installments(upserts)
    }
}

/// Upserts for one child table, handed to [`ChildStore::upsert_rows`].
#[derive(Debug, Clone, Copy)]
pub enum ChildRows<'a> {
    Services(&'a [Upsert<ServiceFields>]),
    Installments(&'a [Upsert<InstallmentFields>]),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub inserted: u64,
    pub updated: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub deleted: u64,
    pub inserted: u64,
    pub updated: u64,
}

/// The persistence operations reconciliation needs from a store.
#[async_trait]
pub trait ChildStore: Send {
    async fn list_existing_ids(
        &mut self,
        quotation_id: i32,
        table: ChildTable,
    ) -> Result<BTreeSet<i32>, StoreError>;

    async fn delete_by_ids(
        &mut self,
        quotation_id: i32,
        table: ChildTable,
        ids: &BTreeSet<i32>,
    ) -> Result<u64, StoreError>;

    async fn upsert_rows(
        &mut self,
        quotation_id: i32,
        rows: ChildRows<'_>,
    ) -> Result<UpsertOutcome, StoreError>;
}

/// Computes the deletes and upserts that turn `existing` into `desired`.
///
/// Every existing id not named by a desired row is deleted, so a request
/// whose rows carry no ids at all replaces the whole collection.
pub fn reconcile<F: ChildFields>(
    existing: &BTreeSet<i32>,
    desired: Vec<Desired<F>>,
) -> Result<ReconcilePlan<F>, ReconcileError> {
    let mut keep = BTreeSet::new();
    for id in desired.iter().filter_map(|row| row.id) {
        if !keep.insert(id) {
            return Err(ReconcileError::DuplicateId {
                table: F::TABLE,
                id,
            });
        }
    }

    let delete_ids = existing.difference(&keep).copied().collect();
    let upserts = desired
        .into_iter()
        .map(|Desired { id, fields }| match id {
            Some(id) if existing.contains(&id) => Upsert::Update { id, fields },
            _ => Upsert::Insert { fields },
        })
        .collect();

    Ok(ReconcilePlan {
        delete_ids,
        upserts,
    })
}

/// Reconciles one child table of a quotation against `store`.
pub async fn apply<S, F>(
    store: &mut S,
    quotation_id: i32,
    desired: Vec<Desired<F>>,
) -> Result<ApplyOutcome, StoreError>
where
    S: ChildStore + ?Sized,
    F: ChildFields,
{
    let existing = store.list_existing_ids(quotation_id, F::TABLE).await?;
    let plan = reconcile(&existing, desired)?;

    debug!(
        quotation_id,
        table = %F::TABLE,
        existing = existing.len(),
        delete = ?plan.delete_ids,
        upserts = plan.upserts.len(),
        "Reconciling child rows"
    );

    let deleted = if plan.delete_ids.is_empty() {
        0
    } else {
        store
            .delete_by_ids(quotation_id, F::TABLE, &plan.delete_ids)
            .await?
    };

    let upserted = if plan.upserts.is_empty() {
        UpsertOutcome::default()
    } else {
        store
            .upsert_rows(quotation_id, F::rows(&plan.upserts))
            .await?
    };

    Ok(ApplyOutcome {
        deleted,
        inserted: upserted.inserted,
        updated: upserted.updated,
    })
}
