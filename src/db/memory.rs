//! In-process quotation store for local runs and tests.
//!
//! Writes are applied to a copy of the state and swapped in only when every
//! step succeeds, so a failed update leaves nothing half-written.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CreatedQuotation, QuotationStore, StoreError, UpdatedQuotation};
use crate::models::{Admin, Installment, Quotation, QuotationDetail, QuotationDraft, Service};
use crate::reconcile::{self, ChildRows, ChildStore, ChildTable, Upsert, UpsertOutcome};

trait ChildRow {
    fn quotation_id(&self) -> i32;
}

impl ChildRow for Service {
    fn quotation_id(&self) -> i32 {
        self.quotation_id
    }
}

impl ChildRow for Installment {
    fn quotation_id(&self) -> i32 {
        self.quotation_id
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    admins: Vec<Admin>,
    quotations: BTreeMap<i32, Quotation>,
    services: BTreeMap<i32, Service>,
    installments: BTreeMap<i32, Installment>,
    last_quotation_id: i32,
    last_service_id: i32,
    last_installment_id: i32,
}

fn next_id(last: &mut i32) -> i32 {
    *last += 1;
    *last
}

fn ids_of<R: ChildRow>(rows: &BTreeMap<i32, R>, quotation_id: i32) -> BTreeSet<i32> {
    rows.iter()
        .filter(|(_, row)| row.quotation_id() == quotation_id)
        .map(|(id, _)| *id)
        .collect()
}

fn upsert_into<R, F: Clone>(
    rows: &mut BTreeMap<i32, R>,
    last_id: &mut i32,
    quotation_id: i32,
    upserts: &[Upsert<F>],
    build: impl Fn(i32, i32, F) -> R,
) -> UpsertOutcome {
    let mut outcome = UpsertOutcome::default();

    for upsert in upserts {
        match upsert {
            Upsert::Update { id, fields } => {
                rows.insert(*id, build(*id, quotation_id, fields.clone()));
                outcome.updated += 1;
            }
            Upsert::Insert { fields } => {
                let id = next_id(last_id);
                rows.insert(id, build(id, quotation_id, fields.clone()));
                outcome.inserted += 1;
            }
        }
    }

    outcome
}

impl MemoryState {
    fn detail(&self, quotation: &Quotation) -> QuotationDetail {
        let services = self
            .services
            .values()
            .filter(|s| s.quotation_id == quotation.id)
            .cloned()
            .collect();
        let installments = self
            .installments
            .values()
            .filter(|i| i.quotation_id == quotation.id)
            .cloned()
            .collect();
        QuotationDetail::new(quotation.clone(), services, installments)
    }
}

#[async_trait]
impl ChildStore for MemoryState {
    async fn list_existing_ids(
        &mut self,
        quotation_id: i32,
        table: ChildTable,
    ) -> Result<BTreeSet<i32>, StoreError> {
        Ok(match table {
            ChildTable::Services => ids_of(&self.services, quotation_id),
            ChildTable::Installments => ids_of(&self.installments, quotation_id),
        })
    }

    async fn delete_by_ids(
        &mut self,
        quotation_id: i32,
        table: ChildTable,
        ids: &BTreeSet<i32>,
    ) -> Result<u64, StoreError> {
        let doomed = |id: &i32, owner: i32| owner == quotation_id && ids.contains(id);
        let deleted = match table {
            ChildTable::Services => {
                let before = self.services.len();
                self.services.retain(|id, s| !doomed(id, s.quotation_id));
                before - self.services.len()
            }
            ChildTable::Installments => {
                let before = self.installments.len();
                self.installments.retain(|id, i| !doomed(id, i.quotation_id));
                before - self.installments.len()
            }
        };
        Ok(deleted as u64)
    }

    async fn upsert_rows(
        &mut self,
        quotation_id: i32,
        rows: ChildRows<'_>,
    ) -> Result<UpsertOutcome, StoreError> {
        Ok(match rows {
            ChildRows::Services(upserts) => upsert_into(
                &mut self.services,
                &mut self.last_service_id,
                quotation_id,
                upserts,
                Service::from_fields,
            ),
            ChildRows::Installments(upserts) => upsert_into(
                &mut self.installments,
                &mut self.last_installment_id,
                quotation_id,
                upserts,
                Installment::from_fields,
            ),
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an admin account; `password_hash` is a PHC string.
    pub fn with_admin(mut self, email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let state = self.state.get_mut();
        let id = state.admins.len() as i32 + 1;
        state.admins.push(Admin {
            id,
            email: email.into(),
            password_hash: password_hash.into(),
        });
        self
    }
}

#[async_trait]
impl QuotationStore for MemoryStore {
    async fn find_admin(&self, email: &str) -> Result<Option<Admin>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.admins.iter().find(|a| a.email == email).cloned())
    }

    async fn list_quotations(&self) -> Result<Vec<QuotationDetail>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.quotations.values().map(|q| state.detail(q)).collect())
    }

    async fn get_quotation(&self, id: i32) -> Result<Option<QuotationDetail>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.quotations.get(&id).map(|q| state.detail(q)))
    }

    async fn create_quotation(&self, draft: QuotationDraft) -> Result<CreatedQuotation, StoreError> {
        let draft = draft.without_row_ids();
        let mut state = self.state.lock().await;
        let mut next = state.clone();

        let id = next_id(&mut next.last_quotation_id);
        next.quotations
            .insert(id, Quotation::from_header(id, draft.header));
        let services = reconcile::apply(&mut next, id, draft.services).await?;
        let installments = reconcile::apply(&mut next, id, draft.installments).await?;

        *state = next;
        Ok(CreatedQuotation {
            id,
            services: services.inserted,
            installments: installments.inserted,
        })
    }

    async fn update_quotation(
        &self,
        id: i32,
        draft: QuotationDraft,
    ) -> Result<Option<UpdatedQuotation>, StoreError> {
        let mut state = self.state.lock().await;
        if !state.quotations.contains_key(&id) {
            return Ok(None);
        }
        let mut next = state.clone();

        next.quotations
            .insert(id, Quotation::from_header(id, draft.header));
        let services = reconcile::apply(&mut next, id, draft.services).await?;
        let installments = reconcile::apply(&mut next, id, draft.installments).await?;

        *state = next;
        Ok(Some(UpdatedQuotation {
            services,
            installments,
        }))
    }

    async fn delete_quotation(&self, id: i32) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if state.quotations.remove(&id).is_none() {
            return Ok(false);
        }
        state.services.retain(|_, s| s.quotation_id != id);
        state.installments.retain(|_, i| i.quotation_id != id);
        Ok(true)
    }
}
