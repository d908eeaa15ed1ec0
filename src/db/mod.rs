mod memory;

pub use memory::MemoryStore;

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::PgPool;
use thiserror::Error;

use crate::config::Config;
use crate::models::{
    Admin, Installment, InstallmentFields, Quotation, QuotationDetail, QuotationDraft,
    QuotationHeader, Service, ServiceFields,
};
use crate::reconcile::{
    self, ApplyOutcome, ChildRows, ChildStore, ChildTable, ReconcileError, Upsert, UpsertOutcome,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedQuotation {
    pub id: i32,
    pub services: u64,
    pub installments: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatedQuotation {
    pub services: ApplyOutcome,
    pub installments: ApplyOutcome,
}

/// Quotation persistence used by the HTTP handlers.
///
/// Create, update and delete are atomic: either every header and child
/// write lands or none does.
#[async_trait]
pub trait QuotationStore: Send + Sync {
    async fn find_admin(&self, email: &str) -> Result<Option<Admin>, StoreError>;

    async fn list_quotations(&self) -> Result<Vec<QuotationDetail>, StoreError>;

    async fn get_quotation(&self, id: i32) -> Result<Option<QuotationDetail>, StoreError>;

    /// Child row ids in `draft` are ignored; every child is inserted fresh.
    async fn create_quotation(&self, draft: QuotationDraft) -> Result<CreatedQuotation, StoreError>;

    /// Returns `None` when no quotation has this id.
    async fn update_quotation(
        &self,
        id: i32,
        draft: QuotationDraft,
    ) -> Result<Option<UpdatedQuotation>, StoreError>;

    /// Returns `false` when no quotation has this id.
    async fn delete_quotation(&self, id: i32) -> Result<bool, StoreError>;
}

const QUOTATION_COLUMNS: &str = "id, name, email, gender, domain, date, total, total_discount, \
                                 final_amount, total_service, input_count";

/// Database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout_secs))
            .connect(config.database_url()?)
            .await
            .context("failed to connect to the database")?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    async fn write_header(
        conn: &mut PgConnection,
        id: Option<i32>,
        header: &QuotationHeader,
    ) -> Result<Option<i32>, StoreError> {
        let sql = match id {
            None => {
                r#"
                INSERT INTO quotations
                    (name, email, gender, domain, date, total, total_discount,
                     final_amount, total_service, input_count)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING id
                "#
            }
            Some(_) => {
                r#"
                UPDATE quotations
                SET name = $1, email = $2, gender = $3, domain = $4, date = $5, total = $6,
                    total_discount = $7, final_amount = $8, total_service = $9, input_count = $10
                WHERE id = $11
                RETURNING id
                "#
            }
        };

        let mut query = sqlx::query_scalar::<_, i32>(sql)
            .bind(&header.name)
            .bind(&header.email)
            .bind(&header.gender)
            .bind(&header.domain)
            .bind(header.date)
            .bind(header.total)
            .bind(header.total_discount)
            .bind(header.final_amount)
            .bind(header.total_service)
            .bind(header.input_count);
        if let Some(id) = id {
            query = query.bind(id);
        }

        Ok(query.fetch_optional(conn).await?)
    }

    async fn reconcile_children(
        conn: &mut PgConnection,
        quotation_id: i32,
        draft: QuotationDraft,
    ) -> Result<UpdatedQuotation, StoreError> {
        let mut children = PgChildStore { conn };
        let services = reconcile::apply(&mut children, quotation_id, draft.services).await?;
        let installments =
            reconcile::apply(&mut children, quotation_id, draft.installments).await?;

        Ok(UpdatedQuotation {
            services,
            installments,
        })
    }
}

#[async_trait]
impl QuotationStore for Database {
    async fn find_admin(&self, email: &str) -> Result<Option<Admin>, StoreError> {
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT id, email, password_hash FROM admins WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(admin)
    }

    async fn list_quotations(&self) -> Result<Vec<QuotationDetail>, StoreError> {
        let quotations = sqlx::query_as::<_, Quotation>(&format!(
            "SELECT {QUOTATION_COLUMNS} FROM quotations ORDER BY id ASC"
        ))
        .fetch_all(self.get_pool())
        .await?;

        let services = sqlx::query_as::<_, Service>(
            r#"
            SELECT id, quotation_id, service_name, price, discount, grand_total
            FROM services
            ORDER BY quotation_id ASC, id ASC
            "#,
        )
        .fetch_all(self.get_pool())
        .await?;

        let installments = sqlx::query_as::<_, Installment>(
            r#"
            SELECT id, quotation_id, label, due_when, installment_amount
            FROM payments
            ORDER BY quotation_id ASC, id ASC
            "#,
        )
        .fetch_all(self.get_pool())
        .await?;

        Ok(QuotationDetail::assemble(quotations, services, installments))
    }

    async fn get_quotation(&self, id: i32) -> Result<Option<QuotationDetail>, StoreError> {
        let Some(quotation) = sqlx::query_as::<_, Quotation>(&format!(
            "SELECT {QUOTATION_COLUMNS} FROM quotations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?
        else {
            return Ok(None);
        };

        let services = sqlx::query_as::<_, Service>(
            r#"
            SELECT id, quotation_id, service_name, price, discount, grand_total
            FROM services
            WHERE quotation_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id)
        .fetch_all(self.get_pool())
        .await?;

        let installments = sqlx::query_as::<_, Installment>(
            r#"
            SELECT id, quotation_id, label, due_when, installment_amount
            FROM payments
            WHERE quotation_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(Some(QuotationDetail::new(quotation, services, installments)))
    }

    async fn create_quotation(&self, draft: QuotationDraft) -> Result<CreatedQuotation, StoreError> {
        let draft = draft.without_row_ids();
        let mut tx = self.pool.begin().await?;

        let id = Self::write_header(&mut tx, None, &draft.header)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        let children = Self::reconcile_children(&mut tx, id, draft).await?;

        tx.commit().await?;

        Ok(CreatedQuotation {
            id,
            services: children.services.inserted,
            installments: children.installments.inserted,
        })
    }

    async fn update_quotation(
        &self,
        id: i32,
        draft: QuotationDraft,
    ) -> Result<Option<UpdatedQuotation>, StoreError> {
        let mut tx = self.pool.begin().await?;

        if Self::write_header(&mut tx, Some(id), &draft.header)
            .await?
            .is_none()
        {
            return Ok(None);
        }
        let children = Self::reconcile_children(&mut tx, id, draft).await?;

        tx.commit().await?;

        Ok(Some(children))
    }

    async fn delete_quotation(&self, id: i32) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM payments WHERE quotation_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM services WHERE quotation_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM quotations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(deleted > 0)
    }
}

/// Child-table access inside an open transaction.
struct PgChildStore<'a> {
    conn: &'a mut PgConnection,
}

impl PgChildStore<'_> {
    async fn upsert_services(
        &mut self,
        quotation_id: i32,
        rows: &[Upsert<ServiceFields>],
    ) -> Result<UpsertOutcome, StoreError> {
        let mut outcome = UpsertOutcome::default();

        for row in rows {
            let ServiceFields {
                service_name,
                price,
                discount,
                grand_total,
            } = row.fields();

            match row {
                Upsert::Update { id, .. } => {
                    sqlx::query(
                        r#"
                        UPDATE services
                        SET service_name = $1, price = $2, discount = $3, grand_total = $4
                        WHERE id = $5 AND quotation_id = $6
                        "#,
                    )
                    .bind(service_name)
                    .bind(price)
                    .bind(discount)
                    .bind(grand_total)
                    .bind(id)
                    .bind(quotation_id)
                    .execute(&mut *self.conn)
                    .await?;
                    outcome.updated += 1;
                }
                Upsert::Insert { .. } => {
                    sqlx::query(
                        r#"
                        INSERT INTO services (quotation_id, service_name, price, discount, grand_total)
                        VALUES ($1, $2, $3, $4, $5)
                        "#,
                    )
                    .bind(quotation_id)
                    .bind(service_name)
                    .bind(price)
                    .bind(discount)
                    .bind(grand_total)
                    .execute(&mut *self.conn)
                    .await?;
                    outcome.inserted += 1;
                }
            }
        }

        Ok(outcome)
    }

    async fn upsert_installments(
        &mut self,
        quotation_id: i32,
        rows: &[Upsert<InstallmentFields>],
    ) -> Result<UpsertOutcome, StoreError> {
        let mut outcome = UpsertOutcome::default();

        for row in rows {
            let InstallmentFields {
                label,
                due_when,
                installment_amount,
            } = row.fields();

            match row {
                Upsert::Update { id, .. } => {
                    sqlx::query(
                        r#"
                        UPDATE payments
                        SET label = $1, due_when = $2, installment_amount = $3
                        WHERE id = $4 AND quotation_id = $5
                        "#,
                    )
                    .bind(label)
                    .bind(due_when)
                    .bind(installment_amount)
                    .bind(id)
                    .bind(quotation_id)
                    .execute(&mut *self.conn)
                    .await?;
                    outcome.updated += 1;
                }
                Upsert::Insert { .. } => {
                    sqlx::query(
                        r#"
                        INSERT INTO payments (quotation_id, label, due_when, installment_amount)
                        VALUES ($1, $2, $3, $4)
                        "#,
                    )
                    .bind(quotation_id)
                    .bind(label)
                    .bind(due_when)
                    .bind(installment_amount)
                    .execute(&mut *self.conn)
                    .await?;
                    outcome.inserted += 1;
                }
            }
        }

        Ok(outcome)
    }
}

#[async_trait]
impl ChildStore for PgChildStore<'_> {
    async fn list_existing_ids(
        &mut self,
        quotation_id: i32,
        table: ChildTable,
    ) -> Result<BTreeSet<i32>, StoreError> {
        let ids = sqlx::query_scalar::<_, i32>(&format!(
            "SELECT id FROM {} WHERE quotation_id = $1",
            table.table_name()
        ))
        .bind(quotation_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn delete_by_ids(
        &mut self,
        quotation_id: i32,
        table: ChildTable,
        ids: &BTreeSet<i32>,
    ) -> Result<u64, StoreError> {
        let ids: Vec<i32> = ids.iter().copied().collect();
        let deleted = sqlx::query(&format!(
            "DELETE FROM {} WHERE quotation_id = $1 AND id = ANY($2)",
            table.table_name()
        ))
        .bind(quotation_id)
        .bind(ids)
        .execute(&mut *self.conn)
        .await?
        .rows_affected();

        Ok(deleted)
    }

    async fn upsert_rows(
        &mut self,
        quotation_id: i32,
        rows: ChildRows<'_>,
    ) -> Result<UpsertOutcome, StoreError> {
        match rows {
            ChildRows::Services(rows) => self.upsert_services(quotation_id, rows).await,
            ChildRows::Installments(rows) => self.upsert_installments(quotation_id, rows).await,
        }
    }
}

/// Initialize the database connection pool
pub async fn init(config: &Config) -> Result<Database> {
    let db = Database::new(config).await?;

    if config.run_migrations {
        sqlx::migrate!()
            .run(db.get_pool())
            .await
            .context("failed to run migrations")?;
        tracing::info!("Database migrations applied");
    }

    Ok(db)
}
