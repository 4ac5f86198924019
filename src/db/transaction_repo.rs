// src/db/transaction_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::finance::{
        NewTransaction, PaymentMethod, Transaction, TransactionFilter, TransactionStatus,
    },
};

#[derive(Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn create<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        data: &NewTransaction,
    ) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (
                tenant_id, kind, category, status, amount, payment_method,
                due_date, payment_date, description, notes,
                is_installment, installment_number, total_installments, parent_transaction_id,
                lead_id, appointment_id, procedure_id, supplier_id
            )
            VALUES (
                $1, $2, $3, $4, $5, $6,
                $7, $8, $9, $10,
                $11, $12, $13, $14,
                $15, $16, $17, $18
            )
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(data.kind)
        .bind(&data.category)
        .bind(data.status.unwrap_or(TransactionStatus::Pendente))
        .bind(data.amount)
        .bind(data.payment_method)
        .bind(data.due_date)
        .bind(data.payment_date)
        .bind(&data.description)
        .bind(&data.notes)
        .bind(data.is_installment)
        .bind(data.installment_number)
        .bind(data.total_installments)
        .bind(data.parent_transaction_id)
        .bind(data.lead_id)
        .bind(data.appointment_id)
        .bind(data.procedure_id)
        .bind(data.supplier_id)
        .fetch_one(executor)
        .await?;

        Ok(transaction)
    }

    /// Grava os campos editáveis já mesclados pelo serviço.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        merged: &Transaction,
    ) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions SET
                kind = $3,
                category = $4,
                status = $5,
                amount = $6,
                payment_method = $7,
                due_date = $8,
                description = $9,
                notes = $10,
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(merged.id)
        .bind(merged.tenant_id)
        .bind(merged.kind)
        .bind(&merged.category)
        .bind(merged.status)
        .bind(merged.amount)
        .bind(merged.payment_method)
        .bind(merged.due_date)
        .bind(&merged.description)
        .bind(&merged.notes)
        .fetch_one(executor)
        .await?;

        Ok(transaction)
    }

    /// Confirmação: carimba pagamento e aprovação em uma única escrita.
    /// A forma de pagamento, quando não informada, mantém a existente.
    pub async fn confirm<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
        payment_date: DateTime<Utc>,
        payment_method: Option<PaymentMethod>,
        approved_by_id: Uuid,
    ) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions SET
                status = 'CONFIRMADA',
                payment_date = $3,
                payment_method = COALESCE($4, payment_method),
                approved_at = now(),
                approved_by_id = $5,
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(payment_date)
        .bind(payment_method)
        .bind(approved_by_id)
        .fetch_one(executor)
        .await?;

        Ok(transaction)
    }

    /// Transições que só trocam status e trilha de auditoria
    /// (cancelamento, estorno, exclusão lógica).
    pub async fn set_status_with_notes<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
        status: TransactionStatus,
        notes: Option<&str>,
    ) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions SET
                status = $3,
                notes = $4,
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(status)
        .bind(notes)
        .fetch_one(executor)
        .await?;

        Ok(transaction)
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Transaction>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transaction = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(transaction)
    }

    /// A única primitiva de leitura: conjunção dos filtros informados,
    /// sempre restrita ao tenant, ordenada por vencimento decrescente.
    pub async fn query<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM transactions WHERE tenant_id = ");
        qb.push_bind(tenant_id);

        if let Some(kind) = filter.kind {
            qb.push(" AND kind = ");
            qb.push_bind(kind);
        }
        if let Some(ref category) = filter.category {
            qb.push(" AND category = ");
            qb.push_bind(category.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
        if let Some(payment_method) = filter.payment_method {
            qb.push(" AND payment_method = ");
            qb.push_bind(payment_method);
        }
        if let Some(lead_id) = filter.lead_id {
            qb.push(" AND lead_id = ");
            qb.push_bind(lead_id);
        }
        if let Some(appointment_id) = filter.appointment_id {
            qb.push(" AND appointment_id = ");
            qb.push_bind(appointment_id);
        }
        if let Some(supplier_id) = filter.supplier_id {
            qb.push(" AND supplier_id = ");
            qb.push_bind(supplier_id);
        }
        if let Some(start) = filter.payment_date_start {
            qb.push(" AND payment_date >= ");
            qb.push_bind(start);
        }
        if let Some(end) = filter.payment_date_end {
            qb.push(" AND payment_date <= ");
            qb.push_bind(end);
        }
        if let Some(start) = filter.due_date_start {
            qb.push(" AND due_date >= ");
            qb.push_bind(start);
        }
        if let Some(end) = filter.due_date_end {
            qb.push(" AND due_date <= ");
            qb.push_bind(end);
        }
        if let Some(ref description) = filter.description {
            qb.push(" AND description ILIKE ");
            qb.push_bind(format!("%{}%", description));
        }
        if let Some(min) = filter.min_amount {
            qb.push(" AND amount >= ");
            qb.push_bind(min);
        }
        if let Some(max) = filter.max_amount {
            qb.push(" AND amount <= ");
            qb.push_bind(max);
        }

        qb.push(" ORDER BY due_date DESC");

        let transactions = qb
            .build_query_as::<Transaction>()
            .fetch_all(executor)
            .await?;

        Ok(transactions)
    }
}
