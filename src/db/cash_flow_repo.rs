// src/db/cash_flow_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::finance::{CashFlow, CloseCashFlowData, DailyTotals},
};

#[derive(Clone)]
pub struct CashFlowRepository {
    pool: PgPool,
}

impl CashFlowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Abre o caixa do dia. A unicidade (tenant_id, date) é garantida pelo
    /// índice único do banco: inserimos direto e traduzimos o conflito,
    /// sem janela de corrida de "consulta e depois insere".
    pub async fn create_opening<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        date: NaiveDate,
        opening_balance: Decimal,
        opened_by_id: Uuid,
    ) -> Result<CashFlow, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, CashFlow>(
            r#"
            INSERT INTO cash_flows (tenant_id, date, kind, opening_balance, closing_balance, opened_by_id)
            VALUES ($1, $2, 'ABERTURA', $3, $3, $4)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(date)
        .bind(opening_balance)
        .bind(opened_by_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::CashFlowAlreadyExists(date);
                }
            }
            e.into()
        })
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<CashFlow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cash_flow = sqlx::query_as::<_, CashFlow>(
            "SELECT * FROM cash_flows WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(cash_flow)
    }

    pub async fn find_by_date<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<CashFlow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cash_flow = sqlx::query_as::<_, CashFlow>(
            "SELECT * FROM cash_flows WHERE tenant_id = $1 AND date = $2",
        )
        .bind(tenant_id)
        .bind(date)
        .fetch_optional(executor)
        .await?;

        Ok(cash_flow)
    }

    /// Grava o resultado de um recálculo diário. `deposits`/`withdrawals`
    /// não são tocados aqui: o recálculo só refaz receitas, despesas,
    /// subtotais por forma de pagamento e o saldo de fechamento.
    pub async fn update_totals<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
        totals: &DailyTotals,
        closing_balance: Decimal,
    ) -> Result<CashFlow, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cash_flow = sqlx::query_as::<_, CashFlow>(
            r#"
            UPDATE cash_flows SET
                total_income = $3,
                total_expense = $4,
                cash_amount = $5,
                pix_amount = $6,
                credit_card_amount = $7,
                debit_card_amount = $8,
                transfer_amount = $9,
                other_amount = $10,
                closing_balance = $11,
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(totals.total_income)
        .bind(totals.total_expense)
        .bind(totals.cash_amount)
        .bind(totals.pix_amount)
        .bind(totals.credit_card_amount)
        .bind(totals.debit_card_amount)
        .bind(totals.transfer_amount)
        .bind(totals.other_amount)
        .bind(closing_balance)
        .fetch_one(executor)
        .await?;

        Ok(cash_flow)
    }

    /// Sangria: soma ao acumulado do dia e marca a última operação.
    pub async fn add_withdrawal<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
        amount: Decimal,
        notes: Option<&str>,
    ) -> Result<CashFlow, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cash_flow = sqlx::query_as::<_, CashFlow>(
            r#"
            UPDATE cash_flows SET
                withdrawals = withdrawals + $3,
                kind = 'SANGRIA',
                notes = $4,
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(amount)
        .bind(notes)
        .fetch_one(executor)
        .await?;

        Ok(cash_flow)
    }

    /// Reforço: idem à sangria, no acumulado de entradas avulsas.
    pub async fn add_deposit<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
        amount: Decimal,
        notes: Option<&str>,
    ) -> Result<CashFlow, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cash_flow = sqlx::query_as::<_, CashFlow>(
            r#"
            UPDATE cash_flows SET
                deposits = deposits + $3,
                kind = 'REFORCO',
                notes = $4,
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(amount)
        .bind(notes)
        .fetch_one(executor)
        .await?;

        Ok(cash_flow)
    }

    /// Fechamento: os totais informados pelo operador são gravados como
    /// vieram; o saldo calculado pelo sistema fica em
    /// computed_closing_balance para conferência posterior.
    pub async fn close<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
        data: &CloseCashFlowData,
        computed_closing_balance: Decimal,
        notes: Option<&str>,
        closed_by_id: Uuid,
    ) -> Result<CashFlow, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cash_flow = sqlx::query_as::<_, CashFlow>(
            r#"
            UPDATE cash_flows SET
                kind = 'FECHAMENTO',
                closing_balance = $3,
                cash_amount = $4,
                pix_amount = $5,
                credit_card_amount = $6,
                debit_card_amount = $7,
                transfer_amount = $8,
                other_amount = $9,
                withdrawals = COALESCE($10, withdrawals),
                deposits = COALESCE($11, deposits),
                computed_closing_balance = $12,
                notes = $13,
                is_closed = TRUE,
                closed_at = now(),
                closed_by_id = $14,
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(data.closing_balance)
        .bind(data.cash_amount)
        .bind(data.pix_amount)
        .bind(data.credit_card_amount)
        .bind(data.debit_card_amount)
        .bind(data.transfer_amount)
        .bind(data.other_amount)
        .bind(data.withdrawals)
        .bind(data.deposits)
        .bind(computed_closing_balance)
        .bind(notes)
        .bind(closed_by_id)
        .fetch_one(executor)
        .await?;

        Ok(cash_flow)
    }

    /// Caixas de um intervalo de datas, do mais recente para o mais antigo.
    pub async fn list_by_date_range<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CashFlow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cash_flows = sqlx::query_as::<_, CashFlow>(
            r#"
            SELECT * FROM cash_flows
            WHERE tenant_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date DESC
            "#,
        )
        .bind(tenant_id)
        .bind(start)
        .bind(end)
        .fetch_all(executor)
        .await?;

        Ok(cash_flows)
    }
}
