// src/services/report_service.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TransactionRepository,
    models::finance::{
        FinancialStats, MonthlySummary, OpenAccountsReport, OverdueReport, Transaction,
        TransactionFilter, TransactionKind, TransactionStatus,
    },
    services::cash_flow_service::{day_window, month_window},
};

// Projeções de leitura sobre a primitiva de consulta de transações.
// Nenhum estado próprio: todo relatório é um filtro + uma dobra.
#[derive(Clone)]
pub struct ReportService {
    transaction_repo: TransactionRepository,
}

impl ReportService {
    pub fn new(transaction_repo: TransactionRepository) -> Self {
        Self { transaction_repo }
    }

    /// Totais por status e natureza, sobre todo o histórico da clínica.
    pub async fn stats<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<FinancialStats, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transactions = self
            .transaction_repo
            .query(executor, tenant_id, &TransactionFilter::default())
            .await?;

        Ok(fold_stats(&transactions))
    }

    /// Contas a receber em aberto (receitas pendentes).
    pub async fn accounts_receivable<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<OpenAccountsReport, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.open_accounts(executor, tenant_id, TransactionKind::Receita)
            .await
    }

    /// Contas a pagar em aberto (despesas pendentes).
    pub async fn accounts_payable<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<OpenAccountsReport, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.open_accounts(executor, tenant_id, TransactionKind::Despesa)
            .await
    }

    /// Pendências vencidas antes de `today`, separadas por natureza.
    pub async fn overdue<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        today: NaiveDate,
    ) -> Result<OverdueReport, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let yesterday = today
            .pred_opt()
            .ok_or_else(|| anyhow::anyhow!("data de referência fora do intervalo suportado"))?;

        let filter = TransactionFilter {
            status: Some(TransactionStatus::Pendente),
            due_date_end: Some(yesterday),
            ..Default::default()
        };

        let transactions = self.transaction_repo.query(executor, tenant_id, &filter).await?;
        Ok(fold_overdue(transactions))
    }

    /// Receitas e despesas confirmadas dentro do mês (pela data de pagamento).
    pub async fn monthly_summary<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        month: u32,
        year: i32,
    ) -> Result<MonthlySummary, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (first_day, last_day) = month_window(year, month)?;
        let (window_start, _) = day_window(first_day)?;
        let (_, window_end) = day_window(last_day)?;

        let filter = TransactionFilter {
            status: Some(TransactionStatus::Confirmada),
            payment_date_start: Some(window_start),
            payment_date_end: Some(window_end),
            ..Default::default()
        };

        let transactions = self.transaction_repo.query(executor, tenant_id, &filter).await?;
        Ok(fold_monthly(month, year, &transactions))
    }

    async fn open_accounts<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        kind: TransactionKind,
    ) -> Result<OpenAccountsReport, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let filter = TransactionFilter {
            kind: Some(kind),
            status: Some(TransactionStatus::Pendente),
            ..Default::default()
        };

        let transactions = self.transaction_repo.query(executor, tenant_id, &filter).await?;

        Ok(OpenAccountsReport {
            total: transactions.iter().map(|t| t.amount).sum(),
            count: transactions.len() as i64,
            transactions,
        })
    }
}

// ---
// Dobras puras (testáveis sem banco)
// ---

pub(crate) fn fold_stats(transactions: &[Transaction]) -> FinancialStats {
    let mut stats = FinancialStats {
        confirmed_income: Decimal::ZERO,
        confirmed_expense: Decimal::ZERO,
        pending_income: Decimal::ZERO,
        pending_expense: Decimal::ZERO,
        confirmed_count: 0,
        pending_count: 0,
        cancelled_count: 0,
        reversed_count: 0,
    };

    for transaction in transactions {
        match transaction.status {
            TransactionStatus::Confirmada => {
                stats.confirmed_count += 1;
                match transaction.kind {
                    TransactionKind::Receita => stats.confirmed_income += transaction.amount,
                    TransactionKind::Despesa => stats.confirmed_expense += transaction.amount,
                }
            }
            TransactionStatus::Pendente => {
                stats.pending_count += 1;
                match transaction.kind {
                    TransactionKind::Receita => stats.pending_income += transaction.amount,
                    TransactionKind::Despesa => stats.pending_expense += transaction.amount,
                }
            }
            TransactionStatus::Cancelada => stats.cancelled_count += 1,
            TransactionStatus::Estornada => stats.reversed_count += 1,
        }
    }

    stats
}

pub(crate) fn fold_overdue(transactions: Vec<Transaction>) -> OverdueReport {
    let (receivable, payable): (Vec<Transaction>, Vec<Transaction>) = transactions
        .into_iter()
        .partition(|t| t.kind == TransactionKind::Receita);

    OverdueReport {
        receivable_total: receivable.iter().map(|t| t.amount).sum(),
        payable_total: payable.iter().map(|t| t.amount).sum(),
        receivable,
        payable,
    }
}

pub(crate) fn fold_monthly(
    month: u32,
    year: i32,
    transactions: &[Transaction],
) -> MonthlySummary {
    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;

    for transaction in transactions {
        match transaction.kind {
            TransactionKind::Receita => total_income += transaction.amount,
            TransactionKind::Despesa => total_expense += transaction.amount,
        }
    }

    MonthlySummary {
        month,
        year,
        total_income,
        total_expense,
        net: total_income - total_expense,
        transaction_count: transactions.len() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::finance::PaymentMethod;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn transaction(
        kind: TransactionKind,
        status: TransactionStatus,
        amount: Decimal,
    ) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: uuid::Uuid::new_v4(),
            tenant_id: uuid::Uuid::new_v4(),
            kind,
            category: "Procedimento".to_string(),
            status,
            amount,
            payment_method: Some(PaymentMethod::Pix),
            due_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            payment_date: None,
            description: "Limpeza".to_string(),
            notes: None,
            is_installment: false,
            installment_number: None,
            total_installments: None,
            parent_transaction_id: None,
            lead_id: None,
            appointment_id: None,
            procedure_id: None,
            supplier_id: None,
            approved_at: None,
            approved_by_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn estatisticas_separam_status_e_natureza() {
        let stats = fold_stats(&[
            transaction(TransactionKind::Receita, TransactionStatus::Confirmada, dec!(500.00)),
            transaction(TransactionKind::Despesa, TransactionStatus::Confirmada, dec!(200.00)),
            transaction(TransactionKind::Receita, TransactionStatus::Pendente, dec!(150.00)),
            transaction(TransactionKind::Despesa, TransactionStatus::Cancelada, dec!(75.00)),
            transaction(TransactionKind::Receita, TransactionStatus::Estornada, dec!(90.00)),
        ]);

        assert_eq!(stats.confirmed_income, dec!(500.00));
        assert_eq!(stats.confirmed_expense, dec!(200.00));
        assert_eq!(stats.pending_income, dec!(150.00));
        assert_eq!(stats.pending_expense, Decimal::ZERO);
        assert_eq!(stats.confirmed_count, 2);
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.cancelled_count, 1);
        assert_eq!(stats.reversed_count, 1);
    }

    #[test]
    fn vencidas_sao_particionadas_por_natureza() {
        let report = fold_overdue(vec![
            transaction(TransactionKind::Receita, TransactionStatus::Pendente, dec!(300.00)),
            transaction(TransactionKind::Receita, TransactionStatus::Pendente, dec!(100.00)),
            transaction(TransactionKind::Despesa, TransactionStatus::Pendente, dec!(250.00)),
        ]);

        assert_eq!(report.receivable_total, dec!(400.00));
        assert_eq!(report.payable_total, dec!(250.00));
        assert_eq!(report.receivable.len(), 2);
        assert_eq!(report.payable.len(), 1);
    }

    #[test]
    fn resumo_mensal_calcula_o_liquido() {
        let summary = fold_monthly(
            3,
            2024,
            &[
                transaction(TransactionKind::Receita, TransactionStatus::Confirmada, dec!(800.00)),
                transaction(TransactionKind::Despesa, TransactionStatus::Confirmada, dec!(300.00)),
            ],
        );

        assert_eq!(summary.total_income, dec!(800.00));
        assert_eq!(summary.total_expense, dec!(300.00));
        assert_eq!(summary.net, dec!(500.00));
        assert_eq!(summary.transaction_count, 2);
    }
}
