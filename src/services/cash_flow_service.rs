// src/services/cash_flow_service.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    db::{CashFlowRepository, TransactionRepository},
    models::finance::{
        CashFlow, CashFlowSummary, CloseCashFlowData, DailyTotals, PaymentMethod, Transaction,
        TransactionFilter, TransactionKind, TransactionStatus, append_audit_note,
    },
};

#[derive(Clone)]
pub struct CashFlowService {
    repo: CashFlowRepository,
    transaction_repo: TransactionRepository,
}

impl CashFlowService {
    pub fn new(repo: CashFlowRepository, transaction_repo: TransactionRepository) -> Self {
        Self {
            repo,
            transaction_repo,
        }
    }

    /// Abre o caixa do dia. O índice único (tenant_id, date) garante
    /// que duas aberturas simultâneas não passem.
    pub async fn open<'e, E>(
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
        self.repo
            .create_opening(executor, tenant_id, date, opening_balance, opened_by_id)
            .await
    }

    /// Refaz os totais do dia a partir das transações confirmadas com
    /// pagamento dentro da janela [00:00:00.000, 23:59:59.999].
    pub async fn recompute_from_transactions<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        date: NaiveDate,
    ) -> Result<CashFlow, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let updated = self.recompute_on(&mut tx, tenant_id, date).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Sangria: acumula a retirada, registra a nota e refaz os totais.
    /// Tudo em uma transação só: o acumulado nunca fica gravado com um
    /// saldo de fechamento defasado.
    pub async fn record_withdrawal<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        acting_user_id: Uuid,
        amount: Decimal,
        notes: Option<&str>,
    ) -> Result<CashFlow, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let flow = self
            .repo
            .find_by_id(&mut *tx, id, tenant_id)
            .await?
            .ok_or(AppError::CashFlowNotFound)?;

        if flow.is_closed {
            return Err(AppError::CashFlowAlreadyClosed);
        }

        let new_notes = append_audit_note(
            flow.notes.as_deref(),
            "Sangria",
            &adjustment_note_text(amount, notes),
        );

        self.repo
            .add_withdrawal(&mut *tx, id, tenant_id, amount, Some(&new_notes))
            .await?;

        let updated = self.recompute_on(&mut tx, tenant_id, flow.date).await?;

        tx.commit().await?;

        tracing::info!("Sangria de {} no caixa {} pelo usuário {}", amount, id, acting_user_id);
        Ok(updated)
    }

    /// Reforço: espelho da sangria, no acumulado de entradas avulsas.
    pub async fn record_deposit<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        acting_user_id: Uuid,
        amount: Decimal,
        notes: Option<&str>,
    ) -> Result<CashFlow, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let flow = self
            .repo
            .find_by_id(&mut *tx, id, tenant_id)
            .await?
            .ok_or(AppError::CashFlowNotFound)?;

        if flow.is_closed {
            return Err(AppError::CashFlowAlreadyClosed);
        }

        let new_notes = append_audit_note(
            flow.notes.as_deref(),
            "Reforço",
            &adjustment_note_text(amount, notes),
        );

        self.repo
            .add_deposit(&mut *tx, id, tenant_id, amount, Some(&new_notes))
            .await?;

        let updated = self.recompute_on(&mut tx, tenant_id, flow.date).await?;

        tx.commit().await?;

        tracing::info!("Reforço de {} no caixa {} pelo usuário {}", amount, id, acting_user_id);
        Ok(updated)
    }

    /// Fechamento: os valores informados na conferência manual da gaveta
    /// são gravados como vieram. O sistema calcula o próprio número, guarda
    /// em computed_closing_balance e registra a divergência quando houver.
    pub async fn close<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        data: &CloseCashFlowData,
        closed_by_id: Uuid,
    ) -> Result<CashFlow, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let flow = self
            .repo
            .find_by_id(&mut *tx, id, tenant_id)
            .await?
            .ok_or(AppError::CashFlowNotFound)?;

        if flow.is_closed {
            return Err(AppError::CashFlowAlreadyClosed);
        }

        // Número do sistema, calculado com os acumulados que valerão
        // após o fechamento (o payload pode ajustá-los).
        let (window_start, window_end) = day_window(flow.date)?;
        let confirmed = self
            .transaction_repo
            .query(
                &mut *tx,
                tenant_id,
                &confirmed_in_window(window_start, window_end),
            )
            .await?;
        let totals = aggregate_day(&confirmed);

        let withdrawals = data.withdrawals.unwrap_or(flow.withdrawals);
        let deposits = data.deposits.unwrap_or(flow.deposits);
        let computed =
            compute_closing_balance(flow.opening_balance, &totals, deposits, withdrawals);

        let mut notes = flow.notes.clone();
        if let Some(extra) = data.notes.as_deref() {
            notes = Some(append_audit_note(notes.as_deref(), "Fechamento", extra));
        }
        if computed != data.closing_balance {
            notes = Some(append_audit_note(
                notes.as_deref(),
                "Divergência",
                &format!(
                    "sistema calculou R$ {}, informado R$ {}",
                    computed, data.closing_balance
                ),
            ));
        }

        let closed = self
            .repo
            .close(
                &mut *tx,
                id,
                tenant_id,
                data,
                computed,
                notes.as_deref(),
                closed_by_id,
            )
            .await?;

        tx.commit().await?;
        Ok(closed)
    }

    /// Consolidado do mês: contagens, somas e o saldo do registro mais
    /// recente.
    pub async fn summary<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        month: u32,
        year: i32,
    ) -> Result<CashFlowSummary, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (start, end) = month_window(year, month)?;
        let flows = self
            .repo
            .list_by_date_range(executor, tenant_id, start, end)
            .await?;

        Ok(summarize_month(month, year, &flows))
    }

    // Recálculo compartilhado: roda sempre dentro da transação do chamador.
    async fn recompute_on(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        date: NaiveDate,
    ) -> Result<CashFlow, AppError> {
        let flow = self
            .repo
            .find_by_date(&mut *conn, tenant_id, date)
            .await?
            .ok_or(AppError::CashFlowNotFound)?;

        if flow.is_closed {
            return Err(AppError::CashFlowAlreadyClosed);
        }

        let (window_start, window_end) = day_window(date)?;
        let confirmed = self
            .transaction_repo
            .query(
                &mut *conn,
                tenant_id,
                &confirmed_in_window(window_start, window_end),
            )
            .await?;

        let totals = aggregate_day(&confirmed);
        let closing_balance = compute_closing_balance(
            flow.opening_balance,
            &totals,
            flow.deposits,
            flow.withdrawals,
        );

        self.repo
            .update_totals(&mut *conn, flow.id, tenant_id, &totals, closing_balance)
            .await
    }
}

// ---
// Regras puras (testáveis sem banco)
// ---

/// Janela inclusiva do dia, em UTC.
pub(crate) fn day_window(date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let start = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("início do dia inválido"))?
        .and_utc();
    let end = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| anyhow::anyhow!("fim do dia inválido"))?
        .and_utc();
    Ok((start, end))
}

/// Primeiro e último dia do mês.
pub(crate) fn month_window(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid_month)?;

    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid_month)?;

    let end = next_month.pred_opt().ok_or_else(invalid_month)?;
    Ok((start, end))
}

fn invalid_month() -> AppError {
    let mut errors = ValidationErrors::new();
    let mut error = ValidationError::new("range");
    error.message = Some("Mês ou ano inválido.".into());
    errors.add("month", error);
    AppError::ValidationError(errors)
}

/// O filtro canônico do recálculo diário: confirmadas, pagas na janela.
fn confirmed_in_window(start: DateTime<Utc>, end: DateTime<Utc>) -> TransactionFilter {
    TransactionFilter {
        status: Some(TransactionStatus::Confirmada),
        payment_date_start: Some(start),
        payment_date_end: Some(end),
        ..Default::default()
    }
}

/// Dobra as transações confirmadas do dia em receitas, despesas e os seis
/// subtotais por forma de pagamento. Forma ausente ou OUTRO cai no balde
/// "outros".
pub(crate) fn aggregate_day(transactions: &[Transaction]) -> DailyTotals {
    let mut totals = DailyTotals::default();

    for transaction in transactions {
        match transaction.kind {
            TransactionKind::Receita => totals.total_income += transaction.amount,
            TransactionKind::Despesa => totals.total_expense += transaction.amount,
        }

        let bucket = match transaction.payment_method {
            Some(PaymentMethod::Dinheiro) => &mut totals.cash_amount,
            Some(PaymentMethod::Pix) => &mut totals.pix_amount,
            Some(PaymentMethod::CartaoCredito) => &mut totals.credit_card_amount,
            Some(PaymentMethod::CartaoDebito) => &mut totals.debit_card_amount,
            Some(PaymentMethod::TransferenciaBancaria) => &mut totals.transfer_amount,
            Some(PaymentMethod::Outro) | None => &mut totals.other_amount,
        };
        *bucket += transaction.amount;
    }

    totals
}

/// saldo final = abertura + receitas − despesas + reforços − sangrias
pub(crate) fn compute_closing_balance(
    opening_balance: Decimal,
    totals: &DailyTotals,
    deposits: Decimal,
    withdrawals: Decimal,
) -> Decimal {
    opening_balance + totals.total_income - totals.total_expense + deposits - withdrawals
}

fn adjustment_note_text(amount: Decimal, notes: Option<&str>) -> String {
    match notes {
        Some(notes) if !notes.trim().is_empty() => format!("R$ {} - {}", amount, notes),
        _ => format!("R$ {}", amount),
    }
}

/// Consolida a lista (já ordenada da data mais recente para a mais antiga)
/// em um resumo mensal. O "saldo atual" é o fechamento do primeiro item.
pub(crate) fn summarize_month(month: u32, year: i32, flows: &[CashFlow]) -> CashFlowSummary {
    let mut summary = CashFlowSummary {
        month,
        year,
        total_days: flows.len() as i64,
        closed_days: 0,
        open_days: 0,
        total_income: Decimal::ZERO,
        total_expense: Decimal::ZERO,
        total_withdrawals: Decimal::ZERO,
        total_deposits: Decimal::ZERO,
        net_flow: Decimal::ZERO,
        current_balance: flows
            .first()
            .map(|f| f.closing_balance)
            .unwrap_or(Decimal::ZERO),
    };

    for flow in flows {
        if flow.is_closed {
            summary.closed_days += 1;
        } else {
            summary.open_days += 1;
        }
        summary.total_income += flow.total_income;
        summary.total_expense += flow.total_expense;
        summary.total_withdrawals += flow.withdrawals;
        summary.total_deposits += flow.deposits;
    }

    summary.net_flow = summary.total_income - summary.total_expense;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::finance::CashFlowKind;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn confirmed_transaction(
        kind: TransactionKind,
        amount: Decimal,
        payment_method: Option<PaymentMethod>,
    ) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            kind,
            category: "Consulta".to_string(),
            status: TransactionStatus::Confirmada,
            amount,
            payment_method,
            due_date: date(2024, 3, 1),
            payment_date: Some(now),
            description: "Consulta de avaliação".to_string(),
            notes: None,
            is_installment: false,
            installment_number: None,
            total_installments: None,
            parent_transaction_id: None,
            lead_id: None,
            appointment_id: None,
            procedure_id: None,
            supplier_id: None,
            approved_at: Some(now),
            approved_by_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn daily_flow(
        day: NaiveDate,
        closing_balance: Decimal,
        is_closed: bool,
        total_income: Decimal,
        total_expense: Decimal,
        withdrawals: Decimal,
        deposits: Decimal,
    ) -> CashFlow {
        let now = Utc::now();
        CashFlow {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            date: day,
            kind: CashFlowKind::Abertura,
            opening_balance: Decimal::ZERO,
            total_income,
            total_expense,
            closing_balance,
            cash_amount: Decimal::ZERO,
            pix_amount: Decimal::ZERO,
            credit_card_amount: Decimal::ZERO,
            debit_card_amount: Decimal::ZERO,
            transfer_amount: Decimal::ZERO,
            other_amount: Decimal::ZERO,
            withdrawals,
            deposits,
            computed_closing_balance: None,
            notes: None,
            is_closed,
            opened_at: now,
            opened_by_id: Uuid::new_v4(),
            closed_at: None,
            closed_by_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn dobra_do_dia_separa_receita_despesa_e_baldes() {
        let transactions = vec![
            confirmed_transaction(TransactionKind::Receita, dec!(500.00), Some(PaymentMethod::Pix)),
            confirmed_transaction(
                TransactionKind::Despesa,
                dec!(120.00),
                Some(PaymentMethod::Dinheiro),
            ),
            confirmed_transaction(TransactionKind::Receita, dec!(80.00), None),
        ];

        let totals = aggregate_day(&transactions);

        assert_eq!(totals.total_income, dec!(580.00));
        assert_eq!(totals.total_expense, dec!(120.00));
        assert_eq!(totals.pix_amount, dec!(500.00));
        assert_eq!(totals.cash_amount, dec!(120.00));
        // Sem forma de pagamento cai em "outros"
        assert_eq!(totals.other_amount, dec!(80.00));
        assert_eq!(totals.credit_card_amount, Decimal::ZERO);
    }

    #[test]
    fn saldo_final_segue_a_algebra_do_caixa() {
        // Cenário: abre com 1000, recebe 500 via PIX
        let totals = aggregate_day(&[confirmed_transaction(
            TransactionKind::Receita,
            dec!(500.00),
            Some(PaymentMethod::Pix),
        )]);

        let sem_ajustes =
            compute_closing_balance(dec!(1000.00), &totals, Decimal::ZERO, Decimal::ZERO);
        assert_eq!(sem_ajustes, dec!(1500.00));

        // Depois de uma sangria de 200
        let com_sangria =
            compute_closing_balance(dec!(1000.00), &totals, Decimal::ZERO, dec!(200.00));
        assert_eq!(com_sangria, dec!(1300.00));
    }

    #[test]
    fn janela_do_dia_e_inclusiva_ate_o_ultimo_milissegundo() {
        let (start, end) = day_window(date(2024, 3, 1)).unwrap();

        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-03-01T23:59:59.999+00:00");
    }

    #[test]
    fn janela_do_mes_cobre_fevereiro_bissexto() {
        let (start, end) = month_window(2024, 2).unwrap();
        assert_eq!(start, date(2024, 2, 1));
        assert_eq!(end, date(2024, 2, 29));

        let (start, end) = month_window(2023, 12).unwrap();
        assert_eq!(start, date(2023, 12, 1));
        assert_eq!(end, date(2023, 12, 31));

        assert!(month_window(2024, 13).is_err());
    }

    #[test]
    fn resumo_mensal_conta_dias_e_usa_o_fechamento_mais_recente() {
        // Lista como o repositório devolve: data decrescente
        let flows = vec![
            daily_flow(
                date(2024, 3, 5),
                dec!(1300.00),
                false,
                dec!(500.00),
                dec!(0.00),
                dec!(200.00),
                dec!(0.00),
            ),
            daily_flow(
                date(2024, 3, 1),
                dec!(1000.00),
                true,
                dec!(800.00),
                dec!(300.00),
                dec!(0.00),
                dec!(50.00),
            ),
        ];

        let summary = summarize_month(3, 2024, &flows);

        assert_eq!(summary.total_days, 2);
        assert_eq!(summary.closed_days, 1);
        assert_eq!(summary.open_days, 1);
        assert_eq!(summary.total_income, dec!(1300.00));
        assert_eq!(summary.total_expense, dec!(300.00));
        assert_eq!(summary.total_withdrawals, dec!(200.00));
        assert_eq!(summary.total_deposits, dec!(50.00));
        assert_eq!(summary.net_flow, dec!(1000.00));
        assert_eq!(summary.current_balance, dec!(1300.00));
    }

    #[test]
    fn nota_de_ajuste_inclui_valor_e_motivo() {
        assert_eq!(adjustment_note_text(dec!(200.00), None), "R$ 200.00");
        assert_eq!(
            adjustment_note_text(dec!(200.00), Some("troco para o fim de semana")),
            "R$ 200.00 - troco para o fim de semana"
        );
    }
}
