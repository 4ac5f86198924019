// src/services/installment_service.rs

use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TransactionRepository,
    models::finance::{NewInstallmentPlan, NewTransaction, Transaction, TransactionStatus},
};

#[derive(Clone)]
pub struct InstallmentService {
    transaction_repo: TransactionRepository,
}

impl InstallmentService {
    pub fn new(transaction_repo: TransactionRepository) -> Self {
        Self { transaction_repo }
    }

    /// Desdobra um valor total em 1 transação-pai (agregada, CONFIRMADA)
    /// e N filhas (PENDENTE), com vencimentos mensais a partir do primeiro.
    /// Se qualquer inserção falhar, nada é persistido.
    ///
    /// Retorna apenas as filhas: o pai fica gravado mas fora do payload de
    /// sucesso.
    pub async fn plan<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        data: &NewInstallmentPlan,
    ) -> Result<Vec<Transaction>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let total = data.total_installments;
        let schedule = installment_schedule(data.total_amount, total, data.first_due_date)?;

        let mut tx = executor.begin().await?;

        // O pai carrega o valor cheio e nasce confirmado, mas sem
        // payment_date: o recálculo diário nunca o conta em cima das filhas.
        let parent = self
            .transaction_repo
            .create(
                &mut *tx,
                tenant_id,
                &NewTransaction {
                    kind: data.kind,
                    category: data.category.clone(),
                    status: Some(TransactionStatus::Confirmada),
                    amount: data.total_amount,
                    payment_method: data.payment_method,
                    due_date: data.first_due_date,
                    payment_date: None,
                    description: parent_description(&data.description, total),
                    notes: None,
                    is_installment: true,
                    installment_number: None,
                    total_installments: Some(total as i32),
                    parent_transaction_id: None,
                    lead_id: data.lead_id,
                    appointment_id: data.appointment_id,
                    procedure_id: data.procedure_id,
                    supplier_id: data.supplier_id,
                },
            )
            .await?;

        let mut children = Vec::with_capacity(total as usize);
        for (i, (amount, due_date)) in schedule.into_iter().enumerate() {
            let number = (i + 1) as u32;
            let child = self
                .transaction_repo
                .create(
                    &mut *tx,
                    tenant_id,
                    &NewTransaction {
                        kind: data.kind,
                        category: data.category.clone(),
                        status: Some(TransactionStatus::Pendente),
                        amount,
                        payment_method: data.payment_method,
                        due_date,
                        payment_date: None,
                        description: child_description(&data.description, number, total),
                        notes: None,
                        is_installment: true,
                        installment_number: Some(number as i32),
                        total_installments: Some(total as i32),
                        parent_transaction_id: Some(parent.id),
                        lead_id: data.lead_id,
                        appointment_id: data.appointment_id,
                        procedure_id: data.procedure_id,
                        supplier_id: data.supplier_id,
                    },
                )
                .await?;
            children.push(child);
        }

        tx.commit().await?;
        Ok(children)
    }
}

/// Divide o total em N parcelas com vencimento mensal (aritmética de
/// calendário, não blocos de 30 dias). Cada parcela é o total/N truncado
/// em 2 casas; a última absorve a sobra, de modo que a soma das parcelas
/// é exatamente o total pedido.
fn installment_schedule(
    total_amount: Decimal,
    total_installments: u32,
    first_due_date: NaiveDate,
) -> Result<Vec<(Decimal, NaiveDate)>, AppError> {
    if total_installments == 0 {
        return Err(AppError::InternalServerError(anyhow::anyhow!(
            "número de parcelas deve ser maior que zero"
        )));
    }

    let base = (total_amount / Decimal::from(total_installments))
        .round_dp_with_strategy(2, RoundingStrategy::ToZero);

    let mut schedule = Vec::with_capacity(total_installments as usize);
    for i in 0..total_installments {
        let amount = if i == total_installments - 1 {
            total_amount - base * Decimal::from(total_installments - 1)
        } else {
            base
        };

        let due_date = first_due_date
            .checked_add_months(Months::new(i))
            .ok_or_else(|| anyhow::anyhow!("vencimento da parcela fora do intervalo suportado"))?;

        schedule.push((amount, due_date));
    }

    Ok(schedule)
}

fn parent_description(description: &str, total_installments: u32) -> String {
    format!("{} (Total {}x)", description, total_installments)
}

fn child_description(description: &str, number: u32, total_installments: u32) -> String {
    format!("{} ({}/{})", description, number, total_installments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parcelas_iguais_quando_a_divisao_e_exata() {
        let schedule =
            installment_schedule(dec!(900.00), 3, date(2024, 1, 10)).unwrap();

        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[0], (dec!(300.00), date(2024, 1, 10)));
        assert_eq!(schedule[1], (dec!(300.00), date(2024, 2, 10)));
        assert_eq!(schedule[2], (dec!(300.00), date(2024, 3, 10)));
    }

    #[test]
    fn ultima_parcela_absorve_a_sobra() {
        let schedule = installment_schedule(dec!(100.00), 3, date(2024, 1, 10)).unwrap();

        assert_eq!(schedule[0].0, dec!(33.33));
        assert_eq!(schedule[1].0, dec!(33.33));
        assert_eq!(schedule[2].0, dec!(33.34));

        let soma: Decimal = schedule.iter().map(|(v, _)| *v).sum();
        assert_eq!(soma, dec!(100.00));
    }

    #[test]
    fn vencimento_usa_meses_de_calendario() {
        // 31 de janeiro + 1 mês cai no último dia de fevereiro (bissexto)
        let schedule = installment_schedule(dec!(300.00), 3, date(2024, 1, 31)).unwrap();

        assert_eq!(schedule[0].1, date(2024, 1, 31));
        assert_eq!(schedule[1].1, date(2024, 2, 29));
        assert_eq!(schedule[2].1, date(2024, 3, 31));
    }

    #[test]
    fn descricoes_seguem_o_padrao_de_parcelamento() {
        assert_eq!(parent_description("Tratamento", 3), "Tratamento (Total 3x)");
        assert_eq!(child_description("Tratamento", 1, 3), "Tratamento (1/3)");
        assert_eq!(child_description("Tratamento", 3, 3), "Tratamento (3/3)");
    }
}
