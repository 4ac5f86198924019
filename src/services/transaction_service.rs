// src/services/transaction_service.rs

use chrono::{DateTime, Utc};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    db::TransactionRepository,
    models::finance::{
        NewTransaction, PaymentMethod, Transaction, TransactionFilter, TransactionStatus,
        UpdateTransactionData, append_audit_note,
    },
};

#[derive(Clone)]
pub struct TransactionService {
    repo: TransactionRepository,
}

impl TransactionService {
    pub fn new(repo: TransactionRepository) -> Self {
        Self { repo }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        data: &NewTransaction,
    ) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.create(executor, tenant_id, data).await
    }

    pub async fn get<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_by_id(executor, id, tenant_id)
            .await?
            .ok_or(AppError::TransactionNotFound)
    }

    pub async fn query<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.query(executor, tenant_id, filter).await
    }

    /// Edição de campos. Transação confirmada é imutável: a única
    /// alteração aceita é a que a leva para ESTORNADA.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
        patch: &UpdateTransactionData,
    ) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id, tenant_id)
            .await?
            .ok_or(AppError::TransactionNotFound)?;

        ensure_update_allowed(current.status, patch.status)?;

        let merged = merge_patch(current, patch);
        let updated = self.repo.update(&mut *tx, &merged).await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// PENDENTE -> CONFIRMADA, carimbando pagamento e aprovação.
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
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id, tenant_id)
            .await?
            .ok_or(AppError::TransactionNotFound)?;

        ensure_can_confirm(current.status)?;

        let confirmed = self
            .repo
            .confirm(&mut *tx, id, tenant_id, payment_date, payment_method, approved_by_id)
            .await?;

        tx.commit().await?;
        Ok(confirmed)
    }

    /// PENDENTE -> CANCELADA. Confirmada não cancela: o caminho é o estorno.
    pub async fn cancel<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
        acting_user_id: Uuid,
        reason: Option<&str>,
    ) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id, tenant_id)
            .await?
            .ok_or(AppError::TransactionNotFound)?;

        ensure_can_cancel(current.status)?;

        let notes = match reason {
            Some(reason) => append_audit_note(current.notes.as_deref(), "Cancelamento", reason),
            None => append_audit_note(
                current.notes.as_deref(),
                "Cancelamento",
                "cancelada pelo usuário",
            ),
        };

        let cancelled = self
            .repo
            .set_status_with_notes(
                &mut *tx,
                id,
                tenant_id,
                TransactionStatus::Cancelada,
                Some(&notes),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Transação {} cancelada pelo usuário {}", id, acting_user_id);
        Ok(cancelled)
    }

    /// CONFIRMADA -> ESTORNADA. O motivo é obrigatório.
    pub async fn reverse<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
        acting_user_id: Uuid,
        reason: &str,
    ) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_reversal_reason(reason)?;

        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id, tenant_id)
            .await?
            .ok_or(AppError::TransactionNotFound)?;

        ensure_can_reverse(current.status)?;

        let notes = append_audit_note(current.notes.as_deref(), "Estorno", reason);

        let reversed = self
            .repo
            .set_status_with_notes(
                &mut *tx,
                id,
                tenant_id,
                TransactionStatus::Estornada,
                Some(&notes),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Transação {} estornada pelo usuário {}", id, acting_user_id);
        Ok(reversed)
    }

    /// "Exclusão" lógica: a linha nunca sai do banco, vira CANCELADA
    /// com nota de auditoria.
    pub async fn soft_delete<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id, tenant_id)
            .await?
            .ok_or(AppError::TransactionNotFound)?;

        ensure_can_soft_delete(current.status)?;

        let notes = append_audit_note(
            current.notes.as_deref(),
            "Exclusão",
            "registro excluído pelo usuário",
        );

        let deleted = self
            .repo
            .set_status_with_notes(
                &mut *tx,
                id,
                tenant_id,
                TransactionStatus::Cancelada,
                Some(&notes),
            )
            .await?;

        tx.commit().await?;
        Ok(deleted)
    }
}

// ---
// Regras de transição de status (puras, testáveis sem banco)
// ---

fn ensure_can_confirm(status: TransactionStatus) -> Result<(), AppError> {
    match status {
        TransactionStatus::Pendente => Ok(()),
        TransactionStatus::Confirmada => Err(AppError::InvalidStatusTransition(
            "a transação já está confirmada".to_string(),
        )),
        TransactionStatus::Cancelada | TransactionStatus::Estornada => {
            Err(AppError::InvalidStatusTransition(
                "transação cancelada ou estornada não pode ser confirmada".to_string(),
            ))
        }
    }
}

fn ensure_can_cancel(status: TransactionStatus) -> Result<(), AppError> {
    match status {
        TransactionStatus::Pendente => Ok(()),
        TransactionStatus::Confirmada => Err(AppError::InvalidStatusTransition(
            "transação confirmada deve ser estornada, não cancelada".to_string(),
        )),
        TransactionStatus::Cancelada | TransactionStatus::Estornada => {
            Err(AppError::InvalidStatusTransition(
                "a transação já está encerrada".to_string(),
            ))
        }
    }
}

fn ensure_can_reverse(status: TransactionStatus) -> Result<(), AppError> {
    match status {
        TransactionStatus::Confirmada => Ok(()),
        _ => Err(AppError::InvalidStatusTransition(
            "apenas transações confirmadas podem ser estornadas".to_string(),
        )),
    }
}

fn ensure_can_soft_delete(status: TransactionStatus) -> Result<(), AppError> {
    match status {
        TransactionStatus::Confirmada => Err(AppError::InvalidStatusTransition(
            "transação confirmada não pode ser excluída; faça o estorno".to_string(),
        )),
        _ => Ok(()),
    }
}

fn ensure_update_allowed(
    current: TransactionStatus,
    patch_status: Option<TransactionStatus>,
) -> Result<(), AppError> {
    if current == TransactionStatus::Confirmada
        && patch_status != Some(TransactionStatus::Estornada)
    {
        return Err(AppError::InvalidStatusTransition(
            "transação confirmada só aceita a transição para estornada".to_string(),
        ));
    }
    Ok(())
}

fn ensure_reversal_reason(reason: &str) -> Result<(), AppError> {
    if reason.trim().is_empty() {
        let mut errors = ValidationErrors::new();
        let mut error = ValidationError::new("length");
        error.message = Some("O motivo do estorno é obrigatório.".into());
        errors.add("reason", error);
        return Err(AppError::ValidationError(errors));
    }
    Ok(())
}

fn merge_patch(mut current: Transaction, patch: &UpdateTransactionData) -> Transaction {
    if let Some(kind) = patch.kind {
        current.kind = kind;
    }
    if let Some(category) = &patch.category {
        current.category = category.clone();
    }
    if let Some(status) = patch.status {
        current.status = status;
    }
    if let Some(amount) = patch.amount {
        current.amount = amount;
    }
    if let Some(payment_method) = patch.payment_method {
        current.payment_method = Some(payment_method);
    }
    if let Some(due_date) = patch.due_date {
        current.due_date = due_date;
    }
    if let Some(description) = &patch.description {
        current.description = description.clone();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmar_so_sai_de_pendente() {
        assert!(ensure_can_confirm(TransactionStatus::Pendente).is_ok());
        assert!(ensure_can_confirm(TransactionStatus::Confirmada).is_err());
        assert!(ensure_can_confirm(TransactionStatus::Cancelada).is_err());
        assert!(ensure_can_confirm(TransactionStatus::Estornada).is_err());
    }

    #[test]
    fn cancelar_rejeita_confirmada() {
        assert!(ensure_can_cancel(TransactionStatus::Pendente).is_ok());
        let err = ensure_can_cancel(TransactionStatus::Confirmada).unwrap_err();
        assert!(matches!(err, AppError::InvalidStatusTransition(_)));
    }

    #[test]
    fn estornar_exige_confirmada() {
        assert!(ensure_can_reverse(TransactionStatus::Confirmada).is_ok());
        assert!(ensure_can_reverse(TransactionStatus::Pendente).is_err());
        assert!(ensure_can_reverse(TransactionStatus::Cancelada).is_err());
        assert!(ensure_can_reverse(TransactionStatus::Estornada).is_err());
    }

    #[test]
    fn estornar_exige_motivo_preenchido() {
        assert!(ensure_reversal_reason("lançamento duplicado").is_ok());
        assert!(matches!(
            ensure_reversal_reason("   "),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn excluir_rejeita_confirmada() {
        assert!(ensure_can_soft_delete(TransactionStatus::Pendente).is_ok());
        assert!(ensure_can_soft_delete(TransactionStatus::Cancelada).is_ok());
        assert!(ensure_can_soft_delete(TransactionStatus::Confirmada).is_err());
    }

    #[test]
    fn editar_confirmada_so_para_estornada() {
        // Imutabilidade: confirmada aceita apenas o patch que estorna
        assert!(
            ensure_update_allowed(
                TransactionStatus::Confirmada,
                Some(TransactionStatus::Estornada)
            )
            .is_ok()
        );
        assert!(ensure_update_allowed(TransactionStatus::Confirmada, None).is_err());
        assert!(
            ensure_update_allowed(
                TransactionStatus::Confirmada,
                Some(TransactionStatus::Cancelada)
            )
            .is_err()
        );
        // Pendente segue editável
        assert!(ensure_update_allowed(TransactionStatus::Pendente, None).is_ok());
    }

    #[test]
    fn nota_de_auditoria_preserva_o_formato() {
        assert_eq!(
            append_audit_note(None, "Cancelamento", "paciente desistiu"),
            "Cancelamento: paciente desistiu"
        );
        assert_eq!(
            append_audit_note(Some("Sinal recebido"), "Estorno", "valor duplicado"),
            "Sinal recebido\nEstorno: valor duplicado"
        );
    }
}
