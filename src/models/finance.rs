// src/models/finance.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

/// Natureza da movimentação: entrada (receita) ou saída (despesa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "transaction_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Receita,
    Despesa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "transaction_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pendente,
    Confirmada,
    Cancelada,
    Estornada,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Dinheiro,
    Pix,
    CartaoCredito,
    CartaoDebito,
    TransferenciaBancaria,
    Outro,
}

/// Última operação aplicada ao caixa do dia (não é um histórico).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "cash_flow_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashFlowKind {
    Abertura,
    Fechamento,
    Sangria,
    Reforco,
}

// --- Structs ---

/// Uma movimentação monetária (conta a receber ou a pagar).
/// Nunca é apagada fisicamente: "exclusão" vira CANCELADA com nota de auditoria.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(ignore)]
    pub tenant_id: Uuid,

    pub kind: TransactionKind,

    #[schema(example = "Consulta")]
    pub category: String,

    pub status: TransactionStatus,

    #[schema(example = "350.00")]
    pub amount: Decimal,

    pub payment_method: Option<PaymentMethod>,

    #[schema(value_type = String, format = Date, example = "2024-03-10")]
    pub due_date: NaiveDate,

    pub payment_date: Option<DateTime<Utc>>,

    #[schema(example = "Consulta de avaliação")]
    pub description: String,

    // Trilha de auditoria em texto livre (apenas append)
    pub notes: Option<String>,

    // Parcelamento
    pub is_installment: bool,
    pub installment_number: Option<i32>,
    pub total_installments: Option<i32>,
    pub parent_transaction_id: Option<Uuid>,

    // Vínculos opacos (pertencem a outros módulos)
    pub lead_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub procedure_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,

    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// O registro de caixa de um dia: no máximo um por (clínica, data).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashFlow {
    pub id: Uuid,

    #[schema(ignore)]
    pub tenant_id: Uuid,

    #[schema(value_type = String, format = Date, example = "2024-03-01")]
    pub date: NaiveDate,

    pub kind: CashFlowKind,

    #[schema(example = "1000.00")]
    pub opening_balance: Decimal,
    #[schema(example = "500.00")]
    pub total_income: Decimal,
    #[schema(example = "0.00")]
    pub total_expense: Decimal,
    #[schema(example = "1500.00")]
    pub closing_balance: Decimal,

    // Subtotais por forma de pagamento
    pub cash_amount: Decimal,
    pub pix_amount: Decimal,
    pub credit_card_amount: Decimal,
    pub debit_card_amount: Decimal,
    pub transfer_amount: Decimal,
    pub other_amount: Decimal,

    // Acumulados do dia (nunca diminuem)
    pub withdrawals: Decimal,
    pub deposits: Decimal,

    // Valor que o sistema calculou no fechamento, guardado ao lado do informado
    pub computed_closing_balance: Option<Decimal>,

    pub notes: Option<String>,
    pub is_closed: bool,

    pub opened_at: DateTime<Utc>,
    pub opened_by_id: Uuid,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dados de inserção de uma transação. O status, quando ausente, nasce PENDENTE.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub category: String,
    pub status: Option<TransactionStatus>,
    pub amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub due_date: NaiveDate,
    pub payment_date: Option<DateTime<Utc>>,
    pub description: String,
    pub notes: Option<String>,
    pub is_installment: bool,
    pub installment_number: Option<i32>,
    pub total_installments: Option<i32>,
    pub parent_transaction_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub procedure_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

// --- Filtro de consulta (a única primitiva de leitura de transações) ---

/// Conjunção de filtros; todo relatório nasce de uma combinação destes campos.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub status: Option<TransactionStatus>,
    pub payment_method: Option<PaymentMethod>,

    pub lead_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,

    // Intervalos inclusivos
    pub payment_date_start: Option<DateTime<Utc>>,
    pub payment_date_end: Option<DateTime<Utc>>,
    #[param(value_type = Option<String>, format = Date)]
    pub due_date_start: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub due_date_end: Option<NaiveDate>,

    // Busca por trecho da descrição
    pub description: Option<String>,

    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

/// Alteração parcial de uma transação. `None` mantém o valor atual.
/// As notas ficam de fora: a trilha de auditoria só cresce pelas
/// operações de ciclo de vida (cancelar, estornar, excluir).
#[derive(Debug, Clone, Default)]
pub struct UpdateTransactionData {
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub status: Option<TransactionStatus>,
    pub amount: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub due_date: Option<NaiveDate>,
    pub description: Option<String>,
}

/// Pedido de parcelamento: um valor total que vira 1 pai + N filhas.
#[derive(Debug, Clone)]
pub struct NewInstallmentPlan {
    pub kind: TransactionKind,
    pub category: String,
    pub total_amount: Decimal,
    pub total_installments: u32,
    pub first_due_date: NaiveDate,
    pub description: String,
    pub payment_method: Option<PaymentMethod>,
    pub lead_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub procedure_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

/// Convenção da trilha de auditoria em `notes`: cada operação acrescenta
/// uma linha `"\n<Rótulo>: <texto>"` ao texto existente. Operadores leem
/// esse campo como histórico manual; o formato não deve mudar.
pub fn append_audit_note(existing: Option<&str>, label: &str, text: &str) -> String {
    match existing {
        Some(notes) if !notes.is_empty() => format!("{}\n{}: {}", notes, label, text),
        _ => format!("{}: {}", label, text),
    }
}

/// Totais de um dia recalculados a partir das transações confirmadas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyTotals {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub cash_amount: Decimal,
    pub pix_amount: Decimal,
    pub credit_card_amount: Decimal,
    pub debit_card_amount: Decimal,
    pub transfer_amount: Decimal,
    pub other_amount: Decimal,
}

/// Valores informados pelo operador no fechamento do caixa (conferência
/// manual da gaveta). São gravados como vieram; o valor calculado pelo
/// sistema fica registrado ao lado para auditoria.
#[derive(Debug, Clone)]
pub struct CloseCashFlowData {
    pub closing_balance: Decimal,
    pub cash_amount: Decimal,
    pub pix_amount: Decimal,
    pub credit_card_amount: Decimal,
    pub debit_card_amount: Decimal,
    pub transfer_amount: Decimal,
    pub other_amount: Decimal,
    pub withdrawals: Option<Decimal>,
    pub deposits: Option<Decimal>,
    pub notes: Option<String>,
}

// --- DTOs de relatórios ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialStats {
    pub confirmed_income: Decimal,
    pub confirmed_expense: Decimal,
    pub pending_income: Decimal,
    pub pending_expense: Decimal,
    pub confirmed_count: i64,
    pub pending_count: i64,
    pub cancelled_count: i64,
    pub reversed_count: i64,
}

/// Contas a receber ou a pagar em aberto.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenAccountsReport {
    pub total: Decimal,
    pub count: i64,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverdueReport {
    pub receivable_total: Decimal,
    pub payable_total: Decimal,
    pub receivable: Vec<Transaction>,
    pub payable: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub month: u32,
    pub year: i32,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
    pub transaction_count: i64,
}

/// Consolidado mensal dos caixas diários.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowSummary {
    pub month: u32,
    pub year: i32,
    pub total_days: i64,
    pub closed_days: i64,
    pub open_days: i64,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub total_withdrawals: Decimal,
    pub total_deposits: Decimal,
    pub net_flow: Decimal,
    // closing_balance do registro mais recente do mês
    pub current_balance: Decimal,
}
