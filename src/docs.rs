// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::get_my_clinics,

        // --- Tenancy ---
        handlers::tenancy::create_tenant,
        handlers::tenancy::list_my_tenants,

        // --- FINANCEIRO ---
        handlers::transactions::create_transaction,
        handlers::transactions::list_transactions,
        handlers::transactions::get_transaction,
        handlers::transactions::update_transaction,
        handlers::transactions::confirm_transaction,
        handlers::transactions::cancel_transaction,
        handlers::transactions::reverse_transaction,
        handlers::transactions::delete_transaction,
        handlers::transactions::create_installments,

        // --- CAIXA ---
        handlers::cash_flow::open_cash_flow,
        handlers::cash_flow::recompute_cash_flow,
        handlers::cash_flow::record_withdrawal,
        handlers::cash_flow::record_deposit,
        handlers::cash_flow::close_cash_flow,
        handlers::cash_flow::cash_flow_summary,

        // --- RELATÓRIOS ---
        handlers::reports::financial_stats,
        handlers::reports::accounts_receivable,
        handlers::reports::accounts_payable,
        handlers::reports::overdue_report,
        handlers::reports::monthly_summary,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- TENANCY ---
            models::tenancy::Tenant,
            models::tenancy::UserTenant,
            handlers::tenancy::CreateTenantPayload,

            // --- FINANCEIRO ---
            models::finance::TransactionKind,
            models::finance::TransactionStatus,
            models::finance::PaymentMethod,
            models::finance::CashFlowKind,
            models::finance::Transaction,
            models::finance::CashFlow,
            models::finance::FinancialStats,
            models::finance::OpenAccountsReport,
            models::finance::OverdueReport,
            models::finance::MonthlySummary,
            models::finance::CashFlowSummary,

            // --- Payloads ---
            handlers::transactions::CreateTransactionPayload,
            handlers::transactions::UpdateTransactionPayload,
            handlers::transactions::ConfirmTransactionPayload,
            handlers::transactions::CancelTransactionPayload,
            handlers::transactions::ReverseTransactionPayload,
            handlers::transactions::CreateInstallmentPlanPayload,
            handlers::cash_flow::OpenCashFlowPayload,
            handlers::cash_flow::RecomputeCashFlowPayload,
            handlers::cash_flow::CashAdjustmentPayload,
            handlers::cash_flow::CloseCashFlowPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Tenancy", description = "Gestão de Clínicas e Acesso"),
        (name = "Financeiro", description = "Transações (Contas a Receber e a Pagar)"),
        (name = "Caixa", description = "Fluxo de Caixa Diário (Abertura, Sangria, Reforço, Fechamento)"),
        (name = "Relatórios", description = "Projeções de leitura do financeiro")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
