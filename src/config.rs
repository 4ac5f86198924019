// src/config.rs

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, time::Duration};

use crate::{
    common::i18n::I18nStore,
    db::{CashFlowRepository, TenantRepository, TransactionRepository, UserRepository},
    services::{
        auth::AuthService, cash_flow_service::CashFlowService,
        installment_service::InstallmentService, report_service::ReportService,
        tenancy_service::TenantService, transaction_service::TransactionService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub i18n_store: I18nStore,
    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub transaction_service: TransactionService,
    pub installment_service: InstallmentService,
    pub cash_flow_service: CashFlowService,
    pub report_service: ReportService,
}

impl AppState {
    // A assinatura retorna um Result: se a configuração falhar, quem decide
    // o que fazer é o main.
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let transaction_repo = TransactionRepository::new(db_pool.clone());
        let cash_flow_repo = CashFlowRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo, jwt_secret.clone(), db_pool.clone());
        let tenant_service = TenantService::new(tenant_repo, db_pool.clone());
        let transaction_service = TransactionService::new(transaction_repo.clone());
        let installment_service = InstallmentService::new(transaction_repo.clone());
        let cash_flow_service = CashFlowService::new(cash_flow_repo, transaction_repo.clone());
        let report_service = ReportService::new(transaction_repo);

        Ok(Self {
            db_pool,
            jwt_secret,
            i18n_store: I18nStore::new(),
            auth_service,
            tenant_service,
            transaction_service,
            installment_service,
            cash_flow_service,
            report_service,
        })
    }
}
