//src/main.rs

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

// Importações principais
use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::{auth_guard, tenant_guard};

#[tokio::main]
async fn main() {
    // Inicializa o logger
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Define as rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Define as rotas de usuário (protegidas pelo middleware)
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/clinics", get(handlers::auth::get_my_clinics))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let tenancy_routes = Router::new()
        .route(
            "/",
            post(handlers::tenancy::create_tenant).get(handlers::tenancy::list_my_tenants),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Transações: criação, consulta e o ciclo de vida completo
    let transaction_routes = Router::new()
        .route(
            "/",
            post(handlers::transactions::create_transaction)
                .get(handlers::transactions::list_transactions),
        )
        .route(
            "/installments",
            post(handlers::transactions::create_installments),
        )
        .route(
            "/{id}",
            get(handlers::transactions::get_transaction)
                .patch(handlers::transactions::update_transaction)
                .delete(handlers::transactions::delete_transaction),
        )
        .route(
            "/{id}/confirm",
            post(handlers::transactions::confirm_transaction),
        )
        .route(
            "/{id}/cancel",
            post(handlers::transactions::cancel_transaction),
        )
        .route(
            "/{id}/reverse",
            post(handlers::transactions::reverse_transaction),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    // Caixa diário: abertura, ajustes, recálculo e fechamento
    let cash_flow_routes = Router::new()
        .route("/open", post(handlers::cash_flow::open_cash_flow))
        .route("/recompute", post(handlers::cash_flow::recompute_cash_flow))
        .route("/summary", get(handlers::cash_flow::cash_flow_summary))
        .route("/{id}/close", post(handlers::cash_flow::close_cash_flow))
        .route(
            "/{id}/withdrawal",
            post(handlers::cash_flow::record_withdrawal),
        )
        .route("/{id}/deposit", post(handlers::cash_flow::record_deposit))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let report_routes = Router::new()
        .route("/stats", get(handlers::reports::financial_stats))
        .route("/receivable", get(handlers::reports::accounts_receivable))
        .route("/payable", get(handlers::reports::accounts_payable))
        .route("/overdue", get(handlers::reports::overdue_report))
        .route("/monthly", get(handlers::reports::monthly_summary))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/tenants", tenancy_routes)
        .nest("/api/financial/transactions", transaction_routes)
        .nest("/api/financial/cash-flow", cash_flow_routes)
        .nest("/api/financial/reports", report_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
