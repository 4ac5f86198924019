pub mod user_repo;
pub use user_repo::UserRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod transaction_repo;
pub use transaction_repo::TransactionRepository;
pub mod cash_flow_repo;
pub use cash_flow_repo::CashFlowRepository;
