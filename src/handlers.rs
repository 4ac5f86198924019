pub mod auth;
pub mod cash_flow;
pub mod reports;
pub mod tenancy;
pub mod transactions;
