pub mod audit;
pub mod auth;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod errors;
pub mod share;
pub mod vault;
