pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod log;
pub mod managers;
pub mod server;
pub mod span;
pub mod store;
pub mod views;
