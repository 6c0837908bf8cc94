pub mod acquire;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod routes;
