pub mod common;
pub mod config;
pub mod http_client;
pub mod restart_client;
pub mod services;
