#![recursion_limit = "256"]

pub mod cli;
pub mod config;
pub mod credentials;
pub mod drive;
pub mod error;
pub mod http_fetch;
pub mod manifest;
pub mod oauth;
pub mod orchestrator;
pub mod progress;
pub mod service_account;
pub mod utils;
pub mod verify;
