pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod openrouter;
pub mod server;
pub mod services;
