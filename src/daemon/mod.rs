pub mod admin;
pub mod config;
pub mod http;
pub mod start;
