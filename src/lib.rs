pub mod commands;
pub mod config;
pub mod dates;
pub mod error;
pub mod layout;
pub mod models;
pub mod storage;
pub mod store;
pub mod tui;
