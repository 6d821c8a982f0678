pub mod api;
pub mod app;
pub mod config;
pub mod database;
pub mod logging;
pub mod state;
pub mod tasks;
