pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod menu;
pub mod middleware;
pub mod state;
pub mod tenant;

#[cfg(test)]
pub mod testing;
