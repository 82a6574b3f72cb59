pub mod menu;
pub mod route;
pub mod server;
