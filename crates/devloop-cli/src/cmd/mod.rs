pub mod config;
pub mod guard;
pub mod whitelist;
