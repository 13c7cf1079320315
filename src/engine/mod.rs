pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod game;
pub mod ledger;
pub mod server;
pub mod traps;
