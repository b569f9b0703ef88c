pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod server;
pub mod tools;
pub mod ui;
