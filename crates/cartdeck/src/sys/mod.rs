pub mod client;
pub mod command;
pub mod runtime;
pub mod server;
