//! Command-line front end for toolhost.
//!
//! `main.rs` parses arguments, sets up logging and dispatches to the
//! handlers here; everything is composed in [`bootstrap`].

pub mod bootstrap;
pub mod commands;
pub mod credentials;
pub mod handlers;
pub mod parser;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use credentials::EnvTokenProvider;
pub use parser::Cli;
