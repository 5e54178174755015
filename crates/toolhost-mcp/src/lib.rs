//! Tool server supervision for toolhost.
//!
//! This crate turns a validated `mcp_servers.json` into a set of supervised
//! child processes that speak newline-delimited JSON-RPC 2.0 on stdio.
//!
//! # Architecture
//!
//! - `config_store`: load, validate and atomically persist the config file
//! - `resolver`: turn bare command names into absolute paths using an
//!   enhanced search path (version managers, package-manager dirs)
//! - `transport`: stdout framing and request/response correlation
//! - `supervisor`: process lifecycle, startup window, crash bookkeeping
//! - `catalog`: per-server cache of discovered tools
//! - `logs`: buffered, rotated per-server log files
//! - `broadcaster`: periodic status snapshots for subscribers

pub mod broadcaster;
pub mod catalog;
pub mod config_store;
pub mod logs;
pub mod resolver;
pub mod supervisor;
pub mod transport;

pub use broadcaster::StatusBroadcaster;
pub use catalog::{DiscoveryError, ToolCatalog};
pub use config_store::ConfigStore;
pub use logs::{LogManager, Stream};
pub use resolver::{CommandResolver, Diagnosis};
pub use supervisor::{Supervisor, SupervisorOptions};
pub use transport::{RpcChannel, TransportError};
