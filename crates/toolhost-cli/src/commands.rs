//! Available commands.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the supervisor until Ctrl-C, optionally bridging to a remote endpoint
    Serve {
        /// WebSocket endpoint of the remote bridge (ws:// only for loopback)
        #[arg(long, env = "TOOLHOST_BRIDGE_URL")]
        bridge_url: Option<String>,
        /// Forwarded protocol reported by a TLS-terminating reverse proxy
        #[arg(long, env = "TOOLHOST_FORWARDED_PROTO")]
        forwarded_proto: Option<String>,
    },

    /// Validate the config file without starting anything
    Validate,

    /// Show how a command name resolves on the enhanced search path
    Resolve {
        /// Command to resolve (e.g. "npx", "uvx")
        command: String,
    },

    /// Start enabled servers and list the tools they expose
    Tools {
        /// Seconds to wait for each server's tool discovery
        #[arg(long, default_value_t = 10)]
        wait: u64,
    },

    /// Start one server and call a tool on it
    Call {
        /// Server name from the config file
        server: String,
        /// Tool name
        tool: String,
        /// JSON object of tool arguments
        args: Option<String>,
    },

    /// Show resolved data, config and log paths
    Paths,
}
