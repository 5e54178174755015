//! CLI entry point - the composition root.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use toolhost_cli::{Cli, CliConfig, Commands, bootstrap, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = bootstrap(CliConfig::with_defaults(cli.config)?);

    match command {
        Commands::Serve {
            bridge_url,
            forwarded_proto,
        } => handlers::serve::execute(&ctx, bridge_url, forwarded_proto).await?,
        Commands::Validate => handlers::validate::execute(&ctx).await?,
        Commands::Resolve { command } => handlers::resolve::execute(&command)?,
        Commands::Tools { wait } => handlers::tools::execute(&ctx, wait).await?,
        Commands::Call { server, tool, args } => {
            handlers::call::execute(&ctx, &server, &tool, args.as_deref()).await?;
        }
        Commands::Paths => handlers::paths::execute(&ctx)?,
    }

    Ok(())
}

/// Log to stderr so command output on stdout stays clean. `RUST_LOG` wins
/// over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
