use clap::Parser;
use routedoc::cli::{run_cli, Cli};
use routedoc::logging::{init_logging_with_config, LogConfig};

fn main() -> anyhow::Result<()> {
    init_logging_with_config(&LogConfig::from_env())?;
    run_cli(Cli::parse())
}
