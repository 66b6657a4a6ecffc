//! cicflow-prep entry point

use clap::Parser;
use cicflow_prep::cli::{cmd_classes, cmd_clean, cmd_prepare, cmd_run, load_config, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cicflow_prep=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Clean { data_dir } => cmd_clean(config, data_dir)?,
        Commands::Classes => cmd_classes(config)?,
        Commands::Prepare { output_dir } => cmd_prepare(config, output_dir)?,
        Commands::Run { data_dir, output_dir } => cmd_run(config, data_dir, output_dir)?,
    }

    Ok(())
}
