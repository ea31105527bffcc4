use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tgw_matrix_cli::{pipeline, ConfigOverrides, MatrixConfig};

#[derive(Parser)]
#[command(name = "tgw-matrix")]
#[command(about = "Render which transit gateway attachments can reach each other", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = match &cli.config {
        Some(path) => MatrixConfig::load(path)?,
        None => MatrixConfig::default(),
    };
    cli.overrides.apply(&mut config);
    config.validate()?;

    let summary = pipeline::run(&config).await?;
    println!(
        "{} attachments, {} route table queries, matrix written to {}",
        summary.attachments,
        summary.route_queries,
        summary.output.display()
    );
    Ok(())
}
