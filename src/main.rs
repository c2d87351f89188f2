use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = s3select::cli::Cli::parse();
    s3select::logging::init_logging(cli.verbose);
    s3select::run(cli).await
}
