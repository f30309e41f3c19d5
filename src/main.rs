use clap::Parser;
use color_eyre::Result;
use tirex_exporter::{
    init_errors,
    init_logging,
    App,
    Args,
    Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let config = Config::new(Args::parse())?;
    init_logging(config.verbose)?;
    App::new(config)?.run().await
}
