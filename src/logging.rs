use color_eyre::Result;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

const VERBOSE_DIRECTIVES: &str =
    "info,tirex_exporter=debug,tirex_exporter_collector=debug,tirex_exporter_config=debug,tirex_exporter_http=debug";

/// `RUST_LOG` wins over `verbose` when set.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::try_new(VERBOSE_DIRECTIVES)?,
        Err(_) => EnvFilter::try_new("info")?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(filter))
        .with(tracing_error::ErrorLayer::default())
        .try_init()?;
    Ok(())
}
