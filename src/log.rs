use color_eyre::eyre::Report;
use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "polls_server=info,actix_web=info";

/// Installs the global tracing subscriber and the color-eyre report handler.
///
/// `RUST_LOG` overrides the default filter.
pub fn init() -> Result<(), Report> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(ErrorLayer::default())
        .try_init()?;

    color_eyre::install()
}
