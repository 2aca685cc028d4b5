use eyre::Context;
use std::env;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    layer::SubscriberExt,
    Layer, Registry,
};

/// Log filter from `RUST_LOG`, falling back to `INFO` if it's unset or malformed
fn env_filter() -> Targets {
    env::var("RUST_LOG")
        .map_err(eyre::Report::from)
        .and_then(|targets| targets.parse().context("Failed to parse RUST_LOG value"))
        .unwrap_or_else(|_| Targets::default().with_default(LevelFilter::INFO))
}

/// Install the global tracing subscriber
pub fn initialise() -> eyre::Result<()> {
    let subscriber = Registry::default()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter()))
        .with(ErrorLayer::default());

    tracing::subscriber::set_global_default(subscriber)
        .context("Couldn't install the global tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::env_filter;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn falls_back_to_info() {
        // Only meaningful when the test runner doesn't set a filter itself
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }

        assert_eq!(env_filter().default_level(), Some(LevelFilter::INFO));
    }
}
