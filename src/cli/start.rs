use crate::cli::{actions::Action, commands, dispatch::handler};
use crate::config::CoreConfig;
use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Start the CLI
///
/// # Errors
///
/// Returns an error if the log subscriber cannot be installed or the matches
/// cannot be translated into an action.
pub fn start() -> Result<(Action, CoreConfig)> {
    let matches = commands::new().get_matches();

    let verbosity_level = match matches.get_one::<u8>("verbosity").map_or(0, |&v| v) {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let fmt_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false);

    // RUST_LOG=
    let env_filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy();

    let subscriber = Registry::default().with(fmt_layer).with(env_filter);

    tracing::subscriber::set_global_default(subscriber)?;

    let config = matches
        .get_one::<String>("core-url")
        .map(|url| CoreConfig::new(url.trim()))
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --core-url"))?;

    let action = handler(&matches)?;

    Ok((action, config))
}
