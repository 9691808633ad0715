use std::io;

use tracing::debug;

/// Install a stderr subscriber when `RUST_LOG` is set.
///
/// Diagnostics meant for the user do not go through here; they are always
/// printed.
pub fn from_env() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }

    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init()
    {
        Ok(()) => debug!("logging initialised"),
        Err(e) => eprintln!("Failed to initialise logging, continuing with none\n{e}"),
    }
}
