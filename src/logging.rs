//! Diagnostic logging setup
//!
//! The library only emits `tracing` events; nothing is printed unless a
//! subscriber is installed. Binaries call [`init_logging`] once at startup.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a `-v` count
pub fn verbosity_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "capi_tree=debug",
        _ => "capi_tree=trace",
    }
}

/// Install a compact stderr subscriber.
///
/// A non-empty `RUST_LOG` takes precedence over the verbosity count. Calling
/// this more than once is harmless; later calls are ignored.
pub fn init_logging(verbose: u8) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(rustlog) if !rustlog.is_empty() => {
            EnvFilter::try_new(&rustlog).unwrap_or_else(|_| EnvFilter::new(verbosity_directive(verbose)))
        }
        _ => EnvFilter::new(verbosity_directive(verbose)),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .without_time()
        .compact()
        .try_init();
}
