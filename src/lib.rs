pub mod browser;
pub mod cli;
pub mod form;
pub mod pages;
pub mod pipeline;
pub mod reconcile;
pub mod trace;
pub mod transport;

/// Log level for a `-v` count; `RUST_LOG` overrides it when set.
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the stderr subscriber used by the binary.
pub fn init_tracing(verbose: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level(verbose))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
