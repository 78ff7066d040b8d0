//! Log output for the `lzb` binary.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset, by `-v` count.
fn default_directives(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "lzb_core=debug,lzb_containers=debug,lzb=debug,warn",
        _ => "lzb_core=trace,lzb_containers=trace,lzb=trace,info",
    }
}

/// Install a stderr subscriber. `RUST_LOG` wins over `-v` when set.
pub fn setup_logging(verbose: u8) {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose > 1);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose))),
        )
        .with(layer)
        .init()
}
