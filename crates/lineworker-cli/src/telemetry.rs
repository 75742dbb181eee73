//! Log output for the `lineworker` binary.
//!
//! Events are written to stderr so that stdout stays reserved for line output.
//! The filter is read from `RUST_LOG` and defaults to `info`:
//!
//! ```bash
//! RUST_LOG=lineworker=debug lineworker --input urls.txt -- curl -sf
//! ```

use crate::config::LogFormat;
use tracing_subscriber::{
    EnvFilter, fmt, fmt::time::ChronoLocal, layer::SubscriberExt, util::SubscriberInitExt,
};

pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()));

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_timer(ChronoLocal::rfc_3339())
                    .with_file(true)
                    .pretty(),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_thread_ids(true)
                    .with_timer(ChronoLocal::rfc_3339())
                    .with_current_span(false),
            )
            .try_init()?,
    }

    Ok(())
}
