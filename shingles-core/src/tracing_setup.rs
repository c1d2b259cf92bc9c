use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Initialize logging for the shingles binaries.
///
/// Reads the `SHINGLES_LOG` environment variable for per-target levels.
/// Format: `SHINGLES_LOG=shingles_core=debug,shingles_server=info`
///
/// Falls back to `shingles_core=info,shingles_server=info` if unset or invalid.
/// Calling it more than once has no effect.
pub fn init_tracing() {
	INIT.call_once(|| {
		let filter = EnvFilter::try_from_env("SHINGLES_LOG")
			.unwrap_or_else(|_| EnvFilter::new("shingles_core=info,shingles_server=info"));

		tracing_subscriber::registry()
			.with(fmt::layer().with_target(true))
			.with(filter)
			.init();
	});
}
