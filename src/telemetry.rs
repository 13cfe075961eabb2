//! Log output for processes hosting plot canvases.
//!
//! Nothing here runs implicitly. A host calls [`init_tracing`] once at
//! startup, or installs its own subscriber and filters on the `tileplot`
//! target.

/// Filter directive used when `RUST_LOG` is unset. `verbose` matches
/// [`PlotOptions::debug`](crate::api::PlotOptions), which is what makes
/// per-message handling visible.
#[must_use]
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,tileplot=debug"
    } else {
        "warn,tileplot=info"
    }
}

/// Installs a compact `fmt` subscriber (requires the `telemetry` feature).
///
/// `RUST_LOG` wins over [`default_filter`]. Returns `false` without the
/// feature, or when a global subscriber is already in place.
#[must_use]
pub fn init_tracing(verbose: bool) -> bool {
    #[cfg(feature = "telemetry")]
    {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok()
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = verbose;
        false
    }
}
