use crate::{TransformError, TransformResult};
use bitflags::bitflags;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

bitflags! {
    /// Progress output gating, held per transformer rather than globally.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct Verbosity: u8 {
        /// Suppress per-resource progress lines.
        const Terse = 0x01;
        /// Add per-resource change details.
        const Verbose = 0x02;
    }
}

impl Verbosity {
    pub fn from_flags(terse: bool, verbose: bool) -> Verbosity {
        let mut verbosity = Verbosity::empty();
        verbosity.set(Verbosity::Terse, terse);
        verbosity.set(Verbosity::Verbose, verbose);
        verbosity
    }

    pub fn show_progress(self) -> bool {
        !self.contains(Verbosity::Terse)
    }

    /// Verbose wins over terse when both are set.
    pub fn show_details(self) -> bool {
        self.contains(Verbosity::Verbose)
    }
}

/// Installs a fmt subscriber for binaries embedding the engine. `RUST_LOG`
/// takes precedence over `filter` when set.
pub fn init_logging(filter: &str) -> TransformResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter)
            .map_err(|e| TransformError::Logging(format!("invalid log filter {filter:?}: {e}")))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| TransformError::Logging(format!("failed to initialize logging: {e}")))
}
