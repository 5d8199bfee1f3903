//! Process-wide log output.
//!
//! Until [`init`] runs, events go to tracing's no-op dispatcher and are dropped.

use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::FmtSubscriber;

/// Installs a formatting subscriber that prints events up to `level`.
///
/// # Panics
///
/// Panics if logging was already initialized.
pub fn init(level: Level) {
    try_init(level).expect("loggers already initialized");
}

/// Like [`init`], but reports a second initialization instead of panicking.
pub fn try_init(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
}
