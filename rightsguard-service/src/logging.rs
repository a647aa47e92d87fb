use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Swaps the installed filter once the configured one is known.
#[derive(Clone)]
pub struct LogFilterHandle {
    inner: reload::Handle<EnvFilter, Registry>,
    pinned: bool,
}

impl LogFilterHandle {
    /// Replaces the active filter with `directives`.
    ///
    /// Returns false when `RUST_LOG` pinned the filter at startup or the
    /// directives do not parse.
    pub fn set_filter(&self, directives: &str) -> bool {
        if self.pinned {
            return false;
        }
        match EnvFilter::try_new(directives) {
            Ok(filter) => self.inner.reload(filter).is_ok(),
            Err(e) => {
                warn!("Ignoring log filter {:?}: {}", directives, e);
                false
            }
        }
    }
}

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Returns `None` if a
/// subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> Option<LogFilterHandle> {
    let (filter, pinned) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (
            EnvFilter::try_new(default_filter).unwrap_or_else(|_| EnvFilter::new("info")),
            false,
        ),
    };
    let (filter, inner) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .try_init()
        .ok()?;
    Some(LogFilterHandle { inner, pinned })
}
