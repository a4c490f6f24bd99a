use web_time::Duration;

pub const POLL_INTERVAL_ENV: &str = "TETHER_POLL_INTERVAL_MS";
pub const STARTUP_TIMEOUT_ENV: &str = "TETHER_STARTUP_TIMEOUT_MS";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Upper bound on one idle wait of the run loop; also the native pump cadence.
    pub poll_interval: Duration,
    pub thread_name: String,
    /// Bound on the readiness handshake of a spawned UI thread.
    pub startup_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            thread_name: "tether-ui".to_string(),
            startup_timeout: Duration::from_secs(5),
        }
    }
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `TETHER_POLL_INTERVAL_MS` / `TETHER_STARTUP_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(ms) = env_millis(POLL_INTERVAL_ENV) {
            cfg.poll_interval = ms;
        }
        if let Some(ms) = env_millis(STARTUP_TIMEOUT_ENV) {
            cfg.startup_timeout = ms;
        }
        cfg
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            log::warn!("{key}={raw:?} is not a positive millisecond count; ignoring");
            None
        }
    }
}
