//! Authenticator configuration.

use std::time::Duration;

const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_ATTEMPT_WINDOW: Duration = Duration::from_secs(15 * 60);
const DEFAULT_LOCKOUT_BASE: Duration = Duration::from_secs(30);
const DEFAULT_LOCKOUT_MAX: Duration = Duration::from_secs(15 * 60);
const DEFAULT_ESCALATION_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Token lifetimes and lockout policy, fixed at construction.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    access_ttl: Duration,
    refresh_ttl: Duration,
    failure_threshold: u32,
    attempt_window: Duration,
    lockout_base: Duration,
    lockout_max: Duration,
    escalation_window: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            attempt_window: DEFAULT_ATTEMPT_WINDOW,
            lockout_base: DEFAULT_LOCKOUT_BASE,
            lockout_max: DEFAULT_LOCKOUT_MAX,
            escalation_window: DEFAULT_ESCALATION_WINDOW,
        }
    }

    #[must_use]
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Consecutive failures before a (principal, origin) pair locks.
    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sliding window inside which failures count toward lockout.
    #[must_use]
    pub fn with_attempt_window(mut self, window: Duration) -> Self {
        self.attempt_window = window;
        self
    }

    /// First lockout duration; doubles per strike up to the cap.
    #[must_use]
    pub fn with_lockout_base(mut self, base: Duration) -> Self {
        self.lockout_base = base;
        self
    }

    #[must_use]
    pub fn with_lockout_max(mut self, max: Duration) -> Self {
        self.lockout_max = max;
        self
    }

    /// Window inside which repeat lockouts keep escalating the backoff.
    #[must_use]
    pub fn with_escalation_window(mut self, window: Duration) -> Self {
        self.escalation_window = window;
        self
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    #[must_use]
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    #[must_use]
    pub fn attempt_window(&self) -> Duration {
        self.attempt_window
    }

    #[must_use]
    pub fn lockout_base(&self) -> Duration {
        self.lockout_base
    }

    #[must_use]
    pub fn lockout_max(&self) -> Duration {
        self.lockout_max
    }

    #[must_use]
    pub fn escalation_window(&self) -> Duration {
        self.escalation_window
    }
}
