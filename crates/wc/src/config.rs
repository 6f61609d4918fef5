//! WC configuration.

use std::time::Duration;

/// Per-deployment WC configuration.
#[derive(Debug, Clone)]
pub struct WcConfig {
    /// Whether a mid-transaction RM failure triggers an automatic
    /// `TM.abort(xid)` before the original error is re-raised to the
    /// client. Disabling this leaves the decision to the caller.
    pub auto_abort_on_error: bool,
    /// Upper bound a single RM/TM call is allowed to take before the WC
    /// treats it as a communication failure. Not enforced by this crate's
    /// in-process orchestration (calls are synchronous Rust calls, not
    /// network round-trips); kept for parity with a networked deployment
    /// and so a future HTTP client has a place to read it from.
    pub call_timeout: Duration,
}

impl Default for WcConfig {
    /// Mirrors the defaults of a networked deployment: auto-abort on, and a
    /// 30 second call budget.
    fn default() -> Self {
        WcConfig {
            auto_abort_on_error: true,
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl WcConfig {
    /// Build from `RESV_WC_*` environment variables, falling back to
    /// [`WcConfig::default`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        let default = WcConfig::default();
        WcConfig {
            auto_abort_on_error: std::env::var("RESV_WC_AUTO_ABORT_ON_ERROR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.auto_abort_on_error),
            call_timeout: std::env::var("RESV_WC_CALL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.call_timeout),
        }
    }
}
