//! TM configuration.

/// Bounded-retry and reporting-deadline configuration for phase 2.
#[derive(Debug, Clone, Copy)]
pub struct TmConfig {
    /// Number of phase-2 attempts per participant before giving up on this
    /// `commit`/`abort` call and (for `commit`) reporting IN_DOUBT. Retries
    /// continue across subsequent calls and at recovery regardless.
    pub max_phase2_attempts: u32,
}

impl Default for TmConfig {
    fn default() -> Self {
        TmConfig {
            max_phase2_attempts: 3,
        }
    }
}

impl TmConfig {
    /// Build from `RESV_TM_*` environment variables, falling back to
    /// [`TmConfig::default`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        let default = TmConfig::default();
        TmConfig {
            max_phase2_attempts: std::env::var("RESV_TM_MAX_PHASE2_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_phase2_attempts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_overrides_and_falls_back_on_bad_values() {
        std::env::set_var("RESV_TM_MAX_PHASE2_ATTEMPTS", "7");
        let cfg = TmConfig::from_env();
        assert_eq!(cfg.max_phase2_attempts, 7);

        std::env::set_var("RESV_TM_MAX_PHASE2_ATTEMPTS", "not-a-number");
        let cfg = TmConfig::from_env();
        assert_eq!(cfg.max_phase2_attempts, TmConfig::default().max_phase2_attempts);

        std::env::remove_var("RESV_TM_MAX_PHASE2_ATTEMPTS");
    }
}
