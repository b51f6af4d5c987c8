// SPDX-License-Identifier: Apache-2.0, MIT
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureFlags {
    pub faucets_enabled: bool,
    pub sinks_enabled: bool,
    pub telemetry_enabled: bool,
    pub ip_throttling_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        FeatureFlags {
            faucets_enabled: true,
            sinks_enabled: true,
            telemetry_enabled: true,
            ip_throttling_enabled: true,
        }
    }
}

impl FeatureFlags {
    /// Reads `ENABLE_FAUCETS`/`ENABLE_SINKS`/`ENABLE_TELEMETRY`/`ENABLE_IP_THROTTLING`
    /// from the process environment, defaulting each to enabled.
    pub fn from_env() -> Self {
        FeatureFlags {
            faucets_enabled: env_flag("ENABLE_FAUCETS", true),
            sinks_enabled: env_flag("ENABLE_SINKS", true),
            telemetry_enabled: env_flag("ENABLE_TELEMETRY", true),
            ip_throttling_enabled: env_flag("ENABLE_IP_THROTTLING", true),
        }
    }
}

fn env_flag(name: &str, fallback: bool) -> bool {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => {
            matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
        }
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_all_enabled() {
        let flags = FeatureFlags::default();
        assert!(flags.faucets_enabled);
        assert!(flags.sinks_enabled);
        assert!(flags.telemetry_enabled);
        assert!(flags.ip_throttling_enabled);
    }
}
