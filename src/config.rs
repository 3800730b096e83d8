/// Engine configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Transposition table size in megabytes.
    pub hash_mb: usize,
    /// Default time budget per move when `go` gives no limits.
    pub default_movetime_ms: u64,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        EngineConfig {
            hash_mb: std::env::var("JUNGLE_HASH_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(128),
            default_movetime_ms: std::env::var("JUNGLE_MOVETIME_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5_000),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            hash_mb: 128,
            default_movetime_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.hash_mb, 128);
        assert_eq!(config.default_movetime_ms, 5_000);
    }

    #[test]
    fn from_env_defaults() {
        // Without the env vars set, fall back to defaults.
        let config = EngineConfig::from_env();
        assert_eq!(config.hash_mb, 128);
        assert_eq!(config.default_movetime_ms, 5_000);
    }
}
