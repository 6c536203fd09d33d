//! Engine feature flags.
//!
//! Read from the environment at startup:
//!
//! | Variable | Effect |
//! |---|---|
//! | `DISABLE_EXTERNAL_CALLS`, `DISABLE_ETH_CALLS` | suppress every chain read |
//! | `ENABLE_LP_CHAIN_SYNC` | one-time LP ownership scan per user |
//! | `ENABLE_NFT_CHAIN_SYNC` | one-time partner NFT balance read per user and collection |
//! | `DISABLE_BOOTSTRAP` | skip seeding default config, tiers and NFT config |
//!
//! Truthy values are `1`, `true` and `yes`, case-insensitive.

/// Runtime switches of the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineFlags {
    pub disable_external_calls: bool,
    pub lp_chain_sync: bool,
    pub nft_chain_sync: bool,
    pub disable_bootstrap: bool,
}

fn truthy(value: Option<String>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

impl EngineFlags {
    /// Flags from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Flags from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            disable_external_calls: truthy(lookup("DISABLE_EXTERNAL_CALLS"))
                || truthy(lookup("DISABLE_ETH_CALLS")),
            lp_chain_sync: truthy(lookup("ENABLE_LP_CHAIN_SYNC")),
            nft_chain_sync: truthy(lookup("ENABLE_NFT_CHAIN_SYNC")),
            disable_bootstrap: truthy(lookup("DISABLE_BOOTSTRAP")),
        }
    }

    pub fn external_calls_enabled(&self) -> bool {
        !self.disable_external_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn flags(vars: &[(&str, &str)]) -> EngineFlags {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineFlags::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults_all_off() {
        let f = flags(&[]);
        assert!(f.external_calls_enabled());
        assert!(!f.lp_chain_sync);
        assert!(!f.disable_bootstrap);
    }

    #[test]
    fn test_either_disable_var_suppresses_reads() {
        assert!(!flags(&[("DISABLE_ETH_CALLS", "TRUE")]).external_calls_enabled());
        assert!(!flags(&[("DISABLE_EXTERNAL_CALLS", "1")]).external_calls_enabled());
        assert!(flags(&[("DISABLE_EXTERNAL_CALLS", "0")]).external_calls_enabled());
    }

    #[test]
    fn test_sync_flags() {
        let f = flags(&[("ENABLE_LP_CHAIN_SYNC", "yes"), ("ENABLE_NFT_CHAIN_SYNC", "no")]);
        assert!(f.lp_chain_sync);
        assert!(!f.nft_chain_sync);
    }
}
