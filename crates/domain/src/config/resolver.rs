use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Root nameserver every resolution chain starts from.
    #[serde(default = "default_root_server")]
    pub root_server: String,

    /// Port queried on every upstream nameserver.
    #[serde(default = "default_upstream_port")]
    pub upstream_port: u16,

    /// Per-hop UDP exchange timeout.
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,

    /// Guard against delegation loops and runaway referral chains.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            root_server: default_root_server(),
            upstream_port: default_upstream_port(),
            upstream_timeout_ms: default_upstream_timeout_ms(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_root_server() -> String {
    // a.root-servers.net
    "198.41.0.4".to_string()
}

fn default_upstream_port() -> u16 {
    53
}

fn default_upstream_timeout_ms() -> u64 {
    2000
}

fn default_max_depth() -> usize {
    16
}
