use serde::{Deserialize, Serialize};

/// Top-level configuration (loaded from veil.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VeilConfig {
    pub tree: TreeConfig,
    pub resolver: ResolverConfig,
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// First cloud-path segment shared by every node of this treesystem.
    pub app_prefix: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            app_prefix: "veil".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum pointer/anchor hops before resolution reports a cycle.
    pub max_hops: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { max_hops: 32 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}
