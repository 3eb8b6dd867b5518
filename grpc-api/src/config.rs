//! gRPC server configuration.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Configuration for the RPC server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Address to listen on (e.g., "0.0.0.0:9001")
    #[serde(with = "socket_addr_serde")]
    pub listen_addr: SocketAddr,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Port the RPC service listens on across the cluster; leader
    /// forwarding rewrites the consensus transport address to this port.
    pub leader_rpc_port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9001".parse().expect("static address"),
            request_timeout_secs: 30,
            leader_rpc_port: 9001,
        }
    }
}

impl RpcConfig {
    /// Load configuration from a TOML file. Environment variables with the
    /// `RPC_` prefix override file values.
    ///
    /// # Example config (TOML)
    /// ```toml
    /// [rpc]
    /// listen_addr = "0.0.0.0:9001"
    /// request_timeout_secs = 30
    /// leader_rpc_port = 9001
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Figment::new().merge(Toml::file(path)),
            Some(ext) => {
                return Err(anyhow::anyhow!(
                    "Unsupported config file format: {}. Use .toml",
                    ext
                ));
            }
            None => {
                return Err(anyhow::anyhow!("Config file must have a .toml extension"));
            }
        };

        let figment = figment.merge(Env::prefixed("RPC_").split("_"));
        let config: RpcConfig = figment.extract_inner("rpc").map_err(anyhow::Error::msg)?;
        Ok(config)
    }
}

/// Custom serde module for SocketAddr to handle string serialization.
mod socket_addr_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S>(addr: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        addr.to_string().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
