//! # Bridge Configuration
//!
//! YAML configuration for every agent, with per-profile defaults and a small
//! set of environment overrides.
//!
//! ```yaml
//! profile: staging
//! networks:
//!   - name: BSC_TEST
//!     chain_id: 97
//!     rpc_url: https://data-seed-prebsc-1-s1.binance.org:8545
//!     gas_price_wei: 12000000000
//! owner:
//!   finality_blocks: 6
//!   commit_wait_timeout_secs: 300
//!   event_lookback_blocks: 10
//! validator:
//!   finality_blocks: 6
//!   challenge: { mode: issued, ttl_secs: 300 }
//! retry:
//!   max_attempts: 60
//! ```
//!
//! ## Environment
//!
//! - `NFTB_PROFILE`: `local`, `develop` or `staging`. Resets every role's
//!   finality depth to the profile default.
//! - `NFTB_FINALITY_BLOCKS`: confirmation depth for every role; applied
//!   after the profile.
//! - `<ROLE>_PRIVATE_KEY`: hex secp256k1 key for `DEPLOYER`, `VALIDATOR`,
//!   `DENIER` or `OWNER`.
//!
//! Networks listed in the file are merged over the built-in presets by
//! chain id.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use nftb_core::ChainId;
use nftb_crypto::SigningKey;

use crate::retry::RetryPolicy;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(String),
    #[error("no network configured for chain {chain_id}")]
    UnknownNetwork { chain_id: ChainId },
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("{var} environment variable is required")]
    MissingKey { var: String },
    #[error("{var} is not a valid private key: {reason}")]
    InvalidKey { var: String, reason: String },
    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: String, value: String },
}

// ─── Profiles ───────────────────────────────────────────────────────

/// Deployment profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Local,
    Develop,
    Staging,
}

impl Profile {
    /// Confirmation depth used when a role does not set one.
    pub fn default_finality_blocks(self) -> u64 {
        match self {
            Profile::Local | Profile::Develop => 0,
            Profile::Staging => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Local => "local",
            Profile::Develop => "develop",
            Profile::Staging => "staging",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Profile::Local),
            "develop" => Ok(Profile::Develop),
            "staging" => Ok(Profile::Staging),
            _ => Err(ConfigError::InvalidValue {
                var: "profile".into(),
                value: s.into(),
            }),
        }
    }
}

// ─── Networks ───────────────────────────────────────────────────────

/// One EVM network.
///
/// `Debug` hides the RPC URL path and query, which commonly carry provider
/// API keys.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub name: String,
    pub chain_id: ChainId,
    pub rpc_url: Url,
    pub gas_price_wei: u64,
}

impl NetworkInfo {
    /// The RPC URL with any path and query replaced by `[REDACTED]`.
    pub fn redacted_endpoint(&self) -> String {
        match self.rpc_url.host_str() {
            Some(host) if self.rpc_url.path() != "/" || self.rpc_url.query().is_some() => {
                format!("{}://{host}/[REDACTED]", self.rpc_url.scheme())
            }
            _ => self.rpc_url.to_string(),
        }
    }
}

impl fmt::Debug for NetworkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkInfo")
            .field("name", &self.name)
            .field("chain_id", &self.chain_id)
            .field("rpc_url", &self.redacted_endpoint())
            .field("gas_price_wei", &self.gas_price_wei)
            .finish()
    }
}

const GWEI: u64 = 1_000_000_000;

const PRESETS: &[(&str, u64, &str, u64)] = &[
    ("LOCALHOST_8545", 31337, "http://localhost:8545", 10 * GWEI),
    ("LOCALHOST_8546", 31338, "http://localhost:8546", 10 * GWEI),
    ("BSC_MAIN", 56, "https://bsc-dataseed.binance.org", 5 * GWEI),
    (
        "BSC_TEST",
        97,
        "https://data-seed-prebsc-1-s1.binance.org:8545",
        12 * GWEI,
    ),
    ("POLYGON_MAIN", 137, "https://polygon-rpc.com", 40 * GWEI),
    (
        "POLYGON_TEST_MUMBAI",
        80001,
        "https://rpc-mumbai.maticvigil.com",
        50 * GWEI,
    ),
];

/// Built-in networks.
pub fn preset_networks() -> Result<Vec<NetworkInfo>, ConfigError> {
    PRESETS
        .iter()
        .map(|(name, chain_id, rpc, gas)| {
            Ok(NetworkInfo {
                name: (*name).to_string(),
                chain_id: ChainId(*chain_id),
                rpc_url: Url::parse(rpc)
                    .map_err(|e| ConfigError::InvalidUrl((*name).to_string(), e.to_string()))?,
                gas_price_wei: *gas,
            })
        })
        .collect()
}

/// Networks by chain id.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    networks: BTreeMap<ChainId, NetworkInfo>,
}

impl NetworkRegistry {
    /// Presets, overridden and extended by `extra`.
    pub fn with_presets(extra: &[NetworkInfo]) -> Result<Self, ConfigError> {
        let mut registry = Self::default();
        for network in preset_networks()? {
            registry.insert(network);
        }
        for network in extra {
            registry.insert(network.clone());
        }
        Ok(registry)
    }

    /// Add or replace a network.
    pub fn insert(&mut self, network: NetworkInfo) {
        self.networks.insert(network.chain_id, network);
    }

    pub fn get(&self, chain_id: ChainId) -> Result<&NetworkInfo, ConfigError> {
        self.networks
            .get(&chain_id)
            .ok_or(ConfigError::UnknownNetwork { chain_id })
    }

    pub fn by_name(&self, name: &str) -> Option<&NetworkInfo> {
        self.networks.values().find(|n| n.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkInfo> {
        self.networks.values()
    }
}

// ─── Role settings ──────────────────────────────────────────────────

/// Token-owner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnerSettings {
    pub finality_blocks: u64,
    /// How long to wait for the commit event after submitting a request.
    pub commit_wait_timeout_secs: u64,
    /// Blocks searched backwards from head for the commit event; `None`
    /// searches the whole history.
    pub event_lookback_blocks: Option<u64>,
}

impl Default for OwnerSettings {
    fn default() -> Self {
        Self {
            finality_blocks: 0,
            commit_wait_timeout_secs: 300,
            event_lookback_blocks: Some(10),
        }
    }
}

/// How the validator fills the owner message's challenge field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChallengePolicy {
    /// Accept only the constant `0x00`. No freshness.
    Placeholder,
    /// Issue keyed challenges that expire after `ttl_secs`.
    Issued { ttl_secs: u64 },
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        ChallengePolicy::Issued { ttl_secs: 300 }
    }
}

/// Validator settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorSettings {
    pub finality_blocks: u64,
    pub challenge: ChallengePolicy,
}

/// Denier settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenierSettings {
    pub finality_blocks: u64,
    pub event_lookback_blocks: Option<u64>,
}

impl Default for DenierSettings {
    fn default() -> Self {
        Self {
            finality_blocks: 0,
            event_lookback_blocks: Some(20),
        }
    }
}

// ─── BridgeConfig ───────────────────────────────────────────────────

/// Complete configuration for one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub profile: Profile,
    /// Networks in addition to, or replacing, the presets.
    #[serde(default)]
    pub networks: Vec<NetworkInfo>,
    #[serde(default)]
    pub owner: OwnerSettings,
    #[serde(default)]
    pub validator: ValidatorSettings,
    #[serde(default)]
    pub denier: DenierSettings,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::for_profile(Profile::Local)
    }
}

impl BridgeConfig {
    /// Defaults for `profile`.
    pub fn for_profile(profile: Profile) -> Self {
        let mut config = Self {
            profile,
            networks: Vec::new(),
            owner: OwnerSettings::default(),
            validator: ValidatorSettings::default(),
            denier: DenierSettings::default(),
            retry: RetryPolicy::default(),
        };
        config.set_finality_blocks(profile.default_finality_blocks());
        config
    }

    /// Parse YAML. Roles without an explicit `finality_blocks` get the
    /// profile default.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let raw: serde_yaml::Value =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config: Self =
            serde_yaml::from_value(raw.clone()).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let default_depth = config.profile.default_finality_blocks();
        let explicit = |role: &str| {
            raw.get(role)
                .and_then(|section| section.get("finality_blocks"))
                .is_some()
        };
        if !explicit("owner") {
            config.owner.finality_blocks = default_depth;
        }
        if !explicit("validator") {
            config.validator.finality_blocks = default_depth;
        }
        if !explicit("denier") {
            config.denier.finality_blocks = default_depth;
        }
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `NFTB_PROFILE` and `NFTB_FINALITY_BLOCKS` from the process
    /// environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup("NFTB_PROFILE") {
            let profile: Profile = raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: "NFTB_PROFILE".into(),
                value: raw.clone(),
            })?;
            self.profile = profile;
            self.set_finality_blocks(profile.default_finality_blocks());
        }
        if let Some(raw) = lookup("NFTB_FINALITY_BLOCKS") {
            let depth = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    var: "NFTB_FINALITY_BLOCKS".into(),
                    value: raw.clone(),
                })?;
            self.set_finality_blocks(depth);
        }
        Ok(())
    }

    /// Presets merged with the configured networks.
    pub fn registry(&self) -> Result<NetworkRegistry, ConfigError> {
        NetworkRegistry::with_presets(&self.networks)
    }

    fn set_finality_blocks(&mut self, depth: u64) {
        self.owner.finality_blocks = depth;
        self.validator.finality_blocks = depth;
        self.denier.finality_blocks = depth;
    }
}

// ─── Signers ────────────────────────────────────────────────────────

/// Parties that hold a signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Deployer,
    Validator,
    Denier,
    Owner,
}

impl Role {
    /// Environment variable holding this role's key.
    pub fn env_var(self) -> &'static str {
        match self {
            Role::Deployer => "DEPLOYER_PRIVATE_KEY",
            Role::Validator => "VALIDATOR_PRIVATE_KEY",
            Role::Denier => "DENIER_PRIVATE_KEY",
            Role::Owner => "OWNER_PRIVATE_KEY",
        }
    }

    /// Load this role's key from the process environment.
    pub fn load_signer(self) -> Result<SigningKey, ConfigError> {
        self.signer_from(|var| std::env::var(var).ok())
    }

    /// Load this role's key from `lookup`.
    pub fn signer_from(
        self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<SigningKey, ConfigError> {
        let var = self.env_var();
        let raw = lookup(var).ok_or_else(|| ConfigError::MissingKey { var: var.into() })?;
        SigningKey::from_hex(raw.trim()).map_err(|e| ConfigError::InvalidKey {
            var: var.into(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn profile_defaults() {
        assert_eq!(BridgeConfig::for_profile(Profile::Local).validator.finality_blocks, 0);
        assert_eq!(BridgeConfig::for_profile(Profile::Develop).owner.finality_blocks, 0);
        let staging = BridgeConfig::for_profile(Profile::Staging);
        assert_eq!(staging.owner.finality_blocks, 6);
        assert_eq!(staging.validator.finality_blocks, 6);
        assert_eq!(staging.denier.finality_blocks, 6);
    }

    #[test]
    fn presets_resolve_by_chain_id() {
        let registry = BridgeConfig::default().registry().unwrap();
        let bsc = registry.get(ChainId(97)).unwrap();
        assert_eq!(bsc.name, "BSC_TEST");
        assert_eq!(bsc.gas_price_wei, 12 * GWEI);
        assert_eq!(registry.get(ChainId(31338)).unwrap().name, "LOCALHOST_8546");
        assert_eq!(registry.by_name("POLYGON_MAIN").unwrap().chain_id, ChainId(137));
        assert!(matches!(
            registry.get(ChainId(1)),
            Err(ConfigError::UnknownNetwork { chain_id: ChainId(1) })
        ));
    }

    #[test]
    fn yaml_fills_unset_depths_from_profile() {
        let config = BridgeConfig::from_yaml_str(
            "profile: staging\nvalidator:\n  finality_blocks: 12\n",
        )
        .unwrap();
        assert_eq!(config.validator.finality_blocks, 12);
        assert_eq!(config.owner.finality_blocks, 6);
        assert_eq!(config.owner.commit_wait_timeout_secs, 300);
        assert_eq!(config.owner.event_lookback_blocks, Some(10));
        assert_eq!(config.denier.event_lookback_blocks, Some(20));
    }

    #[test]
    fn yaml_networks_override_presets() {
        let yaml = r#"
networks:
  - name: BSC_TEST_PRIVATE
    chain_id: 97
    rpc_url: https://bsc.example.org/v1/secret-key
    gas_price_wei: 1
validator:
  challenge:
    mode: placeholder
retry:
  max_attempts: 3
"#;
        let config = BridgeConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.validator.challenge, ChallengePolicy::Placeholder);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay_ms, 500);
        let registry = config.registry().unwrap();
        assert_eq!(registry.get(ChainId(97)).unwrap().name, "BSC_TEST_PRIVATE");
        assert_eq!(registry.get(ChainId(56)).unwrap().name, "BSC_MAIN");
    }

    #[test]
    fn yaml_roundtrip() {
        let config = BridgeConfig::for_profile(Profile::Staging);
        let back = BridgeConfig::from_yaml_str(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        assert!(matches!(
            BridgeConfig::from_yaml_str("profile: production"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides_apply_profile_then_depth() {
        let mut config = BridgeConfig::default();
        config
            .apply_overrides(env(&[("NFTB_PROFILE", "staging")]))
            .unwrap();
        assert_eq!(config.profile, Profile::Staging);
        assert_eq!(config.owner.finality_blocks, 6);

        config
            .apply_overrides(env(&[("NFTB_PROFILE", "develop"), ("NFTB_FINALITY_BLOCKS", "3")]))
            .unwrap();
        assert_eq!(config.profile, Profile::Develop);
        assert_eq!(config.validator.finality_blocks, 3);

        let err = config
            .apply_overrides(env(&[("NFTB_FINALITY_BLOCKS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn rpc_url_path_is_redacted_in_debug() {
        let network = NetworkInfo {
            name: "X".into(),
            chain_id: ChainId(1),
            rpc_url: Url::parse("https://mainnet.example.io/v3/abcdef0123").unwrap(),
            gas_price_wei: 1,
        };
        let debug = format!("{network:?}");
        assert!(!debug.contains("abcdef0123"));
        assert!(debug.contains("mainnet.example.io"));
    }

    #[test]
    fn role_keys_load_from_lookup() {
        let key = Role::Validator
            .signer_from(env(&[("VALIDATOR_PRIVATE_KEY", HARDHAT_KEY)]))
            .unwrap();
        assert_eq!(
            nftb_core::lower_hex(key.address()),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert!(matches!(
            Role::Owner.signer_from(env(&[])),
            Err(ConfigError::MissingKey { .. })
        ));
        assert!(matches!(
            Role::Denier.signer_from(env(&[("DENIER_PRIVATE_KEY", "0x1234")])),
            Err(ConfigError::InvalidKey { .. })
        ));
    }
}
