use figment::{
    Figment,
    providers::{Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicyKind {
    #[default]
    Random,
    AvailableSpace,
}

fn default_max_placement_attempts() -> usize {
    3
}
fn default_available_space_preference() -> f64 {
    0.6
}

/// Knobs of the replica placement path, handed to the coordinator explicitly.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlacementConfig {
    /// datanodes reporting less free space than this never receive a replica
    pub min_remaining_space: u64,
    /// when set, datanodes busier than `factor * average load` are skipped
    pub max_load_factor: Option<f64>,
    #[serde(default = "default_max_placement_attempts")]
    pub max_placement_attempts: usize,
    pub policy: SelectionPolicyKind,
    #[serde(default = "default_available_space_preference")]
    pub available_space_preference: f64,
    pub seed: Option<u64>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            min_remaining_space: 0,
            max_load_factor: None,
            max_placement_attempts: default_max_placement_attempts(),
            policy: SelectionPolicyKind::Random,
            available_space_preference: default_available_space_preference(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub id: String,
    pub log_level: String,
    pub log_base: String,
    pub apm_endpoint: Option<String>,
    pub default_replication: usize,
    pub block_size: u64,
    pub heartbeat_expiry_secs: u64,
    pub state_sync_interval_secs: u64,
    pub replication_retry_secs: u64,
    pub deleted_block_grace_secs: u64,
    pub placement: PlacementConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: "namenode".to_string(),
            log_level: "info".to_string(),
            log_base: "./temp/namenode/".to_string(),
            apm_endpoint: None,
            default_replication: 3,
            block_size: 128 * 1024 * 1024,
            heartbeat_expiry_secs: 30,
            state_sync_interval_secs: 5,
            replication_retry_secs: 60,
            deleted_block_grace_secs: 23,
            placement: PlacementConfig::default(),
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        let env = std::env::var("ENV").unwrap_or_else(|_| "default".to_owned());
        let config_file_path = std::env::var("CONFIG_PATH")
            .unwrap_or_else(|_| format!("./namenode/config/{}.yaml", env));
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(config_file_path))
    }

    /// Configuration of this namenode process. A file that does not match the
    /// expected shape is an error, never silently replaced by defaults.
    pub fn load() -> Result<Config, figment::Error> {
        Config::figment().extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "namenode.yaml",
                r#"
                id: nn-1
                default_replication: 2
                placement:
                  min_remaining_space: 1024
                  policy: available_space
                  seed: 7
                "#,
            )?;
            jail.set_env("CONFIG_PATH", "namenode.yaml");
            let config: Config = Config::figment().extract()?;
            assert_eq!(config.id, "nn-1");
            assert_eq!(config.default_replication, 2);
            assert_eq!(config.block_size, 128 * 1024 * 1024);
            assert_eq!(config.placement.min_remaining_space, 1024);
            assert_eq!(config.placement.policy, SelectionPolicyKind::AvailableSpace);
            assert_eq!(config.placement.seed, Some(7));
            assert_eq!(config.placement.max_placement_attempts, 3);
            Ok(())
        });
    }

    #[test]
    fn missing_file_keeps_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("CONFIG_PATH", "does-not-exist.yaml");
            let config: Config = Config::figment().extract()?;
            assert_eq!(config.default_replication, 3);
            assert!(config.placement.max_load_factor.is_none());
            Ok(())
        });
    }

    #[test]
    fn invalid_values_are_errors() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "namenode.yaml",
                r#"
                placement:
                  policy: avaliable_space
                "#,
            )?;
            jail.set_env("CONFIG_PATH", "namenode.yaml");
            assert!(Config::load().is_err());

            jail.create_file(
                "namenode.yaml",
                r#"
                placement:
                  min_remaining_space: lots
                "#,
            )?;
            assert!(Config::load().is_err());
            Ok(())
        });
    }
}
