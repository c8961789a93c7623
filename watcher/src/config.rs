use eth2::types::SLOTS_PER_EPOCH;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::net::Ipv4Addr;
use std::path::PathBuf;

pub const DEFAULT_BEACON_NODE_URL: &str = "http://localhost:5052";
pub const DEFAULT_METRICS_LISTEN_PORT: u16 = 8000;
pub const DEFAULT_SECONDS_PER_SLOT: u64 = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub beacon_node_url: String,
    /// A file listing one public key of ours per line.
    pub pubkeys_file: Option<PathBuf>,
    /// A CSV file of labels, see `labels::load_labels_from_file`.
    pub labels_file: Option<PathBuf>,
    /// Do not keep the `validator_pubkey` column amongst the labels.
    pub drop_pubkey_label: bool,
    pub relay_urls: Vec<String>,
    pub slack_channel: Option<String>,
    pub slack_token: Option<String>,
    pub metrics_listen_addr: Ipv4Addr,
    pub metrics_listen_port: u16,
    pub debug_level: String,
    pub log_format: Option<String>,
    pub slots_per_epoch: u64,
    pub seconds_per_slot: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            beacon_node_url: DEFAULT_BEACON_NODE_URL.to_string(),
            pubkeys_file: None,
            labels_file: None,
            drop_pubkey_label: false,
            relay_urls: vec![],
            slack_channel: None,
            slack_token: None,
            metrics_listen_addr: Ipv4Addr::UNSPECIFIED,
            metrics_listen_port: DEFAULT_METRICS_LISTEN_PORT,
            debug_level: "info".to_string(),
            log_format: None,
            slots_per_epoch: SLOTS_PER_EPOCH,
            seconds_per_slot: DEFAULT_SECONDS_PER_SLOT,
        }
    }
}

impl Config {
    /// Reads a configuration from YAML. The result is not validated since the command line may
    /// still complete it, see `validate`.
    pub fn load_from_file(path_to_file: String) -> Result<Config, String> {
        let file =
            File::open(path_to_file).map_err(|e| format!("Error reading config file: {:?}", e))?;
        let config: Config = serde_yaml::from_reader(file)
            .map_err(|e| format!("Error parsing config file: {:?}", e))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.slots_per_epoch == 0 {
            return Err("slots_per_epoch must be greater than zero".to_string());
        }
        if self.seconds_per_slot == 0 {
            return Err("seconds_per_slot must be greater than zero".to_string());
        }
        if self.slack_channel.is_some() != self.slack_token.is_some() {
            return Err("slack_channel and slack_token must be set together".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "beacon_node_url: http://beacon:5052\nrelay_urls:\n  - http://relay.example.org\nmetrics_listen_port: 9100"
        )
        .unwrap();

        let config = Config::load_from_file(file.path().display().to_string()).unwrap();

        assert_eq!(config.beacon_node_url, "http://beacon:5052");
        assert_eq!(config.relay_urls, vec!["http://relay.example.org".to_string()]);
        assert_eq!(config.metrics_listen_port, 9100);
        assert_eq!(config.slots_per_epoch, SLOTS_PER_EPOCH);
        assert_eq!(config.slack_token, None);
    }

    #[test]
    fn slack_settings_go_together() {
        let config = Config {
            slack_channel: Some("#alerts".into()),
            ..Config::default()
        };

        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }
}
