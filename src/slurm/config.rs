use crate::utilities::split_first;

use super::misc::split_list;

/// Information hidden from regular users via the `PrivateData` option
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrivateData {
    pub jobs: bool,
    pub nodes: bool,
    pub partitions: bool,
}

impl PrivateData {
    fn parse(value: &str) -> Self {
        let mut private = PrivateData::default();
        for item in split_list(value) {
            match item.to_ascii_lowercase().as_str() {
                "jobs" => private.jobs = true,
                "nodes" => private.nodes = true,
                "partitions" => private.partitions = true,
                _ => {}
            }
        }

        private
    }
}

/// Global cluster configuration
#[derive(Clone, Debug, Default)]
pub struct ClusterConfig {
    pub cluster_name: String,
    pub private_data: PrivateData,
}

impl ClusterConfig {
    /// Parses the output of `scontrol show config` and collects relevant values
    pub fn parse(output: &[u8]) -> ClusterConfig {
        let mut config = ClusterConfig::default();

        for line in output.split(|&c| c == b'\n') {
            if let Some((key, value)) = split_first(line, b'=') {
                let value = String::from_utf8_lossy(value.trim_ascii());
                match key.trim_ascii() {
                    b"ClusterName" => config.cluster_name = value.into_owned(),
                    b"PrivateData" => config.private_data = PrivateData::parse(&value),
                    _ => {}
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = ClusterConfig::parse(
            b"Configuration data as of 2024-01-01T00:00:00\n\
              AccountingStorageType   = accounting_storage/slurmdbd\n\
              ClusterName             = tiny\n\
              PrivateData             = jobs,usage\n",
        );

        assert_eq!(config.cluster_name, "tiny");
        assert!(config.private_data.jobs);
        assert!(!config.private_data.nodes);
        assert!(!config.private_data.partitions);
    }

    #[test]
    fn test_parse_config_public() {
        let config = ClusterConfig::parse(b"ClusterName = tiny\nPrivateData = none\n");
        assert_eq!(config.private_data, PrivateData::default());
    }
}
