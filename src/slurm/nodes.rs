use color_eyre::eyre::{bail, Context};
use color_eyre::Result;
use serde::de::{self, IntoDeserializer};
use serde::Deserialize;

use crate::utilities::Fields;

use super::misc::split_list;

/// Base state of a node, i.e. the part of `State=` before any `+FLAG`
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaseState {
    Allocated,
    Down,
    Error,
    Future,
    Idle,
    Mixed,
    #[serde(other)]
    Unknown,
}

/// State of a node as reported by `scontrol`, e.g. `IDLE+DRAIN` or `DOWN*`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeState {
    pub base: BaseState,
    /// The node is draining or drained
    pub drain: bool,
}

impl NodeState {
    pub fn parse(value: &str) -> Self {
        let mut flags = value.split('+');
        // A trailing `*` marks nodes that are not responding
        let base = flags.next().unwrap_or_default().trim_end_matches('*');

        let deserializer: de::value::StrDeserializer<de::value::Error> = base.into_deserializer();
        let mut state = NodeState {
            base: BaseState::deserialize(deserializer).unwrap_or(BaseState::Unknown),
            drain: false,
        };

        // sinfo-style long names fold the drain flag into the base state
        if matches!(base, "DRAIN" | "DRAINED" | "DRAINING") {
            state.base = BaseState::Idle;
            state.drain = true;
        }

        if flags.any(|flag| {
            matches!(flag.trim_end_matches('*'), "DRAIN" | "DRAINED" | "DRAINING")
        }) {
            state.drain = true;
        }

        state
    }

    /// Returns true if the free resources of the node count towards its partitions
    pub fn is_includable(&self) -> bool {
        !self.drain && !matches!(self.base, BaseState::Down | BaseState::Unknown)
    }
}

#[derive(Clone, Debug)]
pub struct NodeRecord {
    pub name: String,
    /// Number of CPUs
    pub cpus: u32,
    /// Memory in MB
    pub real_memory: u64,
    pub state: NodeState,
    /// Number of allocated CPUs; None if the controller did not report the value
    pub alloc_cpus: Option<u32>,
    /// Comma separated list of generic resources
    pub gres: Option<String>,
    /// Comma separated list of active features, falling back to available features
    pub features: Option<String>,
    /// Reason given for the node being down/drained
    pub reason: Option<String>,
    /// Partitions to which this node belongs
    pub partitions: Vec<String>,
}

impl NodeRecord {
    /// Parses the output of `scontrol show node --oneline`
    pub fn parse(output: &[u8]) -> Result<Vec<NodeRecord>> {
        let mut nodes = Vec::new();
        for line in output.split(|&c| c == b'\n') {
            let fields = Fields::parse(line);
            if fields.is_empty() {
                continue;
            }

            let Some(name) = fields.get("NodeName") else {
                bail!(
                    "NodeName not found in scontrol output: {:?}",
                    String::from_utf8_lossy(line)
                );
            };

            nodes.push(
                NodeRecord::from_fields(name, &fields)
                    .wrap_err_with(|| format!("parsing node {:?}", name))?,
            );
        }

        Ok(nodes)
    }

    fn from_fields(name: &str, fields: &Fields) -> Result<NodeRecord> {
        let cpus = fields
            .parse_value("CPUTot")
            .ok_or_else(|| color_eyre::eyre::eyre!("invalid or missing CPUTot"))?;

        Ok(NodeRecord {
            name: name.to_string(),
            cpus,
            real_memory: fields.parse_value("RealMemory").unwrap_or_default(),
            state: NodeState::parse(fields.get("State").unwrap_or("UNKNOWN")),
            alloc_cpus: fields.parse_value("CPUAlloc"),
            gres: fields.text("Gres").map(str::to_string),
            features: fields
                .text("ActiveFeatures")
                .or_else(|| fields.text("AvailableFeatures"))
                .or_else(|| fields.text("Features"))
                .map(str::to_string),
            reason: fields.text("Reason").map(str::to_string),
            partitions: fields
                .text("Partitions")
                .map(|v| split_list(v).map(str::to_string).collect())
                .unwrap_or_default(),
        })
    }

    /// Returns true if the node's reason starts with one of the given power-save reasons
    pub fn in_power_save(&self, reasons: &[String]) -> bool {
        match &self.reason {
            Some(reason) => reasons.iter().any(|r| reason.starts_with(r.as_str())),
            None => false,
        }
    }
}
