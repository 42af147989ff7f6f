use color_eyre::eyre::{bail, eyre, Context};
use color_eyre::Result;
use serde::Serialize;

use crate::utilities::Fields;

use super::nodes::NodeRecord;

/// Flag bit set in memory limits that apply per allocated CPU rather than per node
pub const MEM_PER_CPU: u64 = 1 << 63;
/// Value used for limits that are not set, e.g. `MaxNodes=UNLIMITED`
pub const UNLIMITED: u32 = u32::MAX;

/// Unit of a memory limit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemUnit {
    #[default]
    PerCpu,
    PerNode,
}

/// Splits a raw memory limit into its value (MB) and the unit encoded in the flag bit
pub fn split_mem_limit(raw: u64) -> (u64, MemUnit) {
    if raw & MEM_PER_CPU != 0 {
        (raw & !MEM_PER_CPU, MemUnit::PerCpu)
    } else {
        (raw, MemUnit::PerNode)
    }
}

/// A partition time limit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeLimit {
    Unlimited,
    Unset,
    Minutes(u32),
}

impl TimeLimit {
    /// Parses `UNLIMITED`, `NONE`, or `[days-]hours:minutes:seconds`
    pub fn parse(value: &str) -> Result<TimeLimit> {
        match value {
            "UNLIMITED" | "INFINITE" => return Ok(TimeLimit::Unlimited),
            "NONE" | "" | "n/a" | "N/A" => return Ok(TimeLimit::Unset),
            _ => {}
        }

        let parse = |v: &str| {
            v.parse::<u32>()
                .wrap_err_with(|| format!("invalid value in time limit {:?}", value))
        };

        let (days, value) = match value.split_once('-') {
            Some((days, rest)) => (parse(days)?, rest),
            None => (0, value),
        };

        let values = value.split(':').collect::<Vec<_>>();
        let (hours, minutes) = match values.as_slice() {
            [minutes] => (0, parse(minutes)?),
            [minutes, _seconds] => (0, parse(minutes)?),
            [hours, minutes, _seconds] => (parse(hours)?, parse(minutes)?),
            _ => bail!("invalid time limit {:?}", value),
        };

        Ok(TimeLimit::Minutes(days * 1440 + hours * 60 + minutes))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PartitionFlags {
    pub default: bool,
    pub hidden: bool,
    pub root_only: bool,
    pub no_root: bool,
    pub req_resv: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PartitionState {
    #[default]
    Up,
    Down,
    Drain,
    Inactive,
}

#[derive(Clone, Debug)]
pub struct PartitionRecord {
    pub name: String,
    /// Cluster owning the partition; only reported for federated clusters
    pub cluster: Option<String>,
    /// Inclusive `[start, end]` ranges of indices into the node list
    pub node_ranges: Vec<(usize, usize)>,
    pub flags: PartitionFlags,
    pub state: PartitionState,
    pub min_nodes: u32,
    pub max_nodes: u32,
    pub max_cpus_per_node: u32,
    /// Default memory in MB, with [`MEM_PER_CPU`] set for per-CPU limits
    pub def_mem: u64,
    /// Maximum memory in MB, with [`MEM_PER_CPU`] set for per-CPU limits
    pub max_mem: u64,
    pub default_time: TimeLimit,
    pub max_time: TimeLimit,
    pub allow_accounts: Option<String>,
    pub deny_accounts: Option<String>,
    pub allow_qos: Option<String>,
    pub deny_qos: Option<String>,
    pub allow_groups: Option<String>,
    pub deny_groups: Option<String>,
    /// Name of the partition QOS
    pub qos: Option<String>,
}

impl PartitionRecord {
    /// Parses the output of `scontrol show partition --oneline`
    pub fn parse(output: &[u8]) -> Result<Vec<PartitionRecord>> {
        let mut partitions = Vec::new();
        for line in output.split(|&c| c == b'\n') {
            let fields = Fields::parse(line);
            if fields.is_empty() {
                continue;
            }

            let name = fields.get("PartitionName").ok_or_else(|| {
                eyre!(
                    "PartitionName not found in scontrol output: {:?}",
                    String::from_utf8_lossy(line)
                )
            })?;

            partitions.push(
                PartitionRecord::from_fields(name, &fields)
                    .wrap_err_with(|| format!("parsing partition {:?}", name))?,
            );
        }

        Ok(partitions)
    }

    fn from_fields(name: &str, fields: &Fields) -> Result<PartitionRecord> {
        let yes = |key: &str| fields.get(key) == Some("YES");
        let state = match fields.get("State") {
            Some("UP") | None => PartitionState::Up,
            Some("DOWN") => PartitionState::Down,
            Some("DRAIN") => PartitionState::Drain,
            Some("INACTIVE") => PartitionState::Inactive,
            Some(other) => bail!("unknown partition state {:?}", other),
        };

        Ok(PartitionRecord {
            name: name.to_string(),
            cluster: fields.text("Cluster").map(str::to_string),
            node_ranges: Vec::new(),
            flags: PartitionFlags {
                default: yes("Default"),
                hidden: yes("Hidden"),
                root_only: yes("RootOnly"),
                no_root: yes("DisableRootJobs"),
                req_resv: yes("ReqResv"),
            },
            state,
            min_nodes: fields.parse_value("MinNodes").unwrap_or(0),
            max_nodes: fields.parse_value("MaxNodes").unwrap_or(UNLIMITED),
            max_cpus_per_node: fields.parse_value("MaxCPUsPerNode").unwrap_or(UNLIMITED),
            def_mem: mem_limit(fields, "DefMemPerCPU", "DefMemPerNode"),
            max_mem: mem_limit(fields, "MaxMemPerCPU", "MaxMemPerNode"),
            default_time: TimeLimit::parse(fields.get("DefaultTime").unwrap_or("NONE"))?,
            max_time: TimeLimit::parse(fields.get("MaxTime").unwrap_or("UNLIMITED"))?,
            allow_accounts: access_list(fields, "AllowAccounts"),
            deny_accounts: access_list(fields, "DenyAccounts"),
            allow_qos: access_list(fields, "AllowQos"),
            deny_qos: access_list(fields, "DenyQos"),
            allow_groups: access_list(fields, "AllowGroups"),
            deny_groups: access_list(fields, "DenyGroups"),
            qos: fields.text("QoS").map(str::to_string),
        })
    }

    /// Fills `node_ranges` of every partition from the partition memberships of `nodes`
    pub fn assign_nodes(partitions: &mut [PartitionRecord], nodes: &[NodeRecord]) {
        for partition in partitions {
            let mut ranges: Vec<(usize, usize)> = Vec::new();
            let indices = nodes
                .iter()
                .enumerate()
                .filter(|(_, node)| node.partitions.iter().any(|p| p == &partition.name))
                .map(|(index, _)| index);

            for index in indices {
                match ranges.last_mut() {
                    Some((_, end)) if *end + 1 == index => *end = index,
                    _ => ranges.push((index, index)),
                }
            }

            partition.node_ranges = ranges;
        }
    }

    /// Iterates over the node indices covered by `node_ranges`
    pub fn node_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.node_ranges.iter().flat_map(|&(start, end)| start..=end)
    }
}

/// Combines per-CPU and per-node limits into a raw limit; `UNLIMITED` and missing values are 0
fn mem_limit(fields: &Fields, per_cpu: &str, per_node: &str) -> u64 {
    if let Some(value) = fields.parse_value::<u64>(per_cpu) {
        value | MEM_PER_CPU
    } else {
        fields.parse_value::<u64>(per_node).unwrap_or(0)
    }
}

/// Access lists set to `ALL` or left empty place no restrictions on users
fn access_list(fields: &Fields, key: &str) -> Option<String> {
    fields
        .text(key)
        .filter(|value| *value != "ALL")
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARTITIONS: &[u8] = b"\
PartitionName=gpu AllowGroups=ALL AllowAccounts=physics,chem AllowQos=ALL Default=YES QoS=N/A DefaultTime=01:00:00 DisableRootJobs=NO Hidden=NO MaxNodes=UNLIMITED MaxTime=2-00:00:00 MinNodes=1 MaxCPUsPerNode=UNLIMITED Nodes=n[01-02] RootOnly=NO ReqResv=NO State=UP TotalCPUs=64 TotalNodes=2 DefMemPerCPU=4000 MaxMemPerNode=UNLIMITED
PartitionName=debug AllowGroups=admins AllowAccounts=ALL DenyQos=low Hidden=YES MaxNodes=4 MaxTime=30:00 State=DRAIN DefMemPerNode=64000 QoS=debugqos ReqResv=YES
";

    #[test]
    fn test_parse_partitions() {
        let partitions = PartitionRecord::parse(PARTITIONS).unwrap();
        assert_eq!(partitions.len(), 2);

        let gpu = &partitions[0];
        assert_eq!(gpu.name, "gpu");
        assert!(gpu.flags.default);
        assert!(!gpu.flags.hidden);
        assert_eq!(gpu.state, PartitionState::Up);
        assert_eq!(gpu.min_nodes, 1);
        assert_eq!(gpu.max_nodes, UNLIMITED);
        assert_eq!(gpu.max_cpus_per_node, UNLIMITED);
        assert_eq!(split_mem_limit(gpu.def_mem), (4000, MemUnit::PerCpu));
        assert_eq!(gpu.max_mem, 0);
        assert_eq!(gpu.default_time, TimeLimit::Minutes(60));
        assert_eq!(gpu.max_time, TimeLimit::Minutes(2880));
        assert_eq!(gpu.allow_accounts.as_deref(), Some("physics,chem"));
        assert_eq!(gpu.allow_groups, None);
        assert_eq!(gpu.qos, None);

        let debug = &partitions[1];
        assert!(debug.flags.hidden);
        assert!(debug.flags.req_resv);
        assert_eq!(debug.state, PartitionState::Drain);
        assert_eq!(debug.max_nodes, 4);
        assert_eq!(debug.max_time, TimeLimit::Minutes(30));
        assert_eq!(debug.default_time, TimeLimit::Unset);
        assert_eq!(split_mem_limit(debug.def_mem), (64000, MemUnit::PerNode));
        assert_eq!(debug.deny_qos.as_deref(), Some("low"));
        assert_eq!(debug.allow_groups.as_deref(), Some("admins"));
        assert_eq!(debug.qos.as_deref(), Some("debugqos"));
    }

    #[test]
    fn test_parse_unknown_state() {
        assert!(PartitionRecord::parse(b"PartitionName=x State=BROKEN\n").is_err());
    }

    #[test]
    fn test_time_limit() {
        assert_eq!(TimeLimit::parse("UNLIMITED").unwrap(), TimeLimit::Unlimited);
        assert_eq!(TimeLimit::parse("NONE").unwrap(), TimeLimit::Unset);
        assert_eq!(TimeLimit::parse("45").unwrap(), TimeLimit::Minutes(45));
        assert_eq!(TimeLimit::parse("10:00").unwrap(), TimeLimit::Minutes(10));
        assert_eq!(
            TimeLimit::parse("1-02:03:00").unwrap(),
            TimeLimit::Minutes(1440 + 120 + 3)
        );
        assert!(TimeLimit::parse("1-x:00:00").is_err());
        assert!(TimeLimit::parse("1:2:3:4").is_err());
    }

    #[test]
    fn test_assign_nodes() {
        let node = |name: &str, partitions: &[&str]| NodeRecord {
            name: name.to_string(),
            cpus: 1,
            real_memory: 1000,
            state: crate::slurm::NodeState::parse("IDLE"),
            alloc_cpus: Some(0),
            gres: None,
            features: None,
            reason: None,
            partitions: partitions.iter().map(|v| v.to_string()).collect(),
        };

        let nodes = vec![
            node("a", &["x"]),
            node("b", &["x", "y"]),
            node("c", &["y"]),
            node("d", &["x"]),
        ];

        let mut partitions = PartitionRecord::parse(b"PartitionName=x\nPartitionName=y\n").unwrap();
        PartitionRecord::assign_nodes(&mut partitions, &nodes);

        assert_eq!(partitions[0].node_ranges, [(0, 1), (3, 3)]);
        assert_eq!(partitions[1].node_ranges, [(1, 2)]);
        assert_eq!(partitions[0].node_indices().collect::<Vec<_>>(), [0, 1, 3]);
    }
}
