use serde::{Serialize, Serializer};

use crate::error::ReportError;
use crate::slurm::{
    split_mem_limit, JobRecord, JobState, MemUnit, Memberships, NodeRecord, PartitionRecord,
    Snapshot, TimeLimit, UNLIMITED,
};

use super::access::{self, Status};
use super::columns::ColumnId;
use super::tally::ResourceTally;
use super::ReportOptions;

/// Per-partition statistics shown in a single row of the report
#[derive(Clone, Debug, Serialize)]
pub struct PartitionSummary {
    pub cluster: String,
    pub name: String,
    pub status: Status,
    pub free_cpu: u64,
    pub total_cpu: u64,
    pub free_node: u64,
    pub total_node: u64,
    /// CPUs requested by jobs waiting for resources or priority
    pub waiting_resource: u64,
    /// CPUs requested by jobs waiting for any other reason
    pub waiting_other: u64,
    pub my_running: u64,
    pub my_waiting_resource: u64,
    pub my_waiting_other: u64,
    pub my_total: u64,
    pub min_nodes: u32,
    #[serde(serialize_with = "limit")]
    pub max_nodes: u32,
    #[serde(serialize_with = "cpu_limit")]
    pub max_cpus_per_node: u32,
    #[serde(serialize_with = "memory")]
    pub def_mem_gb: u64,
    pub def_mem_unit: MemUnit,
    #[serde(serialize_with = "memory")]
    pub max_mem_gb: u64,
    pub max_mem_unit: MemUnit,
    pub default_time: TimeLimit,
    pub max_time: TimeLimit,
    /// Smallest number of CPUs of a node; `u32::MAX` if the partition has no nodes
    #[serde(serialize_with = "fewest_cores")]
    pub min_core: u32,
    /// Largest number of CPUs of a node; 0 if the partition has no nodes
    #[serde(serialize_with = "most_cores")]
    pub max_core: u32,
    /// Smallest node memory in GB; `u64::MAX` if the partition has no nodes
    #[serde(serialize_with = "least_memory")]
    pub min_node_mem_gb: u64,
    #[serde(serialize_with = "memory")]
    pub max_node_mem_gb: u64,
    pub qos: String,
    pub gres: String,
    pub features: String,
    /// False if the row is hidden from the user
    pub visible: bool,
}

/// Serializes `value` as `null` if it is one of the placeholders for a missing value
fn except<T, S>(value: &T, placeholders: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    T: PartialEq + Serialize,
    S: Serializer,
{
    if placeholders.contains(value) {
        serializer.serialize_none()
    } else {
        serializer.serialize_some(value)
    }
}

fn limit<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    except(value, &[UNLIMITED], serializer)
}

fn cpu_limit<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    except(value, &[0, UNLIMITED], serializer)
}

fn fewest_cores<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    except(value, &[u32::MAX], serializer)
}

fn most_cores<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    except(value, &[0], serializer)
}

fn memory<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    except(value, &[0], serializer)
}

fn least_memory<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    except(value, &[u64::MAX], serializer)
}

/// Value of a single cell of the report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell<'a> {
    Number(u64),
    /// Differing extrema, shown as `min-max`
    Range(u64, u64),
    Time(TimeLimit),
    Text(&'a str),
    /// Left-justified text
    List(&'a str),
    Status(&'a Status),
    /// Unlimited or unset limits, and extrema of empty partitions
    Unset,
}

impl PartitionSummary {
    /// Returns false for partitions without nodes, whose extrema carry no information
    pub fn has_nodes(&self) -> bool {
        self.min_core <= self.max_core
    }

    /// Returns the value shown in column `id`. Extrema are shown as a range only with
    /// `both_extrema`, and are otherwise represented by their minimum.
    pub fn cell(&self, id: ColumnId, both_extrema: bool) -> Cell<'_> {
        let limit = |value: u32| match value {
            UNLIMITED => Cell::Unset,
            value => Cell::Number(value.into()),
        };

        let memory = |value: u64| match value {
            0 => Cell::Unset,
            value => Cell::Number(value),
        };

        let extrema = |min: u64, max: u64| {
            if !self.has_nodes() {
                Cell::Unset
            } else if both_extrema && min != max {
                Cell::Range(min, max)
            } else {
                Cell::Number(min)
            }
        };

        match id {
            ColumnId::Cluster => Cell::Text(&self.cluster),
            ColumnId::Partition => Cell::Text(&self.name),
            ColumnId::Status => Cell::Status(&self.status),
            ColumnId::FreeCpu => Cell::Number(self.free_cpu),
            ColumnId::TotalCpu => Cell::Number(self.total_cpu),
            ColumnId::WaitingResource => Cell::Number(self.waiting_resource),
            ColumnId::WaitingOther => Cell::Number(self.waiting_other),
            ColumnId::FreeNode => Cell::Number(self.free_node),
            ColumnId::TotalNode => Cell::Number(self.total_node),
            ColumnId::MyRunning => Cell::Number(self.my_running),
            ColumnId::MyWaitingResource => Cell::Number(self.my_waiting_resource),
            ColumnId::MyWaitingOther => Cell::Number(self.my_waiting_other),
            ColumnId::MyTotal => Cell::Number(self.my_total),
            ColumnId::MinNodes => Cell::Number(self.min_nodes.into()),
            ColumnId::MaxNodes => limit(self.max_nodes),
            ColumnId::MaxCpusPerNode => match self.max_cpus_per_node {
                0 => Cell::Unset,
                value => limit(value),
            },
            ColumnId::DefMem => memory(self.def_mem_gb),
            ColumnId::MaxMem => memory(self.max_mem_gb),
            ColumnId::DefaultTime => Cell::Time(self.default_time),
            ColumnId::MaxTime => Cell::Time(self.max_time),
            ColumnId::Cores => extrema(self.min_core.into(), self.max_core.into()),
            ColumnId::Memory => extrema(self.min_node_mem_gb, self.max_node_mem_gb),
            ColumnId::Qos => Cell::Text(&self.qos),
            ColumnId::Gres => Cell::List(&self.gres),
            ColumnId::Features => Cell::List(&self.features),
        }
    }

    /// Returns true if a partition limit differs from the value Slurm uses when it is unset
    pub fn deviates_from_default(&self, id: ColumnId) -> bool {
        match id {
            ColumnId::MinNodes => self.min_nodes != 0,
            ColumnId::MaxNodes => self.max_nodes != UNLIMITED,
            ColumnId::MaxCpusPerNode => !matches!(self.max_cpus_per_node, 0 | UNLIMITED),
            ColumnId::DefMem => self.def_mem_gb != 0,
            ColumnId::MaxMem => self.max_mem_gb != 0,
            ColumnId::MaxTime => self.max_time != TimeLimit::Unlimited,
            ColumnId::DefaultTime => {
                !matches!(self.default_time, TimeLimit::Unlimited | TimeLimit::Unset)
                    && self.default_time != self.max_time
            }
            ColumnId::Qos => !matches!(self.qos.as_str(), "-" | "normal"),
            _ => true,
        }
    }
}

/// Aggregates the nodes and jobs of a single partition
pub fn summarize(
    partition: &PartitionRecord,
    nodes: &[NodeRecord],
    jobs: &[JobRecord],
    user: &Memberships,
    options: &ReportOptions,
) -> Result<PartitionSummary, ReportError> {
    let verdict = access::evaluate(partition, user);
    let (def_mem, def_mem_unit) = split_mem_limit(partition.def_mem);
    let (max_mem, max_mem_unit) = split_mem_limit(partition.max_mem);

    let mut summary = PartitionSummary {
        cluster: partition.cluster.clone().unwrap_or_default(),
        name: partition.name.clone(),
        status: verdict.status,
        free_cpu: 0,
        total_cpu: 0,
        free_node: 0,
        total_node: 0,
        waiting_resource: 0,
        waiting_other: 0,
        my_running: 0,
        my_waiting_resource: 0,
        my_waiting_other: 0,
        my_total: 0,
        min_nodes: partition.min_nodes,
        max_nodes: partition.max_nodes,
        max_cpus_per_node: partition.max_cpus_per_node,
        def_mem_gb: def_mem / 1000,
        def_mem_unit,
        max_mem_gb: max_mem / 1000,
        max_mem_unit,
        default_time: partition.default_time,
        max_time: partition.max_time,
        min_core: u32::MAX,
        max_core: 0,
        min_node_mem_gb: u64::MAX,
        max_node_mem_gb: 0,
        qos: partition.qos.clone().unwrap_or_else(|| "-".to_string()),
        gres: String::new(),
        features: String::new(),
        visible: verdict.visible || options.all_partitions,
    };

    let count_gres = options.gres || options.long;
    let mut gres = ResourceTally::default();
    let mut features = ResourceTally::default();

    for index in partition.node_indices() {
        let node = nodes.get(index).ok_or_else(|| ReportError::MissingNode {
            partition: partition.name.clone(),
            index,
        })?;

        let alloc_cpus = node.alloc_cpus.ok_or_else(|| ReportError::NodeInfo {
            partition: partition.name.clone(),
            node: node.name.clone(),
        })?;

        let mem_gb = node.real_memory / 1000;
        summary.min_core = summary.min_core.min(node.cpus);
        summary.max_core = summary.max_core.max(node.cpus);
        summary.min_node_mem_gb = summary.min_node_mem_gb.min(mem_gb);
        summary.max_node_mem_gb = summary.max_node_mem_gb.max(mem_gb);
        summary.total_cpu += u64::from(node.cpus);
        summary.total_node += 1;

        if count_gres {
            if let Some(value) = &node.gres {
                gres.add(value);
            }
        }

        if options.features {
            if let Some(value) = &node.features {
                features.add(value);
            }
        }

        if node.state.is_includable() || node.in_power_save(&options.power_save_reasons) {
            if alloc_cpus == 0 {
                summary.free_node += 1;
            }

            summary.free_cpu += u64::from(node.cpus.saturating_sub(alloc_cpus));
        }
    }

    summary.gres = gres.summary();
    summary.features = features.summary();

    let uid = user.identity.uid;
    for job in jobs.iter().filter(|job| job.targets(&partition.name)) {
        let mine = job.user_id == uid;

        match job.state {
            JobState::Pending if job.reason.is_resource_wait() => {
                summary.waiting_resource += u64::from(job.cpus);
                if mine {
                    summary.my_waiting_resource += 1;
                }
            }
            JobState::Pending => {
                summary.waiting_other += u64::from(job.cpus);
                if mine {
                    summary.my_waiting_other += 1;
                }
            }
            JobState::Running if mine => summary.my_running += 1,
            _ => {}
        }

        if mine && job.is_active() {
            summary.my_total += 1;
        }
    }

    Ok(summary)
}

/// Summarizes every partition of the snapshot, in the order reported by Slurm
pub fn summarize_all(
    snapshot: &Snapshot,
    options: &ReportOptions,
) -> Result<Vec<PartitionSummary>, ReportError> {
    snapshot
        .partitions
        .iter()
        .map(|partition| {
            let mut summary = summarize(
                partition,
                &snapshot.nodes,
                &snapshot.jobs,
                &snapshot.user,
                options,
            )?;

            if summary.cluster.is_empty() {
                summary.cluster = snapshot.config.cluster_name.clone();
            }

            Ok(summary)
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::slurm::{ClusterConfig, UserIdentity};

    const PARTITIONS: &str = "\
PartitionName=gpu Default=YES MaxTime=2-00:00:00 State=UP
PartitionName=cpu MaxTime=2-00:00:00 State=UP
";

    const NODES: &str = "\
NodeName=g01 CPUAlloc=0 CPUTot=32 RealMemory=128000 State=IDLE Gres=gpu:a100:4 Partitions=gpu
NodeName=g02 CPUAlloc=0 CPUTot=32 RealMemory=128000 State=IDLE Gres=gpu:a100:4 Partitions=gpu
NodeName=c01 CPUAlloc=16 CPUTot=16 RealMemory=64000 State=ALLOCATED Partitions=cpu
NodeName=c02 CPUAlloc=0 CPUTot=16 RealMemory=64000 State=IDLE Partitions=cpu
NodeName=c03 CPUAlloc=0 CPUTot=16 RealMemory=64000 State=IDLE Partitions=cpu
";

    const JOBS: &str = "\
bob(1001)|gpu|8|PENDING|Resources
";

    pub fn user() -> Memberships {
        Memberships {
            identity: UserIdentity {
                name: "alice".to_string(),
                uid: 1000,
                primary_group: "users".to_string(),
            },
            groups: vec!["users".to_string()],
            accounts: vec!["physics".to_string()],
            qos: vec!["normal".to_string()],
        }
    }

    /// Two partitions: `gpu` with two idle 32-core nodes, `cpu` with three 16-core nodes
    /// of which one is fully allocated, and a single job waiting for resources on `gpu`
    pub fn snapshot() -> Snapshot {
        snapshot_from(PARTITIONS, NODES, JOBS)
    }

    pub fn snapshot_from(partitions: &str, nodes: &str, jobs: &str) -> Snapshot {
        let nodes = NodeRecord::parse(nodes.as_bytes()).unwrap();
        let mut partitions = PartitionRecord::parse(partitions.as_bytes()).unwrap();
        PartitionRecord::assign_nodes(&mut partitions, &nodes);

        Snapshot {
            config: ClusterConfig {
                cluster_name: "tiny".to_string(),
                ..Default::default()
            },
            partitions,
            nodes,
            jobs: JobRecord::parse(std::io::Cursor::new(jobs)).unwrap(),
            user: user(),
        }
    }

    #[test]
    fn test_summarize_scenario() {
        let summaries = summarize_all(&snapshot(), &ReportOptions::default()).unwrap();
        assert_eq!(summaries.len(), 2);

        let gpu = &summaries[0];
        assert_eq!(gpu.name, "gpu");
        assert_eq!(gpu.cluster, "tiny");
        assert_eq!(gpu.status.to_string(), "*");
        assert_eq!(gpu.free_cpu, 64);
        assert_eq!(gpu.total_cpu, 64);
        assert_eq!(gpu.free_node, 2);
        assert_eq!(gpu.total_node, 2);
        assert_eq!(gpu.waiting_resource, 8);
        assert_eq!(gpu.waiting_other, 0);
        assert_eq!((gpu.min_core, gpu.max_core), (32, 32));
        assert_eq!((gpu.min_node_mem_gb, gpu.max_node_mem_gb), (128, 128));

        let cpu = &summaries[1];
        assert_eq!(cpu.free_cpu, 32);
        assert_eq!(cpu.total_cpu, 48);
        assert_eq!(cpu.free_node, 2);
        assert_eq!(cpu.total_node, 3);
        assert_eq!(cpu.waiting_resource, 0);
        assert_eq!((cpu.min_core, cpu.max_core), (16, 16));
        assert!(cpu.visible);
    }

    #[test]
    fn test_free_never_exceeds_total() {
        let nodes = "\
NodeName=a CPUAlloc=4 CPUTot=8 RealMemory=1000 State=MIXED Partitions=p
NodeName=b CPUAlloc=0 CPUTot=8 RealMemory=1000 State=IDLE+DRAIN Partitions=p
NodeName=c CPUAlloc=0 CPUTot=8 RealMemory=1000 State=DOWN* Partitions=p
NodeName=d CPUAlloc=12 CPUTot=8 RealMemory=1000 State=ALLOCATED Partitions=p
NodeName=e CPUAlloc=0 CPUTot=4 RealMemory=2000 State=IDLE Partitions=p
";
        let snapshot = snapshot_from("PartitionName=p\n", nodes, "");
        let summaries = summarize_all(&snapshot, &ReportOptions::default()).unwrap();
        let p = &summaries[0];

        assert_eq!(p.free_cpu, 8);
        assert_eq!(p.free_node, 1);
        assert_eq!(p.total_cpu, 36);
        assert_eq!(p.total_node, 5);
        assert!(p.free_cpu <= p.total_cpu);
        assert!(p.free_node <= p.total_node);
        assert_eq!((p.min_core, p.max_core), (4, 8));
        assert_eq!((p.min_node_mem_gb, p.max_node_mem_gb), (1, 2));
    }

    #[test]
    fn test_power_save_reasons() {
        let nodes = "\
NodeName=a CPUAlloc=0 CPUTot=8 RealMemory=1000 State=DOWN Reason=PowerSave_PwrOffState Partitions=p
";
        let snapshot = snapshot_from("PartitionName=p\n", nodes, "");

        let summaries = summarize_all(&snapshot, &ReportOptions::default()).unwrap();
        assert_eq!(summaries[0].free_cpu, 0);

        let options = ReportOptions {
            power_save_reasons: vec!["PowerSave_".to_string()],
            ..Default::default()
        };
        let summaries = summarize_all(&snapshot, &options).unwrap();
        assert_eq!(summaries[0].free_cpu, 8);
        assert_eq!(summaries[0].free_node, 1);
    }

    #[test]
    fn test_empty_partition() {
        let snapshot = snapshot_from("PartitionName=empty\n", "", "");
        let summaries = summarize_all(&snapshot, &ReportOptions::default()).unwrap();

        assert!(!summaries[0].has_nodes());
        assert_eq!(summaries[0].total_node, 0);
        assert_eq!(summaries[0].free_cpu, 0);
    }

    #[test]
    fn test_missing_allocation_is_fatal() {
        let nodes = "NodeName=a CPUTot=8 RealMemory=1000 State=IDLE Partitions=p\n";
        let snapshot = snapshot_from("PartitionName=p\n", nodes, "");

        assert!(matches!(
            summarize_all(&snapshot, &ReportOptions::default()),
            Err(ReportError::NodeInfo { .. })
        ));
    }

    #[test]
    fn test_missing_node_is_fatal() {
        let mut snapshot = snapshot_from("PartitionName=p\n", "", "");
        snapshot.partitions[0].node_ranges = vec![(0, 1)];

        assert!(matches!(
            summarize_all(&snapshot, &ReportOptions::default()),
            Err(ReportError::MissingNode { index: 0, .. })
        ));
    }

    #[test]
    fn test_job_counters() {
        let jobs = "\
alice(1000)|large|4|PENDING|Resources
alice(1000)|large,large_mpi|2|PENDING|Priority
alice(1000)|large|8|PENDING|QOSMaxJobsPerUserLimit
alice(1000)|large|16|RUNNING|None
alice(1000)|large|16|SUSPENDED|None
alice(1000)|large|16|COMPLETED|None
bob(1001)|large_mpi|32|PENDING|Resources
bob(1001)|large|1|PENDING|Dependency
";
        let snapshot = snapshot_from("PartitionName=large\nPartitionName=large_mpi\n", "", jobs);
        let summaries = summarize_all(&snapshot, &ReportOptions::default()).unwrap();

        let large = &summaries[0];
        assert_eq!(large.waiting_resource, 6);
        assert_eq!(large.waiting_other, 9);
        assert_eq!(large.my_waiting_resource, 2);
        assert_eq!(large.my_waiting_other, 1);
        assert_eq!(large.my_running, 1);
        assert_eq!(large.my_total, 5);

        let mpi = &summaries[1];
        assert_eq!(mpi.waiting_resource, 34);
        assert_eq!(mpi.my_waiting_resource, 1);
        assert_eq!(mpi.my_total, 1);
    }

    #[test]
    fn test_tallies_only_when_requested() {
        let options = ReportOptions {
            gres: true,
            ..Default::default()
        };

        let summaries = summarize_all(&snapshot(), &options).unwrap();
        assert_eq!(summaries[0].gres, "gpu:a100:4(2)");
        assert_eq!(summaries[0].features, "-");
        assert_eq!(summaries[1].gres, "-");

        let summaries = summarize_all(&snapshot(), &ReportOptions::default()).unwrap();
        assert_eq!(summaries[0].gres, "-");

        let options = ReportOptions {
            long: true,
            ..Default::default()
        };
        let summaries = summarize_all(&snapshot(), &options).unwrap();
        assert_eq!(summaries[0].gres, "gpu:a100:4(2)");
        assert_eq!(summaries[0].features, "-");
    }

    #[test]
    fn test_cells() {
        let summaries = summarize_all(&snapshot(), &ReportOptions::default()).unwrap();
        let gpu = &summaries[0];

        assert_eq!(gpu.cell(ColumnId::Partition, false), Cell::Text("gpu"));
        assert_eq!(gpu.cell(ColumnId::FreeCpu, false), Cell::Number(64));
        assert_eq!(gpu.cell(ColumnId::MaxNodes, false), Cell::Unset);
        assert_eq!(gpu.cell(ColumnId::MaxCpusPerNode, false), Cell::Unset);
        assert_eq!(gpu.cell(ColumnId::DefMem, false), Cell::Unset);
        assert_eq!(
            gpu.cell(ColumnId::MaxTime, false),
            Cell::Time(TimeLimit::Minutes(2880))
        );
        assert_eq!(gpu.cell(ColumnId::Gres, false), Cell::List("-"));
    }

    #[test]
    fn test_extrema_cells() {
        let nodes = "\
NodeName=a CPUAlloc=0 CPUTot=8 RealMemory=16000 State=IDLE Partitions=p
NodeName=b CPUAlloc=0 CPUTot=64 RealMemory=512000 State=IDLE Partitions=p
";
        let snapshot = snapshot_from("PartitionName=p\nPartitionName=empty\n", nodes, "");
        let summaries = summarize_all(&snapshot, &ReportOptions::default()).unwrap();

        assert_eq!(summaries[0].cell(ColumnId::Cores, false), Cell::Number(8));
        assert_eq!(summaries[0].cell(ColumnId::Cores, true), Cell::Range(8, 64));
        assert_eq!(summaries[0].cell(ColumnId::Memory, true), Cell::Range(16, 512));
        assert_eq!(summaries[1].cell(ColumnId::Cores, true), Cell::Unset);
    }

    #[test]
    fn test_deviates_from_default() {
        let snapshot = snapshot_from(
            "PartitionName=a QoS=normal\n\
             PartitionName=b MinNodes=2 MaxNodes=8 DefaultTime=1:00:00 MaxTime=2:00:00 QoS=gpu\n",
            "",
            "",
        );
        let summaries = summarize_all(&snapshot, &ReportOptions::default()).unwrap();

        for id in [
            ColumnId::MinNodes,
            ColumnId::MaxNodes,
            ColumnId::DefaultTime,
            ColumnId::MaxTime,
            ColumnId::Qos,
        ] {
            assert!(!summaries[0].deviates_from_default(id), "{:?}", id);
            assert!(summaries[1].deviates_from_default(id), "{:?}", id);
        }

        assert!(!summaries[1].deviates_from_default(ColumnId::MaxCpusPerNode));
    }

    #[test]
    fn test_visibility_override() {
        let snapshot = snapshot_from("PartitionName=p AllowAccounts=chem\n", "", "");

        let summaries = summarize_all(&snapshot, &ReportOptions::default()).unwrap();
        assert!(!summaries[0].visible);
        assert_eq!(summaries[0].status.to_string(), "A");

        let options = ReportOptions {
            all_partitions: true,
            ..Default::default()
        };
        assert!(summarize_all(&snapshot, &options).unwrap()[0].visible);
    }
}
