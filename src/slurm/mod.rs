mod config;
mod jobs;
mod misc;
mod nodes;
mod partitions;
mod user;

pub use config::{ClusterConfig, PrivateData};
pub use jobs::{JobRecord, JobState, PendingReason};
pub use misc::split_list;
pub use nodes::{BaseState, NodeRecord, NodeState};
pub use partitions::{
    split_mem_limit, MemUnit, PartitionFlags, PartitionRecord, PartitionState, TimeLimit,
    MEM_PER_CPU, UNLIMITED,
};
pub use user::{Memberships, UserIdentity};

use color_eyre::Result;
use tracing::debug;

use crate::error::ReportError;

/// Source of the cluster state summarized in a report. Every call may fail, in which
/// case no report is produced.
pub trait ClusterState {
    /// Partitions, optionally including hidden partitions and those of federated clusters
    fn partitions(&self, all: bool, federation: bool) -> Result<Vec<PartitionRecord>>;

    fn nodes(&self) -> Result<Vec<NodeRecord>>;

    fn jobs(&self) -> Result<Vec<JobRecord>>;

    fn config(&self) -> Result<ClusterConfig>;

    /// Identity of the user running the program
    fn user(&self) -> Result<UserIdentity>;

    /// Names of all groups of which `name` is a member
    fn groups(&self, name: &str) -> Result<Vec<String>>;

    /// Accounts and QOS associated with `name`
    fn associations(&self, name: &str) -> Result<(Vec<String>, Vec<String>)>;
}

/// Cluster state collected via the Slurm command-line tools
#[derive(Clone, Debug)]
pub struct Slurm {
    pub scontrol: String,
    pub squeue: String,
    pub sacctmgr: String,
}

impl Default for Slurm {
    fn default() -> Self {
        Self {
            scontrol: "scontrol".to_string(),
            squeue: "squeue".to_string(),
            sacctmgr: "sacctmgr".to_string(),
        }
    }
}

impl ClusterState for Slurm {
    fn partitions(&self, all: bool, federation: bool) -> Result<Vec<PartitionRecord>> {
        let mut args = vec!["show", "partition", "--oneline"];
        if all {
            args.push("--all");
        }
        if federation {
            args.push("--federation");
        }

        PartitionRecord::parse(&misc::run(&self.scontrol, &args)?)
    }

    fn nodes(&self) -> Result<Vec<NodeRecord>> {
        NodeRecord::parse(&misc::run(
            &self.scontrol,
            &["show", "node", "--oneline", "--all"],
        )?)
    }

    fn jobs(&self) -> Result<Vec<JobRecord>> {
        let args = JobRecord::squeue_args();
        let args = args.iter().map(String::as_str).collect::<Vec<_>>();

        JobRecord::parse(std::io::Cursor::new(misc::run(&self.squeue, &args)?))
    }

    fn config(&self) -> Result<ClusterConfig> {
        Ok(ClusterConfig::parse(&misc::run(
            &self.scontrol,
            &["show", "config"],
        )?))
    }

    fn user(&self) -> Result<UserIdentity> {
        user::parse_identity(
            &misc::run("id", &["-u", "-n"])?,
            &misc::run("id", &["-u"])?,
            &misc::run("id", &["-g", "-n"])?,
        )
    }

    fn groups(&self, name: &str) -> Result<Vec<String>> {
        Ok(user::parse_groups(&misc::run("id", &["-G", "-n", name])?))
    }

    fn associations(&self, name: &str) -> Result<(Vec<String>, Vec<String>)> {
        let user = format!("user={}", name);
        user::parse_associations(&misc::run(
            &self.sacctmgr,
            &[
                "--noheader",
                "--parsable2",
                "list",
                "association",
                "where",
                &user,
                "format=account,qos",
            ],
        )?)
    }
}

/// An immutable view of the cluster taken at the start of a run
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub config: ClusterConfig,
    pub partitions: Vec<PartitionRecord>,
    pub nodes: Vec<NodeRecord>,
    pub jobs: Vec<JobRecord>,
    pub user: Memberships,
}

impl Snapshot {
    /// Collects the full cluster state, failing if any part of it cannot be obtained
    pub fn acquire<S>(state: &S, all: bool, federation: bool) -> Result<Snapshot, ReportError>
    where
        S: ClusterState + ?Sized,
    {
        let failed = |call: &'static str| {
            move |cause: color_eyre::Report| ReportError::Snapshot { call, cause }
        };

        let config = state.config().map_err(failed("cluster configuration"))?;
        let jobs = state.jobs().map_err(failed("jobs"))?;
        let nodes = state.nodes().map_err(failed("nodes"))?;
        let mut partitions = state
            .partitions(all, federation)
            .map_err(failed("partitions"))?;
        PartitionRecord::assign_nodes(&mut partitions, &nodes);

        let identity = state.user().map_err(failed("user identity"))?;
        let groups = state
            .groups(&identity.name)
            .map_err(failed("user groups"))?;
        let (accounts, qos) = state
            .associations(&identity.name)
            .map_err(failed("user associations"))?;

        debug!(
            partitions = partitions.len(),
            nodes = nodes.len(),
            jobs = jobs.len(),
            user = %identity.name,
            "collected cluster state"
        );

        Ok(Snapshot {
            config,
            partitions,
            nodes,
            jobs,
            user: Memberships {
                identity,
                groups,
                accounts,
                qos,
            },
        })
    }
}
