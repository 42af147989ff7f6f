use color_eyre::eyre::Context;
use color_eyre::Result;
use serde::{de, Deserialize, Deserializer};

use super::misc::format_string;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Terminated due to launch failure
    BootFail,
    /// Cancelled by user/admin
    Cancelled,
    /// Completed successfully
    Completed,
    /// Completing; processes may still be running
    Completing,
    /// Nodes are being booted for the job
    Configuring,
    /// Terminated due to deadline
    Deadline,
    /// Terminated with non-zero exit code or similar
    Failed,
    /// Terminated due to node failure
    NodeFail,
    OutOfMemory,
    Pending,
    Preempted,
    Requeued,
    Running,
    Suspended,
    Timeout,
    #[serde(other)]
    Other,
}

/// Why a pending job has not started yet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingReason {
    /// Waiting for resources to become available
    Resources,
    /// Waiting for higher priority jobs
    Priority,
    /// Held back by limits, licenses, dependencies, etc.
    Other,
}

impl PendingReason {
    fn from_str<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: &str = Deserialize::deserialize(deserializer)?;
        Ok(match value {
            "Resources" => PendingReason::Resources,
            "Priority" => PendingReason::Priority,
            _ => PendingReason::Other,
        })
    }

    /// Resource and priority waits are both caused by busy resources
    pub fn is_resource_wait(&self) -> bool {
        matches!(self, PendingReason::Resources | PendingReason::Priority)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct JobRecord {
    /// UID of the owner of the job
    #[serde(deserialize_with = "uid_from_str")]
    pub user_id: u32,
    /// Comma separated list of partitions requested by the job
    pub partitions: String,
    /// Number of CPUs requested by/allocated to the job
    pub cpus: u32,
    pub state: JobState,
    /// Reason for the current job state; only meaningful for pending jobs
    #[serde(deserialize_with = "PendingReason::from_str")]
    pub reason: PendingReason,
}

impl JobRecord {
    /// Arguments for `squeue` producing output understood by [`JobRecord::parse`]
    pub fn squeue_args() -> Vec<String> {
        vec![
            "--all".to_string(),
            "--noheader".to_string(),
            "--array".to_string(),
            "--Format".to_string(),
            squeue_format(),
        ]
    }

    pub fn parse<R>(reader: R) -> Result<Vec<JobRecord>>
    where
        R: std::io::Read,
    {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'|')
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut results = Vec::new();
        for result in reader.deserialize() {
            let job: JobRecord = result.wrap_err("error while parsing squeue output")?;
            results.push(job);
        }

        Ok(results)
    }

    /// Returns true if `partition` is one of the partitions requested by the job
    pub fn targets(&self, partition: &str) -> bool {
        self.partitions.split(',').any(|p| p == partition)
    }

    /// Pending, running, and suspended jobs are counted towards a user's jobs
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            JobState::Pending | JobState::Running | JobState::Suspended
        )
    }
}

/// Generates parameter for the `--Format` command-line option for `squeue`
fn squeue_format() -> String {
    format_string(
        ["UserId", "Partition", "NumCPUs", "State", "Reason"].iter(),
    )
}

/// Parses the `UserId` field, which is formatted as `name(uid)`
fn uid_from_str<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value: &str = Deserialize::deserialize(deserializer)?;
    let uid = match value.split_once('(') {
        Some((_, uid)) => uid.trim_end_matches(')'),
        None => value,
    };

    uid.parse()
        .map_err(|_| de::Error::custom(format!("invalid UserId: {:?}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOBS: &str = "\
alice(1000)|gpu|8|PENDING|Resources
bob(1001)|large,large_mpi|64|PENDING|QOSMaxJobsPerUserLimit
alice(1000)|cpu|16|RUNNING|None
alice(1000)|cpu|1|COMPLETING|None
carol(1002)|cpu|1|SOME_FUTURE_STATE|None
";

    #[test]
    fn test_parse_jobs() {
        let jobs = JobRecord::parse(std::io::Cursor::new(JOBS)).unwrap();
        assert_eq!(jobs.len(), 5);

        assert_eq!(jobs[0].user_id, 1000);
        assert_eq!(jobs[0].cpus, 8);
        assert_eq!(jobs[0].state, JobState::Pending);
        assert_eq!(jobs[0].reason, PendingReason::Resources);
        assert!(jobs[0].reason.is_resource_wait());

        assert_eq!(jobs[1].reason, PendingReason::Other);
        assert_eq!(jobs[2].state, JobState::Running);
        assert!(jobs[2].is_active());
        assert!(!jobs[3].is_active());
        assert_eq!(jobs[4].state, JobState::Other);
    }

    #[test]
    fn test_parse_invalid_uid() {
        assert!(JobRecord::parse(std::io::Cursor::new("alice(x)|cpu|1|PENDING|None\n")).is_err());
    }

    #[test]
    fn test_targets_exact_partition() {
        let jobs = JobRecord::parse(std::io::Cursor::new(JOBS)).unwrap();
        assert!(jobs[1].targets("large"));
        assert!(jobs[1].targets("large_mpi"));
        assert!(!jobs[1].targets("large_m"));
        assert!(!jobs[0].targets("gp"));
    }

    #[test]
    fn test_squeue_format() {
        assert_eq!(
            squeue_format(),
            "UserId:0|,Partition:0|,NumCPUs:0|,State:0|,Reason:0"
        );
    }
}
