use std::fmt;

use crate::slurm::PrivateData;

/// Errors that abort a report; no partial report is ever printed
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// A query for the cluster state failed
    #[error("failed to load {call}: {cause:?}")]
    Snapshot {
        call: &'static str,
        cause: color_eyre::Report,
    },
    /// The number of allocated CPUs of a node could not be determined
    #[error("allocated CPUs of node {node:?} (partition {partition:?}) are unknown")]
    NodeInfo { partition: String, node: String },
    /// A partition refers to a node missing from the node list
    #[error("partition {partition:?} refers to unknown node index {index}")]
    MissingNode { partition: String, index: usize },
}

/// Non-fatal conditions that make parts of a report less complete
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Warning {
    /// Pending jobs of other users are hidden
    PrivateJobs,
    /// Node states are hidden
    PrivateNodes,
    /// Partitions are hidden
    PrivatePartitions,
}

impl Warning {
    /// Lists the restrictions implied by the cluster's `PrivateData` setting
    pub fn from_private_data(private: &PrivateData) -> Vec<Warning> {
        let mut warnings = Vec::new();
        if private.jobs {
            warnings.push(Warning::PrivateJobs);
        }
        if private.nodes {
            warnings.push(Warning::PrivateNodes);
        }
        if private.partitions {
            warnings.push(Warning::PrivatePartitions);
        }

        warnings
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Warning::PrivateJobs => "other users' waiting jobs can not be shown",
            Warning::PrivateNodes => "node status can not be shown",
            Warning::PrivatePartitions => "partition info can not be shown",
        })
    }
}
