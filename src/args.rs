use argh::FromArgs;

use crate::report::{OutputFormat, ReportOptions};
use crate::slurm::Slurm;

/// Summary of Slurm partitions, their free resources, and your jobs
#[derive(FromArgs, Debug)]
pub struct Args {
    /// show both the smallest and largest core count and memory of nodes
    #[argh(switch, short = 'm')]
    pub both_extrema: bool,

    /// show hidden partitions and partitions that you cannot use
    #[argh(switch, short = 'a')]
    pub all: bool,

    /// show partitions of federated clusters, along with the cluster names
    #[argh(switch, short = 'c')]
    pub federation: bool,

    /// show the generic resources (GRES) of the nodes of each partition
    #[argh(switch, short = 'g')]
    pub gres: bool,

    /// show the features of the nodes of each partition
    #[argh(switch, short = 'f')]
    pub features: bool,

    /// show your username, groups, accounts, and QOS
    #[argh(switch, short = 'i')]
    pub info: bool,

    /// show time limits as DAYS-HH:MM
    #[argh(switch, short = 't')]
    pub as_date: bool,

    /// simple output without partition limits and node sizes
    #[argh(switch, short = 's')]
    pub simple: bool,

    /// hide your own job counts
    #[argh(switch, short = 'J')]
    pub no_jobs: bool,

    /// show all partitions and limits, including unset and common values, along with GRES
    /// and both extrema of node sizes
    #[argh(switch, short = 'l')]
    pub long: bool,

    /// output format: text, csv, or json
    #[argh(option, default = "OutputFormat::Text")]
    pub format: OutputFormat,

    /// count down nodes whose reason starts with this prefix as available; may be repeated
    #[argh(option)]
    pub power_save_reason: Vec<String>,

    /// location of `scontrol` executable
    #[argh(option, default = "\"scontrol\".to_string()")]
    pub scontrol: String,

    /// location of `squeue` executable
    #[argh(option, default = "\"squeue\".to_string()")]
    pub squeue: String,

    /// location of `sacctmgr` executable
    #[argh(option, default = "\"sacctmgr\".to_string()")]
    pub sacctmgr: String,

    /// log debug messages to standard error
    #[argh(switch)]
    pub debug: bool,

    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
}

impl Args {
    /// Resolves the flags into report options; `-l` implies `-m`, `-a` and `-g`
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            both_extrema: self.both_extrema || self.long,
            all_partitions: self.all || self.long,
            federation: self.federation,
            gres: self.gres || self.long,
            features: self.features,
            info: self.info,
            as_date: self.as_date,
            simple: self.simple,
            no_jobs: self.no_jobs,
            long: self.long,
            format: self.format,
            power_save_reasons: self.power_save_reason.clone(),
        }
    }

    /// Cluster state provider using the configured executables
    pub fn slurm(&self) -> Slurm {
        Slurm {
            scontrol: self.scontrol.clone(),
            squeue: self.squeue.clone(),
            sacctmgr: self.sacctmgr.clone(),
        }
    }
}
