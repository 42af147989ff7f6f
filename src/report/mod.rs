mod access;
mod columns;
mod condense;
mod layout;
mod render;
mod summary;
mod tally;

pub use access::{evaluate, evaluate_allow, evaluate_deny, Access, Status, StatusCode, Verdict};
pub use columns::{ColumnGroup, ColumnId, ColumnModel, ColumnSpec};
pub use condense::{condense, condense_label, duration};
pub use layout::{finalize, Layout};
pub use summary::{summarize, summarize_all, Cell, PartitionSummary};
pub use tally::ResourceTally;

use std::io::Write;
use std::str::FromStr;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing::{debug, warn};

use crate::error::{ReportError, Warning};
use crate::slurm::{Memberships, Snapshot};

/// Format of the generated report
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned columns for terminals
    #[default]
    Text,
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = color_eyre::Report;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(eyre!("unknown output format {:?}", value)),
        }
    }
}

/// Options controlling the contents of a report
#[derive(Clone, Debug, Default)]
pub struct ReportOptions {
    /// Show both the smallest and largest core count and memory of nodes
    pub both_extrema: bool,
    /// Show partitions that the user cannot use
    pub all_partitions: bool,
    /// Include partitions of federated clusters and show cluster names
    pub federation: bool,
    pub gres: bool,
    pub features: bool,
    /// Print user name, groups, accounts, and QOS before the table
    pub info: bool,
    /// Always print time limits as `DAYS-HH:MM`
    pub as_date: bool,
    /// Hide partition limits and node sizes
    pub simple: bool,
    /// Hide the user's own job counts
    pub no_jobs: bool,
    /// Show all partition limits, even when unset or common to all partitions
    pub long: bool,
    pub format: OutputFormat,
    /// Down nodes whose reason starts with one of these prefixes are counted as available
    pub power_save_reasons: Vec<String>,
}

/// A report built from a cluster snapshot, ready to be written
#[derive(Clone, Debug)]
pub struct Report {
    pub options: ReportOptions,
    pub warnings: Vec<Warning>,
    pub user: Memberships,
    pub summaries: Vec<PartitionSummary>,
    pub layout: Layout,
}

impl Report {
    pub fn build(snapshot: &Snapshot, options: &ReportOptions) -> Result<Report, ReportError> {
        let warnings = Warning::from_private_data(&snapshot.config.private_data);
        for warning in &warnings {
            warn!(%warning, "cluster restricts visible information");
        }

        let summaries = summarize_all(snapshot, options)?;
        let collapse = options.format == OutputFormat::Text && !options.simple && !options.long;
        let layout = finalize(&summaries, ColumnModel::new(options), options, collapse);

        debug!(
            partitions = summaries.len(),
            visible = summaries.iter().filter(|s| s.visible).count(),
            "built report"
        );

        Ok(Report {
            options: options.clone(),
            warnings,
            user: snapshot.user.clone(),
            summaries,
            layout,
        })
    }

    /// Writes the report in the selected output format
    pub fn write<W: Write>(&self, mut out: W) -> Result<()> {
        match self.options.format {
            OutputFormat::Text => render::write_text(&mut out, self),
            OutputFormat::Csv => render::write_csv(out, self),
            OutputFormat::Json => render::write_json(out, self),
        }
    }
}
