use tracing::debug;

use crate::slurm::MemUnit;

use super::columns::{ColumnGroup, ColumnId, ColumnModel};
use super::summary::PartitionSummary;
use super::ReportOptions;

/// Final arrangement of the columns of a report
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    /// Columns shown for every partition
    pub columns: ColumnModel,
    /// Columns whose values are identical for all visible partitions, in display order
    pub common: Vec<ColumnId>,
    /// Index of the visible partition that provides the common values
    pub reference: Option<usize>,
    /// Width of a line of the main table
    pub width: usize,
}

impl Layout {
    /// Returns true if the personal job columns are shown in the main table
    pub fn has_personal_columns(&self) -> bool {
        self.columns
            .visible()
            .any(|column| column.id.group() == ColumnGroup::Personal)
    }
}

/// Decides which columns are shown in the main table, and which values are instead shown
/// once below it. Common values are only extracted if `collapse` is set.
pub fn finalize(
    summaries: &[PartitionSummary],
    mut columns: ColumnModel,
    options: &ReportOptions,
    collapse: bool,
) -> Layout {
    widen(&mut columns, ColumnId::Partition, summaries.iter().map(|s| s.name.len()));
    widen(&mut columns, ColumnId::Cluster, summaries.iter().map(|s| s.cluster.len()));

    let visible = summaries.iter().filter(|s| s.visible).collect::<Vec<_>>();

    if !options.long && !options.simple {
        let config = columns
            .iter()
            .filter(|column| column.id.is_config())
            .map(|column| column.id)
            .collect::<Vec<_>>();

        for id in config {
            let deviates = visible.iter().any(|s| s.deviates_from_default(id));
            columns.set_visible(id, deviates);
        }
    }

    let def_mem_unit = visible
        .iter()
        .find(|s| s.def_mem_gb != 0)
        .map(|s| s.def_mem_unit)
        .unwrap_or_default();
    let max_mem_unit = visible
        .iter()
        .find(|s| s.max_mem_gb != 0)
        .map(|s| s.max_mem_unit)
        .unwrap_or_default();

    for (id, unit) in [(ColumnId::DefMem, def_mem_unit), (ColumnId::MaxMem, max_mem_unit)] {
        if let Some(column) = columns.get_mut(id) {
            column.line2 = match unit {
                MemUnit::PerCpu => "GB/CPU",
                MemUnit::PerNode => "G/NODE",
            }
            .to_string();
        }
    }

    let reference = summaries.iter().position(|s| s.visible);
    let mut common = Vec::new();

    if let (true, Some(reference)) = (collapse, reference) {
        let base = &summaries[reference];
        let both = options.both_extrema;
        let constant = |id: ColumnId| {
            visible
                .iter()
                .all(|s| s.cell(id, both) == base.cell(id, both))
        };

        let candidates = columns
            .visible()
            .map(|column| column.id)
            .filter(ColumnId::is_optional)
            .collect::<Vec<_>>();

        // The personal columns are only moved as a whole
        let personal = candidates
            .iter()
            .filter(|id| id.group() == ColumnGroup::Personal)
            .collect::<Vec<_>>();
        let personal_constant = personal.iter().all(|&&id| constant(id));

        for &id in &candidates {
            let moved = match id.group() {
                ColumnGroup::Personal => personal_constant,
                _ => constant(id),
            };

            if moved {
                common.push(id);
            }
        }

        for &id in &common {
            columns.set_visible(id, false);
        }
    }

    let mut layout = Layout {
        columns,
        common,
        reference,
        width: 0,
    };

    // Group separators: `|` before the personal columns and `| ` after them
    let separators = if layout.has_personal_columns() { 3 } else { 2 };
    layout.width = layout
        .columns
        .visible()
        .map(|column| column.width + 1)
        .sum::<usize>()
        + separators;

    debug!(
        width = layout.width,
        common = ?layout.common,
        "finalized report layout"
    );

    layout
}

/// Widens a column to fit the longest of the given values
fn widen<I>(columns: &mut ColumnModel, id: ColumnId, lengths: I)
where
    I: Iterator<Item = usize>,
{
    if let Some(column) = columns.get_mut(id) {
        column.width = lengths.fold(column.width, usize::max);
    }
}
