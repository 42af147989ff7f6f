use std::io::Write;

use color_eyre::eyre::Context;
use color_eyre::Result;

use super::columns::{ColumnGroup, ColumnSpec};
use super::condense::{condense, duration, duration_label};
use super::summary::{Cell, PartitionSummary};
use super::Report;

/// Width of the label column of the common values block
const LABEL_WIDTH: usize = 17;

/// Renders a cell right-justified (or left-justified for lists) in `width` characters
pub fn format_cell(cell: Cell, width: usize, as_date: bool) -> String {
    match cell {
        Cell::Number(value) => condense(value, width),
        Cell::Range(min, max) => format!("{:>width$}", format!("{}-{}", min, max)),
        Cell::Time(limit) => duration(limit, width, as_date),
        Cell::Text(value) => format!("{:>width$}", value),
        Cell::List(value) => format!("{:<width$}", value),
        Cell::Status(status) => format!("{:>width$}", status),
        Cell::Unset => format!("{:>width$}", "-"),
    }
}

/// Renders a cell without padding or condensing
pub fn cell_label(cell: Cell) -> String {
    match cell {
        Cell::Number(value) => value.to_string(),
        Cell::Range(min, max) => format!("{}-{}", min, max),
        Cell::Time(limit) => duration_label(limit),
        Cell::Text(value) | Cell::List(value) => value.to_string(),
        Cell::Status(status) => status.to_string(),
        Cell::Unset => "-".to_string(),
    }
}

/// Joins the fields of a line of the main table, separating the personal job columns
fn table_line<F>(columns: &[&ColumnSpec], mut field: F) -> String
where
    F: FnMut(&ColumnSpec) -> String,
{
    let mut line = String::new();
    let mut push = |line: &mut String, group: ColumnGroup| {
        for &column in columns.iter().filter(|column| column.id.group() == group) {
            line.push_str(&field(column));
            line.push(' ');
        }
    };

    push(&mut line, ColumnGroup::Resources);
    if columns.iter().any(|c| c.id.group() == ColumnGroup::Personal) {
        line.push('|');
        push(&mut line, ColumnGroup::Personal);
    }
    line.push_str("| ");
    push(&mut line, ColumnGroup::Limits);

    line
}

/// Joins the fields of a line of the common values block, which has no separators
fn common_line<F>(label: &str, columns: &[&ColumnSpec], mut field: F) -> String
where
    F: FnMut(&ColumnSpec) -> String,
{
    let mut line = format!("{:>LABEL_WIDTH$} ", label);
    for &column in columns {
        line.push_str(&field(column));
        line.push(' ');
    }

    line
}

fn header(column: &ColumnSpec, line2: bool) -> String {
    let width = column.width;
    if line2 {
        format!("{:>width$}", column.line2)
    } else {
        format!("{:>width$}", column.line1)
    }
}

fn row(summary: &PartitionSummary, column: &ColumnSpec, report: &Report) -> String {
    format_cell(
        summary.cell(column.id, report.options.both_extrema),
        column.width,
        report.options.as_date,
    )
}

/// Writes the fixed-width text report
pub fn write_text<W: Write>(out: &mut W, report: &Report) -> Result<()> {
    if !report.warnings.is_empty() {
        writeln!(out, "WARNING: The Slurm settings have info restrictions!")?;
        for warning in &report.warnings {
            writeln!(out, "\t{}!", warning)?;
        }
        writeln!(out)?;
    }

    if report.options.info {
        let user = &report.user;
        writeln!(out, " Your username: {}", user.identity.name)?;
        writeln!(out, " Your group(s): {}", user.groups.join(" "))?;
        writeln!(out, " Your account(s): {}", user.accounts.join(" "))?;
        writeln!(out, " Your qos(s): {}", user.qos.join(" "))?;
        writeln!(out)?;
    }

    let layout = &report.layout;
    let columns = layout.columns.visible().collect::<Vec<_>>();

    writeln!(out, "{}", table_line(&columns, |c| header(c, false)))?;
    writeln!(out, "{}", table_line(&columns, |c| header(c, true)))?;
    for summary in report.summaries.iter().filter(|s| s.visible) {
        writeln!(out, "{}", table_line(&columns, |c| row(summary, c, report)))?;
    }

    let reference = layout.reference.and_then(|index| report.summaries.get(index));
    if let (false, Some(reference)) = (layout.common.is_empty(), reference) {
        let common = layout
            .common
            .iter()
            .filter_map(|&id| layout.columns.get(id))
            .collect::<Vec<_>>();

        writeln!(out)?;
        writeln!(out, "{}", common_line("", &common, |c| header(c, false)))?;
        writeln!(out, "{}", common_line("", &common, |c| header(c, true)))?;
        writeln!(
            out,
            "{}",
            common_line("COMMON VALUES:", &common, |c| row(reference, c, report))
        )?;
    }

    Ok(())
}

/// Writes one record per visible partition, preceded by a header of column keys
pub fn write_csv<W: Write>(out: W, report: &Report) -> Result<()> {
    let columns = report.layout.columns.visible().collect::<Vec<_>>();
    let mut writer = csv::Writer::from_writer(out);

    writer
        .write_record(columns.iter().map(|column| column.id.key()))
        .wrap_err("failed to write CSV header")?;

    for summary in report.summaries.iter().filter(|s| s.visible) {
        writer
            .write_record(columns.iter().map(|column| {
                cell_label(summary.cell(column.id, report.options.both_extrema))
            }))
            .wrap_err_with(|| format!("failed to write CSV record for {:?}", summary.name))?;
    }

    writer.flush().wrap_err("failed to write CSV output")
}

/// Writes the visible partition summaries as a JSON array
pub fn write_json<W: Write>(mut out: W, report: &Report) -> Result<()> {
    let visible = report
        .summaries
        .iter()
        .filter(|s| s.visible)
        .collect::<Vec<_>>();

    serde_json::to_writer_pretty(&mut out, &visible).wrap_err("failed to write JSON output")?;
    writeln!(out)?;

    Ok(())
}
