use std::io::{self, Write};

use color_eyre::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use partinfo::args::Args;
use partinfo::report::Report;
use partinfo::slurm::Snapshot;

fn main() -> Result<()> {
    color_eyre::install()?;

    let args: Args = argh::from_env();
    if args.version {
        println!("partinfo v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let level = if args.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();

    let options = args.report_options();
    let snapshot = Snapshot::acquire(&args.slurm(), options.all_partitions, options.federation)?;
    let report = Report::build(&snapshot, &options)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report.write(&mut out)?;
    out.flush()?;

    Ok(())
}
