use std::fs::File;
use std::io;

use anyhow::Context;
use bench_scripts::arpd::{compute_arpd, ReferenceTable, ResultTable};
use bench_scripts::{cli, logger};

fn main() -> anyhow::Result<()> {
    logger::init();
    let arguments = cli::arpd_cli();

    let reference = ReferenceTable::from_path(&arguments.ref_file)
        .with_context(|| format!("cannot read reference table {}", arguments.ref_file))?;
    let results = ResultTable::from_path(&arguments.result_file, &arguments.metrics)
        .with_context(|| format!("cannot read results table {}", arguments.result_file))?;

    // nothing is printed unless every class could be computed
    let table = compute_arpd(&reference, &results, &arguments.metrics)?;

    if arguments.pretty {
        table.to_pretty(arguments.precision).printstd();
    } else {
        table.write_csv(io::stdout().lock())?;
    }

    if let Some(path) = &arguments.flamegraph {
        let file = File::create(path).with_context(|| format!("cannot create {}", path))?;
        flame::dump_html(file)?;
    }
    Ok(())
}
