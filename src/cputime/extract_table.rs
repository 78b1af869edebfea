use std::io;

use anyhow::Context;
use bench_scripts::instances::read_instance_paths;
use bench_scripts::perf::extract_final_values;
use bench_scripts::{cli, logger};

fn main() -> anyhow::Result<()> {
    logger::init();
    let arguments = cli::extract_cli();

    let instances = read_instance_paths(&arguments.instance_list)
        .with_context(|| format!("cannot read instance list {}", arguments.instance_list))?;
    let values = extract_final_values(
        &instances,
        &arguments.prefix,
        &arguments.suffix,
        &arguments.metric,
    )?;

    if arguments.with_names {
        let mut writer = csv::Writer::from_writer(io::stdout().lock());
        writer.write_record(["name", arguments.metric.as_str()])?;
        for (name, value) in &values {
            writer.write_record([name.clone(), value.to_string()])?;
        }
        writer.flush()?;
    } else {
        for (_, value) in &values {
            println!("{}", value);
        }
    }
    Ok(())
}
