use std::time::Duration;

use anyhow::{bail, Context};
use bench_scripts::instances::{read_instances, CommandTemplate};
use bench_scripts::runner::{run_all, Job};
use bench_scripts::{cli, logger};

/*
Prints the command to run for every instance of an instance list, e.g.

    run_instances insts/taillard_flowtime.csv \
        'tsp ./target/release/dogs-pfsp -p "results/#N.json" -i "#P" -t #T f_flowtime'

With --run the commands are executed here instead, each one killed once it
exceeds its time limit plus the grace period.
*/

fn main() -> anyhow::Result<()> {
    logger::init();
    let arguments = cli::run_instances_cli();

    let instances = read_instances(&arguments.instance_list)
        .with_context(|| format!("cannot read instance list {}", arguments.instance_list))?;
    let template = CommandTemplate::new(arguments.command.as_str());

    if !arguments.run {
        for entry in &instances {
            println!("{}", template.render(entry));
        }
        return Ok(());
    }

    let grace = Duration::try_from_secs_f64(arguments.grace)
        .with_context(|| format!("invalid grace period {}", arguments.grace))?;
    let jobs = instances
        .iter()
        .map(|entry| Job {
            name: entry.name().to_string(),
            command: template.render(entry),
            limit: entry.time_limit().map(|limit| limit + grace),
        })
        .collect();

    let reports = run_all(jobs, arguments.jobs);
    let failures = reports.iter().filter(|r| !r.status.is_ok()).count();
    for report in &reports {
        println!("{}", report.to_line());
    }
    if failures > 0 {
        bail!("{} of {} runs did not succeed", failures, reports.len());
    }
    Ok(())
}
