use anyhow::{anyhow, bail, Context};
use bench_scripts::perf::PerfProfile;
use bench_scripts::plot::chart_from_profiles;
use bench_scripts::{cli, logger};
use glob::glob;

fn main() -> anyhow::Result<()> {
    logger::init();
    let arguments = cli::plot_cli();

    let mut profiles = Vec::new();
    for pattern in &arguments.profiles {
        let mut paths = glob(pattern)
            .with_context(|| format!("invalid pattern {}", pattern))?
            .collect::<Result<Vec<_>, _>>()?;
        if paths.is_empty() {
            bail!("no perf profile matches {}", pattern);
        }
        paths.sort();
        for path in paths {
            profiles.push(PerfProfile::from_path(&path)?);
        }
    }

    let chart = chart_from_profiles(&profiles, &arguments.x_metric, &arguments.y_metric)?;
    chart
        .draw(&arguments.output, (arguments.width, arguments.height))
        .map_err(|e| anyhow!("cannot draw {}: {}", arguments.output, e))?;
    log::info!("wrote {} series to {}", chart.series.len(), arguments.output);
    Ok(())
}
