use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::{command, value_parser, Arg, ArgAction, ArgMatches, Command};

#[derive(Debug)]
pub struct ArpdArgs {
    pub ref_file: String,
    pub result_file: String,
    pub metrics: Vec<String>,
    pub pretty: bool,
    pub precision: usize,
    pub flamegraph: Option<String>,
}

#[derive(Debug)]
pub struct RunInstancesArgs {
    pub instance_list: String,
    pub command: String,
    pub run: bool,
    pub jobs: usize,
    pub grace: f64,
}

#[derive(Debug)]
pub struct ExtractArgs {
    pub instance_list: String,
    pub prefix: String,
    pub suffix: String,
    pub metric: String,
    pub with_names: bool,
}

#[derive(Debug)]
pub struct PlotArgs {
    pub profiles: Vec<String>,
    pub x_metric: String,
    pub y_metric: String,
    pub output: String,
    pub width: u32,
    pub height: u32,
}

/// Help and version exit with 0, any other parse error prints the usage
/// and exits with 1.
fn matches_or_exit(command: Command, args: Vec<OsString>) -> ArgMatches {
    command
        .try_get_matches_from(args)
        .unwrap_or_else(|err| match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                let _ = err.print();
                std::process::exit(1)
            }
        })
}

fn string(matches: &ArgMatches, id: &str) -> String {
    matches.get_one::<String>(id).cloned().unwrap_or_default()
}

pub fn arpd_command() -> Command {
    command!("arpd")
        .about("Computes the average relative percentage deviation (ARPD) of every instance class.")
        .arg(
            Arg::new("ref_file")
                .value_name("REF_FILE")
                .help("Reference table with columns name, bk_primal, class_name")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("result_file")
                .value_name("RESULT_FILE")
                .help("Results table with column name and one column per metric")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::new("col_names")
                .value_name("COL_NAMES")
                .help("Comma separated metric columns, printed in this order")
                .required(true)
                .index(3),
        )
        .arg(
            Arg::new("pretty")
                .help("Print a text grid instead of CSV")
                .long("pretty")
                .short('p')
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("precision")
                .help("Decimals shown by --pretty")
                .long("precision")
                .value_parser(value_parser!(usize))
                .default_value("2"),
        )
        .arg(
            Arg::new("flamegraph")
                .help("Write a flamegraph of the run to this HTML file")
                .long("flamegraph")
                .short('f'),
        )
        .arg(
            // anything after COL_NAMES is accepted and ignored
            Arg::new("rest")
                .index(4)
                .num_args(0..)
                .hide(true),
        )
}

pub fn arpd_args(matches: &ArgMatches) -> ArpdArgs {
    ArpdArgs {
        ref_file: string(matches, "ref_file"),
        result_file: string(matches, "result_file"),
        metrics: string(matches, "col_names")
            .split(',')
            .map(|name| name.trim().to_string())
            .collect(),
        pretty: matches.get_flag("pretty"),
        precision: matches.get_one::<usize>("precision").copied().unwrap_or(2),
        flamegraph: matches.get_one::<String>("flamegraph").cloned(),
    }
}

pub fn arpd_cli() -> ArpdArgs {
    arpd_args(&matches_or_exit(arpd_command(), std::env::args_os().collect()))
}

pub fn run_instances_command() -> Command {
    command!("run_instances")
        .about("Prints (or runs) a command for every instance of an instance list.")
        .after_help(
            "COMMAND placeholders:\n  #P  instance path\n  #N  instance name\n  #T  time limit",
        )
        .arg(
            Arg::new("instance_list")
                .value_name("INSTANCE_DATA")
                .help("Instance list with columns path, time_limit")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("command")
                .value_name("[INSTANCE_DIR] COMMAND")
                .help("Command template, optionally preceded by an instance directory that is ignored")
                .required(true)
                .num_args(1..=2)
                .index(2),
        )
        .arg(
            Arg::new("run")
                .help("Execute the commands instead of printing them")
                .long("run")
                .short('r')
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("jobs")
                .help("Number of commands executed at the same time")
                .long("jobs")
                .short('j')
                .value_parser(value_parser!(usize))
                .default_value("1"),
        )
        .arg(
            Arg::new("grace")
                .help("Seconds allowed past the time limit before a run is killed")
                .long("grace")
                .value_parser(value_parser!(f64))
                .default_value("10"),
        )
}

pub fn run_instances_args(matches: &ArgMatches) -> RunInstancesArgs {
    RunInstancesArgs {
        instance_list: string(matches, "instance_list"),
        command: matches
            .get_many::<String>("command")
            .and_then(|values| values.last().cloned())
            .unwrap_or_default(),
        run: matches.get_flag("run"),
        jobs: matches.get_one::<usize>("jobs").copied().unwrap_or(1),
        grace: matches.get_one::<f64>("grace").copied().unwrap_or(10.0),
    }
}

pub fn run_instances_cli() -> RunInstancesArgs {
    run_instances_args(&matches_or_exit(
        run_instances_command(),
        std::env::args_os().collect(),
    ))
}

pub fn extract_command() -> Command {
    command!("extract_table")
        .about("Prints the final pareto value of the perf profile of every instance.")
        .arg(
            Arg::new("instance_list")
                .value_name("INSTANCE_LIST")
                .help("Instance list with a path column")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("prefix")
                .value_name("FILE_PREFIX")
                .help("Directory holding the perf profiles")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::new("suffix")
                .value_name("FILE_SUFFIX")
                .help("Appended to the instance name, e.g. .json")
                .required(true)
                .allow_hyphen_values(true)
                .index(3),
        )
        .arg(
            Arg::new("metric")
                .help("Metric read from the last pareto point")
                .long("metric")
                .short('m')
                .default_value("v"),
        )
        .arg(
            Arg::new("with_names")
                .help("Print a name,<metric> CSV table")
                .long("with-names")
                .short('n')
                .action(ArgAction::SetTrue),
        )
}

pub fn extract_args(matches: &ArgMatches) -> ExtractArgs {
    ExtractArgs {
        instance_list: string(matches, "instance_list"),
        prefix: string(matches, "prefix"),
        suffix: string(matches, "suffix"),
        metric: string(matches, "metric"),
        with_names: matches.get_flag("with_names"),
    }
}

pub fn extract_cli() -> ExtractArgs {
    extract_args(&matches_or_exit(extract_command(), std::env::args_os().collect()))
}

pub fn plot_command() -> Command {
    command!("plot")
        .about("Draws a metric against another for a list of perf profiles.")
        .after_help(
            "metric possible values: t, v, eval, expanded, generated, goals, guide, initial, solutions, trashed",
        )
        .arg(
            Arg::new("inputs")
                .value_name("PROFILES... X_METRIC Y_METRIC")
                .help("Perf profiles (paths or glob patterns) followed by the x and y metrics")
                .required(true)
                .num_args(3..)
                .index(1),
        )
        .arg(
            Arg::new("output")
                .help("PNG file to write")
                .long("output")
                .short('o')
                .default_value("profile.png"),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .value_parser(value_parser!(u32))
                .default_value("800"),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .value_parser(value_parser!(u32))
                .default_value("600"),
        )
}

pub fn plot_args(matches: &ArgMatches) -> PlotArgs {
    let mut inputs: Vec<String> = matches
        .get_many::<String>("inputs")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    // num_args(3..) guarantees both metrics are present
    let y_metric = inputs.pop().unwrap_or_default();
    let x_metric = inputs.pop().unwrap_or_default();
    PlotArgs {
        profiles: inputs,
        x_metric,
        y_metric,
        output: string(matches, "output"),
        width: matches.get_one::<u32>("width").copied().unwrap_or(800),
        height: matches.get_one::<u32>("height").copied().unwrap_or(600),
    }
}

pub fn plot_cli() -> PlotArgs {
    plot_args(&matches_or_exit(plot_command(), std::env::args_os().collect()))
}

#[test]
fn test_arpd_arguments() {
    let matches = arpd_command()
        .try_get_matches_from(["arpd", "ref.csv", "res.csv", "time, quality"])
        .unwrap();
    let args = arpd_args(&matches);
    assert_eq!(args.ref_file, "ref.csv");
    assert_eq!(args.result_file, "res.csv");
    assert_eq!(args.metrics, vec!["time", "quality"]);
    assert!(!args.pretty);
    assert_eq!(args.precision, 2);
    assert_eq!(args.flamegraph, None);
}

#[test]
fn test_arpd_requires_three_positionals() {
    let err = arpd_command()
        .try_get_matches_from(["arpd", "ref.csv", "res.csv"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn test_arpd_ignores_extra_positionals() {
    let matches = arpd_command()
        .try_get_matches_from(["arpd", "ref.csv", "res.csv", "cost", "extra", "more"])
        .unwrap();
    let args = arpd_args(&matches);
    assert_eq!(args.result_file, "res.csv");
    assert_eq!(args.metrics, vec!["cost"]);
}

#[test]
fn test_run_instances_skips_instance_directory() {
    let matches = run_instances_command()
        .try_get_matches_from(["run_instances", "insts/taillard.csv", "insts/", "solve #P -t #T"])
        .unwrap();
    let args = run_instances_args(&matches);
    assert_eq!(args.instance_list, "insts/taillard.csv");
    assert_eq!(args.command, "solve #P -t #T");

    assert!(run_instances_command()
        .try_get_matches_from(["run_instances", "insts.csv", "a", "b", "c"])
        .is_err());
}

#[test]
fn test_run_instances_defaults() {
    let matches = run_instances_command()
        .try_get_matches_from(["run_instances", "insts.csv", "solve #P -t #T"])
        .unwrap();
    let args = run_instances_args(&matches);
    assert_eq!(args.command, "solve #P -t #T");
    assert!(!args.run);
    assert_eq!(args.jobs, 1);
    assert_eq!(args.grace, 10.0);
}

#[test]
fn test_extract_arguments() {
    let matches = extract_command()
        .try_get_matches_from(["extract_table", "insts.csv", "results/beam", ".json", "-m", "t", "-n"])
        .unwrap();
    let args = extract_args(&matches);
    assert_eq!(args.prefix, "results/beam");
    assert_eq!(args.suffix, ".json");
    assert_eq!(args.metric, "t");
    assert!(args.with_names);
}

#[test]
fn test_plot_splits_metrics_from_profiles() {
    let matches = plot_command()
        .try_get_matches_from(["plot", "a.json", "b.json", "t", "v", "-o", "out.png"])
        .unwrap();
    let args = plot_args(&matches);
    assert_eq!(args.profiles, vec!["a.json", "b.json"]);
    assert_eq!(args.x_metric, "t");
    assert_eq!(args.y_metric, "v");
    assert_eq!(args.output, "out.png");
    assert_eq!((args.width, args.height), (800, 600));

    assert!(plot_command().try_get_matches_from(["plot", "a.json", "t"]).is_err());
}
