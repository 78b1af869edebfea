use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::parse::{ParseError, Table};

pub const PATH_COLUMN: &str = "path";
pub const TIME_LIMIT_COLUMN: &str = "time_limit";

/// One row of an instance list.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceEntry {
    pub path: String,
    /// Kept as written, it is only substituted into commands.
    pub time_limit: Option<String>,
}

impl InstanceEntry {
    pub fn name(&self) -> &str {
        instance_name(&self.path)
    }

    /// The time limit in seconds, if it is a non-negative number.
    pub fn time_limit(&self) -> Option<Duration> {
        let secs: f64 = self.time_limit.as_deref()?.parse().ok()?;
        Duration::try_from_secs_f64(secs).ok()
    }
}

/// Last `/`-separated component of an instance path.
pub fn instance_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Reads an instance list that must have both `path` and `time_limit` columns.
pub fn read_instances<P: AsRef<Path>>(path: P) -> Result<Vec<InstanceEntry>, ParseError> {
    instances_from_table(&Table::from_path(path)?, true)
}

/// Reads an instance list where only the `path` column is needed.
pub fn read_instance_paths<P: AsRef<Path>>(path: P) -> Result<Vec<InstanceEntry>, ParseError> {
    instances_from_table(&Table::from_path(path)?, false)
}

pub fn instances_from_reader<R: Read>(
    input: R,
    require_time_limit: bool,
) -> Result<Vec<InstanceEntry>, ParseError> {
    instances_from_table(&Table::from_reader(input)?, require_time_limit)
}

fn instances_from_table(
    table: &Table,
    require_time_limit: bool,
) -> Result<Vec<InstanceEntry>, ParseError> {
    let paths = table.column(PATH_COLUMN)?;
    let limits: Vec<Option<String>> = match table.column(TIME_LIMIT_COLUMN) {
        Ok(column) => table.text(column).map(|t| Some(t.to_string())).collect(),
        Err(err) if require_time_limit => return Err(err),
        Err(_) => vec![None; table.len()],
    };
    Ok(table
        .text(paths)
        .zip(limits)
        .map(|(path, time_limit)| InstanceEntry {
            path: path.to_string(),
            time_limit,
        })
        .collect())
}

/// A shell command with `#P` (instance path), `#N` (instance name) and
/// `#T` (time limit) placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandTemplate {
    template: String,
}

impl CommandTemplate {
    pub fn new<S: Into<String>>(template: S) -> Self {
        CommandTemplate {
            template: template.into(),
        }
    }

    /// Replaces the placeholders in one left-to-right pass, so text coming
    /// from the instance is never substituted again.
    pub fn render(&self, entry: &InstanceEntry) -> String {
        let mut out = String::with_capacity(self.template.len() + entry.path.len());
        let mut chars = self.template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '#' {
                out.push(c);
                continue;
            }
            let replacement = match chars.peek() {
                Some('P') => entry.path.as_str(),
                Some('N') => entry.name(),
                Some('T') => entry.time_limit.as_deref().unwrap_or(""),
                _ => {
                    out.push(c);
                    continue;
                }
            };
            out.push_str(replacement);
            chars.next();
        }
        out
    }
}

/// One command per instance, in list order.
pub fn render_commands(template: &CommandTemplate, instances: &[InstanceEntry]) -> Vec<String> {
    instances.iter().map(|entry| template.render(entry)).collect()
}

#[cfg(test)]
fn entry(path: &str, time_limit: &str) -> InstanceEntry {
    InstanceEntry {
        path: path.to_string(),
        time_limit: Some(time_limit.to_string()),
    }
}

#[test]
fn test_instance_name_is_last_component() {
    assert_eq!(instance_name("insts/Taillard/tai20_5_0.txt"), "tai20_5_0.txt");
    assert_eq!(instance_name("tai20_5_0.txt"), "tai20_5_0.txt");
    assert_eq!(instance_name("insts/"), "");
}

#[test]
fn test_render_flowtime_command() {
    let template = CommandTemplate::new(
        "tsp ./target/release/dogs-pfsp -p \"results/#N.json\" -i \"#P\" -t #T f_flowtime -g alpha",
    );
    let rendered = template.render(&entry("insts/Taillard/tai200_10_5.txt", "600"));
    assert_eq!(
        rendered,
        "tsp ./target/release/dogs-pfsp -p \"results/tai200_10_5.txt.json\" -i \"insts/Taillard/tai200_10_5.txt\" -t 600 f_flowtime -g alpha"
    );
}

#[test]
fn test_render_is_single_pass() {
    let template = CommandTemplate::new("#P|#N|#T|#X|#");
    assert_eq!(template.render(&entry("dir/#T#N", "30")), "dir/#T#N|#T#N|30|#X|#");
}

#[test]
fn test_read_instance_list() {
    let list = "path,time_limit,comment\ninsts/a.txt,10,x\ninsts/b.txt,2.5,y\n";
    let instances = instances_from_reader(list.as_bytes(), true).unwrap();
    assert_eq!(instances, vec![entry("insts/a.txt", "10"), entry("insts/b.txt", "2.5")]);
    assert_eq!(instances[1].time_limit(), Some(Duration::from_millis(2500)));

    let commands = render_commands(&CommandTemplate::new("solve #N #T"), &instances);
    assert_eq!(commands, vec!["solve a.txt 10", "solve b.txt 2.5"]);
}

#[test]
fn test_time_limit_column_is_optional_for_paths() {
    let instances = instances_from_reader("path\nx/a\n".as_bytes(), false).unwrap();
    assert_eq!(instances[0].time_limit, None);
    assert_eq!(instances[0].time_limit(), None);
    assert!(matches!(
        instances_from_reader("path\nx/a\n".as_bytes(), true),
        Err(ParseError::MissingColumn(c)) if c == "time_limit"
    ));
}

#[test]
fn test_unparsable_time_limit() {
    assert_eq!(entry("a", "none").time_limit(), None);
    assert_eq!(entry("a", "-3").time_limit(), None);
}
