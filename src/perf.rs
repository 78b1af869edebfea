//! Perf profiles: JSON traces written by a solver run.
//!
//! ```json
//! { "inst": "tai20_5_0", "algo": "beam",
//!   "stats_pareto": [ { "t": 0.1, "v": 1297, "expanded": 20, ... }, ... ] }
//! ```
//!
//! Each point of `stats_pareto` maps metric names to numbers. The primal
//! value `v` is absent on points recorded before a first solution.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::instances::InstanceEntry;
use crate::parse::ParseError;

pub const PRIMAL_METRIC: &str = "v";

#[derive(Debug, Error)]
pub enum PerfError {
    #[error("cannot load perf profile {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("{0}: the pareto trace is empty")]
    EmptyTrace(String),
    #[error("{profile}: pareto point {index} has no numeric '{metric}'")]
    MissingMetric {
        profile: String,
        metric: String,
        index: usize,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ParetoPoint(BTreeMap<String, Value>);

impl ParetoPoint {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerfProfile {
    #[serde(default)]
    pub inst: Option<String>,
    #[serde(default)]
    pub algo: Option<String>,
    #[serde(alias = "primal_pareto_diagram")]
    pub stats_pareto: Vec<ParetoPoint>,
    /// Where the profile was read from, used in error messages.
    #[serde(skip)]
    origin: String,
}

impl PerfProfile {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PerfError> {
        let path = path.as_ref();
        let load = || -> Result<Self, ParseError> {
            let file = File::open(path)?;
            Self::from_reader(BufReader::new(file))
        };
        let mut profile = load().map_err(|source| PerfError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        profile.origin = path.display().to_string();
        Ok(profile)
    }

    pub fn from_reader<R: Read>(input: R) -> Result<Self, ParseError> {
        let mut profile: PerfProfile = serde_json::from_reader(input)?;
        profile.origin = profile.inst.clone().unwrap_or_else(|| "<profile>".to_string());
        Ok(profile)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Legend label of the profile.
    pub fn algo_name(&self) -> &str {
        self.algo.as_deref().unwrap_or("?")
    }

    /// Value of `metric` on the last pareto point.
    pub fn final_value(&self, metric: &str) -> Result<f64, PerfError> {
        let last = self
            .stats_pareto
            .last()
            .ok_or_else(|| PerfError::EmptyTrace(self.origin.clone()))?;
        last.metric(metric).ok_or_else(|| PerfError::MissingMetric {
            profile: self.origin.clone(),
            metric: metric.to_string(),
            index: self.stats_pareto.len() - 1,
        })
    }

    /// `(x, y)` for every pareto point, in trace order.
    pub fn series(&self, x_metric: &str, y_metric: &str) -> Result<Vec<(f64, f64)>, PerfError> {
        self.stats_pareto
            .iter()
            .enumerate()
            .map(|(index, point)| -> Result<(f64, f64), PerfError> {
                let get = |metric: &str| {
                    point.metric(metric).ok_or_else(|| PerfError::MissingMetric {
                        profile: self.origin.clone(),
                        metric: metric.to_string(),
                        index,
                    })
                };
                Ok((get(x_metric)?, get(y_metric)?))
            })
            .collect()
    }
}

/// `<prefix>/<instance name><suffix>`
pub fn profile_path(prefix: &str, entry: &InstanceEntry, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}/{}{}", prefix, entry.name(), suffix))
}

/// Final value of `metric` in the perf profile of every instance, in list order.
pub fn extract_final_values(
    instances: &[InstanceEntry],
    prefix: &str,
    suffix: &str,
    metric: &str,
) -> Result<Vec<(String, f64)>, PerfError> {
    instances
        .iter()
        .map(|entry| -> Result<(String, f64), PerfError> {
            let profile = PerfProfile::from_path(profile_path(prefix, entry, suffix))?;
            log::debug!("read {} pareto points from {}", profile.stats_pareto.len(), profile.origin());
            Ok((entry.name().to_string(), profile.final_value(metric)?))
        })
        .collect()
}

#[cfg(test)]
fn paths(names: &[&str]) -> Vec<InstanceEntry> {
    names
        .iter()
        .map(|name| InstanceEntry {
            path: format!("insts/Taillard/{}", name),
            time_limit: None,
        })
        .collect()
}

#[test]
fn test_final_value_uses_last_point() {
    let json = r#"{"inst": "i1", "algo": "beam", "stats_pareto": [
        {"t": 0.5, "v": 120, "expanded": 3},
        {"t": 1.5, "v": 110.5, "expanded": 9}
    ]}"#;
    let profile = PerfProfile::from_reader(json.as_bytes()).unwrap();
    assert_eq!(profile.final_value("v").unwrap(), 110.5);
    assert_eq!(profile.final_value("expanded").unwrap(), 9.0);
    assert_eq!(profile.algo_name(), "beam");
}

#[test]
fn test_solver_field_name_is_accepted() {
    let json = r#"{"primal_pareto_diagram": [{"t": 1, "generated": 4}]}"#;
    let profile = PerfProfile::from_reader(json.as_bytes()).unwrap();
    assert_eq!(profile.algo_name(), "?");
    assert_eq!(profile.series("t", "generated").unwrap(), vec![(1.0, 4.0)]);
}

#[test]
fn test_missing_metric_and_empty_trace() {
    let profile = PerfProfile::from_reader(r#"{"stats_pareto": [{"t": 1}]}"#.as_bytes()).unwrap();
    assert!(matches!(
        profile.final_value("v"),
        Err(PerfError::MissingMetric { index: 0, .. })
    ));
    let empty = PerfProfile::from_reader(r#"{"stats_pareto": []}"#.as_bytes()).unwrap();
    assert!(matches!(empty.final_value("v"), Err(PerfError::EmptyTrace(_))));
}

#[test]
fn test_extract_from_fixture_files() {
    let values = extract_final_values(
        &paths(&["tai20_5_0.txt", "tai20_5_1.txt"]),
        "./src/inputs/perf",
        ".json",
        PRIMAL_METRIC,
    )
    .unwrap();
    assert_eq!(
        values,
        vec![("tai20_5_0.txt".to_string(), 14033.0), ("tai20_5_1.txt".to_string(), 15151.0)]
    );
}

#[test]
fn test_extract_missing_file_fails() {
    let err = extract_final_values(&paths(&["nope.txt"]), "./src/inputs/perf", ".json", "v").unwrap_err();
    match err {
        PerfError::Load { path, .. } => assert_eq!(path, PathBuf::from("./src/inputs/perf/nope.txt.json")),
        other => panic!("expected a load error, got {:?}", other),
    }
}
