//! Average Relative Percentage Deviation (ARPD) per instance class.
//!
//! A reference table gives the best known primal value (`bk_primal`) and the
//! class of every instance. A results table gives measured values for one or
//! more metrics. For every metric, each instance gets its relative percentage
//! deviation from the reference, and deviations are averaged per class.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use prettytable::{Cell, Row, Table as PrettyTable};
use thiserror::Error;

use crate::parse::{ParseError, Table};

pub const NAME_COLUMN: &str = "name";
pub const REFERENCE_COLUMN: &str = "bk_primal";
pub const CLASS_COLUMN: &str = "class_name";

#[derive(Debug, Error)]
pub enum ArpdError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("instance '{0}' is not in the reference table")]
    UnknownInstance(String),
    #[error("instance '{0}' has a zero reference value")]
    ZeroReference(String),
    #[error("metric '{metric}': instance '{instance}' of class '{class}' has no result")]
    MissingResult {
        metric: String,
        class: String,
        instance: String,
    },
}

/// One row of the reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub name: String,
    pub bk_primal: f64,
    pub class_name: String,
}

/// Best known values and class membership, keyed by instance name.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    values: HashMap<String, f64>,
    classes: Vec<(String, Vec<String>)>,
}

impl ReferenceTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        Self::from_table(&Table::from_path(path)?)
    }

    pub fn from_reader<R: Read>(input: R) -> Result<Self, ParseError> {
        Self::from_table(&Table::from_reader(input)?)
    }

    pub fn from_table(table: &Table) -> Result<Self, ParseError> {
        let names = table.column(NAME_COLUMN)?;
        let values = table.numbers(table.column(REFERENCE_COLUMN)?)?;
        let classes = table.column(CLASS_COLUMN)?;

        let instances = table
            .text(names)
            .zip(values)
            .zip(table.text(classes))
            .map(|((name, bk_primal), class_name)| Instance {
                name: name.to_string(),
                bk_primal,
                class_name: class_name.to_string(),
            });
        Ok(Self::from_instances(instances))
    }

    /// Builds the table from rows in file order.
    ///
    /// A repeated name takes the value of its last row. An instance is listed
    /// in every class it appears under, once per class, at its first
    /// appearance there. Classes keep the order of their first appearance.
    pub fn from_instances<I: IntoIterator<Item = Instance>>(instances: I) -> Self {
        let mut values = HashMap::new();
        let mut classes: Vec<(String, Vec<String>)> = Vec::new();
        for row in instances {
            if values.insert(row.name.clone(), row.bk_primal).is_some() {
                log::warn!("instance '{}' appears twice in the reference table, keeping the last value", row.name);
            }
            let index = match classes.iter().position(|(class, _)| *class == row.class_name) {
                Some(index) => index,
                None => {
                    classes.push((row.class_name, Vec::new()));
                    classes.len() - 1
                }
            };
            let members = &mut classes[index].1;
            if !members.contains(&row.name) {
                members.push(row.name);
            }
        }
        log::debug!("{} instances in {} classes", values.len(), classes.len());

        ReferenceTable { values, classes }
    }

    pub fn reference(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Classes with their instances, in first-seen order.
    pub fn classes(&self) -> &[(String, Vec<String>)] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Measured values of the requested metrics, one row per instance.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    names: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
}

impl ResultTable {
    pub fn from_path<P: AsRef<Path>>(path: P, metrics: &[String]) -> Result<Self, ParseError> {
        Self::from_table(&Table::from_path(path)?, metrics)
    }

    pub fn from_reader<R: Read>(input: R, metrics: &[String]) -> Result<Self, ParseError> {
        Self::from_table(&Table::from_reader(input)?, metrics)
    }

    /// Reads the name column and every metric column; other columns are ignored.
    pub fn from_table(table: &Table, metrics: &[String]) -> Result<Self, ParseError> {
        let names = table
            .text(table.column(NAME_COLUMN)?)
            .map(str::to_string)
            .collect();
        let mut columns = HashMap::new();
        for metric in metrics {
            let values = table.numbers(table.column(metric)?)?;
            columns.insert(metric.clone(), values);
        }
        Ok(ResultTable { names, columns })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `(name, value)` pairs of one metric, in row order.
    pub fn values<'a>(
        &'a self,
        metric: &str,
    ) -> Result<impl Iterator<Item = (&'a str, f64)> + 'a, ParseError> {
        let column = self
            .columns
            .get(metric)
            .ok_or_else(|| ParseError::MissingColumn(metric.to_string()))?;
        Ok(self
            .names
            .iter()
            .map(String::as_str)
            .zip(column.iter().copied()))
    }
}

/// Signed deviation of `value` from `reference`, in percent.
pub fn relative_deviation(value: f64, reference: f64) -> f64 {
    (value - reference) / reference * 100.0
}

/// Deviation of every result row for one metric, keyed by instance name.
///
/// A later row with the same name overwrites an earlier one.
pub fn deviations(
    reference: &ReferenceTable,
    results: &ResultTable,
    metric: &str,
) -> Result<HashMap<String, f64>, ArpdError> {
    let mut rpds = HashMap::new();
    for (name, value) in results.values(metric)? {
        let bk = reference
            .reference(name)
            .ok_or_else(|| ArpdError::UnknownInstance(name.to_string()))?;
        if bk == 0.0 {
            return Err(ArpdError::ZeroReference(name.to_string()));
        }
        rpds.insert(name.to_string(), relative_deviation(value, bk));
    }
    Ok(rpds)
}

/// One output row: a class and its ARPD for each metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRow {
    pub class: String,
    pub values: Vec<f64>,
}

/// The per-class summary, columns in the requested metric order.
#[derive(Debug, Clone, PartialEq)]
pub struct ArpdTable {
    pub metrics: Vec<String>,
    pub rows: Vec<ClassRow>,
}

/// Computes the ARPD of every class of `reference` for each metric in `metrics`.
///
/// Every result must name a known instance with a nonzero reference, and every
/// instance of the reference table must have a result.
pub fn compute_arpd(
    reference: &ReferenceTable,
    results: &ResultTable,
    metrics: &[String],
) -> Result<ArpdTable, ArpdError> {
    let rpds = flame::span_of("rpd", || {
        metrics
            .iter()
            .map(|metric| deviations(reference, results, metric))
            .collect::<Result<Vec<_>, _>>()
    })?;

    flame::span_of("arpd", || -> Result<ArpdTable, ArpdError> {
        let mut rows = Vec::with_capacity(reference.classes().len());
        for (class, instances) in reference.classes() {
            let mut values = Vec::with_capacity(metrics.len());
            for (metric, rpd) in metrics.iter().zip(&rpds) {
                let mut sum = 0.0;
                for instance in instances {
                    sum += rpd.get(instance).ok_or_else(|| ArpdError::MissingResult {
                        metric: metric.clone(),
                        class: class.clone(),
                        instance: instance.clone(),
                    })?;
                }
                values.push(sum / instances.len() as f64);
            }
            rows.push(ClassRow {
                class: class.clone(),
                values,
            });
        }
        log::debug!("computed {} classes for metrics {:?}", rows.len(), metrics);
        Ok(ArpdTable {
            metrics: metrics.to_vec(),
            rows,
        })
    })
}

impl ArpdTable {
    pub fn header(&self) -> Vec<&str> {
        std::iter::once("class")
            .chain(self.metrics.iter().map(String::as_str))
            .collect()
    }

    /// Writes `class,<metric>...` followed by one line per class.
    pub fn write_csv<W: Write>(&self, output: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(output);
        writer.write_record(self.header())?;
        for row in &self.rows {
            let mut record = vec![row.class.clone()];
            record.extend(row.values.iter().map(|v| format!("{:?}", v)));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// The same table as a text grid with fixed precision.
    pub fn to_pretty(&self, precision: usize) -> PrettyTable {
        let mut table = PrettyTable::new();
        table.set_titles(Row::new(self.header().into_iter().map(Cell::new).collect()));
        for row in &self.rows {
            let mut cells = vec![Cell::new(&row.class)];
            cells.extend(
                row.values
                    .iter()
                    .map(|v| Cell::new(&format!("{:.*}", precision, v))),
            );
            table.add_row(Row::new(cells));
        }
        table
    }
}

#[cfg(test)]
fn metrics(names: &str) -> Vec<String> {
    names.split(',').map(str::to_string).collect()
}

#[cfg(test)]
fn example_reference() -> ReferenceTable {
    ReferenceTable::from_reader("name,bk_primal,class_name\nA,100,X\nB,200,X\nC,50,Y\n".as_bytes())
        .unwrap()
}

#[test]
fn test_example_deviations_and_class_averages() {
    let reference = example_reference();
    let results = ResultTable::from_reader("name,cost\nA,110\nB,180\nC,50\n".as_bytes(), &metrics("cost")).unwrap();

    let rpd = deviations(&reference, &results, "cost").unwrap();
    assert!((rpd["A"] - 10.0).abs() < 1e-9);
    assert!((rpd["B"] + 10.0).abs() < 1e-9);
    assert_eq!(rpd["C"], 0.0);

    let table = compute_arpd(&reference, &results, &metrics("cost")).unwrap();
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0].class, "X");
    assert!(table.rows[0].values[0].abs() < 1e-9);
    assert_eq!(table.rows[1].class, "Y");
    assert_eq!(table.rows[1].values[0], 0.0);
}

#[test]
fn test_identical_results_give_zero_everywhere() {
    let reference = example_reference();
    let results = ResultTable::from_reader("name,cost,time\nA,100,100\nB,200,200\nC,50,50\n".as_bytes(), &metrics("cost,time")).unwrap();
    let table = compute_arpd(&reference, &results, &metrics("cost,time")).unwrap();
    for row in &table.rows {
        assert!(row.values.iter().all(|&v| v == 0.0));
    }
}

#[test]
fn test_deviation_sign_follows_the_result() {
    assert!(relative_deviation(101.0, 100.0) > 0.0);
    assert!(relative_deviation(99.0, 100.0) < 0.0);
    assert!(relative_deviation(0.5, 0.25) > 0.0);
}

#[test]
fn test_class_average_is_the_mean_of_deviations() {
    let reference = ReferenceTable::from_reader(
        "name,bk_primal,class_name\na,10,K\nb,20,K\nc,40,K\n".as_bytes(),
    )
    .unwrap();
    let results = ResultTable::from_reader("name,v\na,11\nb,23\nc,38\n".as_bytes(), &metrics("v")).unwrap();
    let table = compute_arpd(&reference, &results, &metrics("v")).unwrap();
    let expected = (10.0 + 15.0 - 5.0) / 3.0;
    assert!((table.rows[0].values[0] - expected).abs() <= 1e-9 * expected.abs());
}

#[test]
fn test_metric_order_follows_the_request() {
    let reference = example_reference();
    let results = ResultTable::from_reader(
        "quality,name,time\n100,A,110\n200,B,220\n50,C,55\n".as_bytes(),
        &metrics("time,quality"),
    )
    .unwrap();
    let table = compute_arpd(&reference, &results, &metrics("time,quality")).unwrap();
    assert_eq!(table.header(), vec!["class", "time", "quality"]);
    assert!((table.rows[0].values[0] - 10.0).abs() < 1e-9);
    assert_eq!(table.rows[0].values[1], 0.0);
}

#[test]
fn test_classes_keep_first_seen_order() {
    let input = "name,bk_primal,class_name\nz1,1,Z\na1,1,A\nz2,1,Z\nm1,1,M\n";
    for _ in 0..3 {
        let reference = ReferenceTable::from_reader(input.as_bytes()).unwrap();
        let classes: Vec<&str> = reference.classes().iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(classes, vec!["Z", "A", "M"]);
        assert_eq!(reference.classes()[0].1, vec!["z1", "z2"]);
    }
}

#[test]
fn test_repeated_reference_name_keeps_last_value_and_every_class() {
    let reference = ReferenceTable::from_reader(
        "name,bk_primal,class_name\nA,100,X\nB,10,Y\nA,50,Y\nA,50,Y\n".as_bytes(),
    )
    .unwrap();
    assert_eq!(reference.len(), 2);
    assert_eq!(reference.reference("A"), Some(50.0));
    assert_eq!(
        reference.classes(),
        &[
            ("X".to_string(), vec!["A".to_string()]),
            ("Y".to_string(), vec!["B".to_string(), "A".to_string()]),
        ]
    );

    let results = ResultTable::from_reader("name,cost\nA,50\nB,10\n".as_bytes(), &metrics("cost")).unwrap();
    let table = compute_arpd(&reference, &results, &metrics("cost")).unwrap();
    let classes: Vec<&str> = table.rows.iter().map(|row| row.class.as_str()).collect();
    assert_eq!(classes, vec!["X", "Y"]);
    assert_eq!(table.rows[0].values, vec![0.0]);
    assert_eq!(table.rows[1].values, vec![0.0]);
}

#[test]
fn test_repeated_result_name_overwrites_deviation() {
    let reference = example_reference();
    let results = ResultTable::from_reader("name,cost\nA,110\nA,90\n".as_bytes(), &metrics("cost")).unwrap();
    let rpd = deviations(&reference, &results, "cost").unwrap();
    assert_eq!(rpd.len(), 1);
    assert!((rpd["A"] + 10.0).abs() < 1e-9);
}

#[test]
fn test_unknown_result_instance_fails() {
    let reference = example_reference();
    let results = ResultTable::from_reader("name,cost\nA,110\nD,1\n".as_bytes(), &metrics("cost")).unwrap();
    match compute_arpd(&reference, &results, &metrics("cost")) {
        Err(ArpdError::UnknownInstance(name)) => assert_eq!(name, "D"),
        other => panic!("expected an unknown instance, got {:?}", other),
    }
}

#[test]
fn test_zero_reference_fails() {
    let reference = ReferenceTable::from_reader("name,bk_primal,class_name\nA,0,X\n".as_bytes()).unwrap();
    let results = ResultTable::from_reader("name,cost\nA,3\n".as_bytes(), &metrics("cost")).unwrap();
    assert!(matches!(
        compute_arpd(&reference, &results, &metrics("cost")),
        Err(ArpdError::ZeroReference(name)) if name == "A"
    ));
}

#[test]
fn test_class_member_without_result_fails() {
    let reference = example_reference();
    let results = ResultTable::from_reader("name,cost\nA,110\nC,50\n".as_bytes(), &metrics("cost")).unwrap();
    match compute_arpd(&reference, &results, &metrics("cost")) {
        Err(ArpdError::MissingResult { metric, class, instance }) => {
            assert_eq!(metric, "cost");
            assert_eq!(class, "X");
            assert_eq!(instance, "B");
        }
        other => panic!("expected a missing result, got {:?}", other),
    }
}

#[test]
fn test_missing_metric_column_fails() {
    let result = ResultTable::from_reader("name,cost\nA,110\n".as_bytes(), &metrics("time"));
    assert!(matches!(result, Err(ParseError::MissingColumn(c)) if c == "time"));
    let reference = ReferenceTable::from_reader("name,class_name\nA,X\n".as_bytes());
    assert!(matches!(reference, Err(ParseError::MissingColumn(c)) if c == "bk_primal"));
}

#[test]
fn test_csv_output() {
    let reference = example_reference();
    let results = ResultTable::from_reader("name,cost,time\nA,110,100\nB,180,200\nC,50,25\n".as_bytes(), &metrics("cost,time")).unwrap();
    let table = compute_arpd(&reference, &results, &metrics("cost,time")).unwrap();

    let mut out = Vec::new();
    table.write_csv(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["class,cost,time", "X,0.0,0.0", "Y,0.0,-50.0"]);
}

#[test]
fn test_pretty_table_uses_precision() {
    let table = ArpdTable {
        metrics: metrics("cost"),
        rows: vec![ClassRow { class: "X".to_string(), values: vec![1.23456] }],
    };
    let rendered = table.to_pretty(2).to_string();
    assert!(rendered.contains("1.23"));
    assert!(!rendered.contains("1.234"));
    assert!(rendered.contains("class"));
}
