use std::error::Error;
use std::ops::Range;
use std::path::Path;

use plotters::prelude::*;

use crate::perf::{PerfError, PerfProfile};

/// One curve of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

/// Post-step vertices: each y holds until the next x.
pub fn step_series(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut steps = Vec::with_capacity(points.len() * 2);
    for (i, &(x, y)) in points.iter().enumerate() {
        if i > 0 {
            let (_, previous) = points[i - 1];
            steps.push((x, previous));
        }
        steps.push((x, y));
    }
    steps
}

/// One series per profile. The title is the instance of the last profile
/// that names one.
pub fn chart_from_profiles(
    profiles: &[PerfProfile],
    x_metric: &str,
    y_metric: &str,
) -> Result<Chart, PerfError> {
    let mut title = String::new();
    let mut series = Vec::with_capacity(profiles.len());
    for profile in profiles {
        if let Some(inst) = &profile.inst {
            title = inst.clone();
        }
        if profile.stats_pareto.is_empty() {
            return Err(PerfError::EmptyTrace(profile.origin().to_string()));
        }
        series.push(Series {
            label: profile.algo_name().to_string(),
            points: profile.series(x_metric, y_metric)?,
        });
    }
    Ok(Chart {
        title,
        x_label: x_metric.to_string(),
        y_label: y_metric.to_string(),
        series,
    })
}

fn bounds<I: Iterator<Item = f64>>(values: I) -> Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        0.0..1.0
    } else if lo == hi {
        lo - 1.0..hi + 1.0
    } else {
        lo..hi
    }
}

impl Chart {
    pub fn x_range(&self) -> Range<f64> {
        bounds(self.series.iter().flat_map(|s| s.points.iter().map(|p| p.0)))
    }

    pub fn y_range(&self) -> Range<f64> {
        bounds(self.series.iter().flat_map(|s| s.points.iter().map(|p| p.1)))
    }

    /// Renders the chart into a PNG file.
    pub fn draw<P: AsRef<Path>>(&self, output_file: P, size: (u32, u32)) -> Result<(), Box<dyn Error>> {
        let root = BitMapBackend::new(output_file.as_ref(), size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&self.title, ("sans-serif", 30).into_font())
            .margin(20)
            .x_label_area_size(35)
            .y_label_area_size(60)
            .build_cartesian_2d(self.x_range(), self.y_range())?;

        chart
            .configure_mesh()
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .draw()?;

        for (color_index, series) in self.series.iter().enumerate() {
            let color = Palette99::pick(color_index);
            chart
                .draw_series(LineSeries::new(step_series(&series.points), &color))?
                .label(series.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;

        root.present()?;
        Ok(())
    }
}

#[test]
fn test_step_series_holds_previous_value() {
    let steps = step_series(&[(0.0, 10.0), (1.0, 8.0), (3.0, 5.0)]);
    assert_eq!(
        steps,
        vec![(0.0, 10.0), (1.0, 10.0), (1.0, 8.0), (3.0, 8.0), (3.0, 5.0)]
    );
    assert_eq!(steps.len(), 2 * 3 - 1);
    assert!(step_series(&[]).is_empty());
}

#[test]
fn test_chart_from_profiles() {
    let first = PerfProfile::from_reader(
        r#"{"inst": "a", "algo": "beam", "stats_pareto": [{"t": 1, "v": 9}, {"t": 2, "v": 7}]}"#.as_bytes(),
    )
    .unwrap();
    let second = PerfProfile::from_reader(
        r#"{"inst": "b", "stats_pareto": [{"t": 0.5, "v": 8}]}"#.as_bytes(),
    )
    .unwrap();
    let chart = chart_from_profiles(&[first, second], "t", "v").unwrap();
    assert_eq!(chart.title, "b");
    let labels: Vec<&str> = chart.series.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["beam", "?"]);
    assert_eq!(chart.x_range(), 0.5..2.0);
    assert_eq!(chart.y_range(), 7.0..9.0);
}

#[test]
fn test_point_without_metric_is_rejected() {
    let profile = PerfProfile::from_reader(r#"{"stats_pareto": [{"t": 1}, {"t": 2, "v": 3}]}"#.as_bytes()).unwrap();
    assert!(matches!(
        chart_from_profiles(&[profile], "t", "v"),
        Err(PerfError::MissingMetric { index: 0, .. })
    ));
}

#[test]
fn test_flat_series_gets_a_visible_range() {
    let chart = Chart {
        title: String::new(),
        x_label: "t".to_string(),
        y_label: "v".to_string(),
        series: vec![Series { label: "?".to_string(), points: vec![(1.0, 4.0)] }],
    };
    assert_eq!(chart.x_range(), 0.0..2.0);
    assert_eq!(chart.y_range(), 3.0..5.0);
}
