// src/chart.rs

use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::process::Row;
use crate::schema::FieldKey;

/// Display theme; affects colours only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    fn background(&self) -> RGBColor {
        match self {
            Theme::Light => WHITE,
            Theme::Dark => RGBColor(17, 17, 17),
        }
    }

    fn text(&self) -> RGBColor {
        match self {
            Theme::Light => BLACK,
            Theme::Dark => WHITE,
        }
    }

    fn grid(&self) -> RGBColor {
        match self {
            Theme::Light => RGBColor(230, 230, 230),
            Theme::Dark => RGBColor(60, 60, 60),
        }
    }
}

const PALETTE: [RGBColor; 6] = [
    RGBColor(99, 110, 250),
    RGBColor(239, 85, 59),
    RGBColor(0, 204, 150),
    RGBColor(171, 99, 250),
    RGBColor(255, 161, 90),
    RGBColor(25, 211, 243),
];

/// `killed` over time for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub region: String,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Split date-ordered rows into one series per region, in order of first
/// appearance. Rows without a date are skipped.
pub fn killed_series(rows: &[&Row]) -> Vec<Series> {
    let mut out: Vec<Series> = Vec::new();
    for row in rows {
        let Some(date) = row.date else { continue };
        let label = row.region.as_str();
        let point = (date, row.number(FieldKey::Killed));
        match out.iter_mut().find(|s| s.region == label) {
            Some(series) => series.points.push(point),
            None => out.push(Series {
                region: label.to_string(),
                points: vec![point],
            }),
        }
    }
    out
}

pub fn chart_title(start: NaiveDate, end: NaiveDate) -> String {
    format!("Daily Casualties ({} to {})", start, end)
}

/// Render the daily `killed` chart to `path`: PNG if the extension is
/// `png`, SVG otherwise.
pub fn render_chart(
    path: &Path,
    rows: &[&Row],
    start: NaiveDate,
    end: NaiveDate,
    theme: Theme,
    size: (u32, u32),
) -> Result<()> {
    let series = killed_series(rows);
    if series.iter().all(|s| s.points.is_empty()) {
        bail!("nothing to chart between {} and {}", start, end);
    }

    let is_png = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));
    if is_png {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        draw_chart(root, &series, start, end, theme)?;
    } else {
        let root = SVGBackend::new(path, size).into_drawing_area();
        draw_chart(root, &series, start, end, theme)?;
    }
    info!(path = %path.display(), series = series.len(), "wrote chart");
    Ok(())
}

fn draw_chart<DB>(
    root: DrawingArea<DB, Shift>,
    series: &[Series],
    start: NaiveDate,
    end: NaiveDate,
    theme: Theme,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&theme.background())?;

    // x is days since `start`; a one-day range still gets a visible axis
    let span = (end - start).num_days().max(1) as f64;
    let y_max = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.1))
        .fold(0.0_f64, f64::max)
        .max(1.0);
    let text = theme.text();

    let mut chart = ChartBuilder::on(&root)
        .caption(chart_title(start, end), ("sans-serif", 28).into_font().color(&text))
        .margin(25)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(0.0..span, 0.0..(y_max * 1.1))?;

    chart
        .configure_mesh()
        .x_label_formatter(&|v| (start + Duration::days(v.round() as i64)).to_string())
        .y_label_formatter(&|v| format!("{:.0}", v))
        .x_desc("date")
        .y_desc("killed")
        .axis_style(text)
        .label_style(("sans-serif", 16).into_font().color(&text))
        .light_line_style(theme.grid())
        .draw()?;

    for (i, s) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        chart
            .draw_series(LineSeries::new(
                s.points
                    .iter()
                    .map(|(d, v)| ((*d - start).num_days() as f64, *v)),
                &color,
            ))?
            .label(s.region.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(theme.background())
        .border_style(text)
        .label_font(("sans-serif", 16).into_font().color(&text))
        .draw()?;

    root.present()?;
    Ok(())
}
