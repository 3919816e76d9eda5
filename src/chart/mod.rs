/// Chart layer: field selections in, renderer-ready series out.
///
/// ```text
///   Dataset ──┐
///             ├──► aggregate::generate ──► ChartData ──► external renderer
///   ChartSpec ┘
///
///   Dataset ──► suggest::suggest ──► ChartSpec (default configuration)
/// ```
pub mod aggregate;
pub mod suggest;

use serde::{Deserialize, Serialize};

use crate::color::ChartColor;

pub use aggregate::generate;
pub use suggest::suggest;

// ---------------------------------------------------------------------------
// ChartSpec – what the user asked for
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Scatter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub x_field: String,
    pub y_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, x_field: impl Into<String>, y_field: impl Into<String>) -> Self {
        Self {
            kind,
            x_field: x_field.into(),
            y_field: y_field.into(),
            series_field: None,
            title: None,
        }
    }

    pub fn with_series(mut self, field: impl Into<String>) -> Self {
        self.series_field = Some(field.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

// ---------------------------------------------------------------------------
// ChartData – what the renderer draws
// ---------------------------------------------------------------------------

/// A point on a numeric plane (scatter).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A point on a category axis (line/bar split by series).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyedPoint {
    pub x: String,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Points {
    /// One value per label.
    Values(Vec<f64>),
    Keyed(Vec<KeyedPoint>),
    Pairs(Vec<Point>),
}

impl Points {
    pub fn len(&self) -> usize {
        match self {
            Points::Values(v) => v.len(),
            Points::Keyed(v) => v.len(),
            Points::Pairs(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One color for the whole series, or one per point (pie slices).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Fill {
    Single(ChartColor),
    PerPoint(Vec<ChartColor>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub label: String,
    #[serde(rename = "data")]
    pub points: Points,
    pub background_color: Fill,
    pub border_color: Fill,
    pub border_width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartSeries>,
}

// ---------------------------------------------------------------------------
// Renderer options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub responsive: bool,
    pub maintain_aspect_ratio: bool,
    pub legend_position: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub tooltip_mode: &'static str,
    pub tooltip_intersect: bool,
    /// Axis titles; pie charts have no axes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axes: Option<AxisTitles>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisTitles {
    pub x: String,
    pub y: String,
}

impl ChartOptions {
    pub fn for_spec(spec: &ChartSpec) -> Self {
        let axes = match spec.kind {
            ChartKind::Pie => None,
            _ => Some(AxisTitles {
                x: spec.x_field.clone(),
                y: spec.y_field.clone(),
            }),
        };
        Self {
            responsive: true,
            maintain_aspect_ratio: false,
            legend_position: "top",
            title: spec.title.clone(),
            tooltip_mode: "index",
            tooltip_intersect: false,
            axes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_json_shape() {
        let spec = ChartSpec::new(ChartKind::Bar, "region", "sales").with_title("sales by region");
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["type"], "bar");
        assert_eq!(json["xField"], "region");
        assert!(json.get("seriesField").is_none());

        let back: ChartSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn unknown_chart_kind_is_rejected() {
        let json = r#"{"type":"area","xField":"a","yField":"b"}"#;
        assert!(serde_json::from_str::<ChartSpec>(json).is_err());
    }

    #[test]
    fn pie_options_have_no_axes() {
        let pie = ChartOptions::for_spec(&ChartSpec::new(ChartKind::Pie, "a", "b"));
        assert!(pie.axes.is_none());
        let line = ChartOptions::for_spec(&ChartSpec::new(ChartKind::Line, "day", "total"));
        assert_eq!(
            line.axes,
            Some(AxisTitles {
                x: "day".into(),
                y: "total".into()
            })
        );
        assert_eq!(line.legend_position, "top");
    }
}
