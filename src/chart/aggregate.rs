use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use super::{ChartData, ChartKind, ChartSeries, ChartSpec, Fill, KeyedPoint, Point, Points};
use crate::color::palette_color;
use crate::data::model::{CellValue, ColumnType, Dataset, Row};

const BORDER_WIDTH: u32 = 2;

/// Label for a missing x value.
const UNKNOWN_LABEL: &str = "Unknown";
/// Series name for rows without a series value.
const OTHER_SERIES: &str = "Other";

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Derive renderer input for `spec`.
///
/// Returns `None` when either field is not a header, or when the y field is
/// not numeric for anything but a pie chart. Rows whose values do not
/// coerce are skipped.
pub fn generate(dataset: &Dataset, spec: &ChartSpec) -> Option<ChartData> {
    if !dataset.has_column(&spec.x_field) || !dataset.has_column(&spec.y_field) {
        log::debug!(
            "Chart fields '{}'/'{}' not in dataset",
            spec.x_field,
            spec.y_field
        );
        return None;
    }

    let x_type = dataset.column_type(&spec.x_field)?;
    let y_type = dataset.column_type(&spec.y_field)?;
    if y_type != ColumnType::Number && spec.kind != ChartKind::Pie {
        log::debug!(
            "{:?} chart needs a numeric y field, '{}' is {y_type}",
            spec.kind,
            spec.y_field
        );
        return None;
    }

    // Splitting by series only applies to string columns.
    let series = spec
        .series_field
        .as_deref()
        .filter(|field| dataset.column_type(field) == Some(ColumnType::String));

    let rows = dataset.rows();
    let data = match (spec.kind, series) {
        (ChartKind::Line | ChartKind::Bar, None) => grouped_sums(rows, spec, x_type),
        (ChartKind::Line | ChartKind::Bar, Some(series)) => {
            keyed_series(rows, spec, x_type, series)
        }
        (ChartKind::Pie, _) => pie_slices(rows, spec, y_type),
        (ChartKind::Scatter, None) => scatter(rows, spec),
        (ChartKind::Scatter, Some(series)) => scatter_series(rows, spec, series),
    };
    Some(data)
}

// ---------------------------------------------------------------------------
// Line / bar
// ---------------------------------------------------------------------------

/// Sum y per distinct x, sorted by the x value as `x_type` reads it. Each
/// group is labelled with the first text seen for it.
fn grouped_sums(rows: &[Row], spec: &ChartSpec, x_type: ColumnType) -> ChartData {
    let mut groups: BTreeMap<Cow<'_, CellValue>, (String, f64)> = BTreeMap::new();
    for row in rows {
        if let Some(y) = row.number(&spec.y_field) {
            groups
                .entry(row.value_as(&spec.x_field, x_type))
                .or_insert_with(|| (x_label(row, &spec.x_field), 0.0))
                .1 += y;
        }
    }

    let (labels, values): (Vec<String>, Vec<f64>) = groups.into_values().unzip();

    ChartData {
        labels,
        datasets: vec![solid_series(spec.y_field.clone(), Points::Values(values), 0)],
    }
}

/// One series per distinct series value, points kept per row.
fn keyed_series(
    rows: &[Row],
    spec: &ChartSpec,
    x_type: ColumnType,
    series_field: &str,
) -> ChartData {
    let mut split = SeriesSplit::default();
    let mut labels: BTreeMap<Cow<'_, CellValue>, String> = BTreeMap::new();
    for row in rows {
        let x = labels
            .entry(row.value_as(&spec.x_field, x_type))
            .or_insert_with(|| x_label(row, &spec.x_field))
            .clone();
        if let Some(y) = row.number(&spec.y_field) {
            split.push(series_name(row, series_field), KeyedPoint { x, y });
        }
    }

    ChartData {
        labels: labels.into_values().collect(),
        datasets: split.into_series(Points::Keyed),
    }
}

// ---------------------------------------------------------------------------
// Pie
// ---------------------------------------------------------------------------

/// Sum y per x label in first-seen order. A y value that is not numeric
/// counts as 1.
fn pie_slices(rows: &[Row], spec: &ChartSpec, y_type: ColumnType) -> ChartData {
    let mut labels: Vec<String> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let label = x_label(row, &spec.x_field);
        let y = match y_type {
            ColumnType::Number => row.number(&spec.y_field).unwrap_or(1.0),
            _ => 1.0,
        };
        match index.get(&label) {
            Some(&i) => values[i] += y,
            None => {
                index.insert(label.clone(), labels.len());
                labels.push(label);
                values.push(y);
            }
        }
    }

    let colors: Vec<_> = (0..labels.len()).map(palette_color).collect();
    let series = ChartSeries {
        label: spec.y_field.clone(),
        points: Points::Values(values),
        background_color: Fill::PerPoint(colors.iter().map(|c| c.translucent()).collect()),
        border_color: Fill::PerPoint(colors),
        border_width: BORDER_WIDTH,
    };

    ChartData {
        labels,
        datasets: vec![series],
    }
}

// ---------------------------------------------------------------------------
// Scatter
// ---------------------------------------------------------------------------

fn scatter(rows: &[Row], spec: &ChartSpec) -> ChartData {
    let points = rows
        .iter()
        .filter_map(|row| numeric_pair(row, spec))
        .collect();

    ChartData {
        labels: Vec::new(),
        datasets: vec![solid_series(
            format!("{} vs {}", spec.x_field, spec.y_field),
            Points::Pairs(points),
            0,
        )],
    }
}

fn scatter_series(rows: &[Row], spec: &ChartSpec, series_field: &str) -> ChartData {
    let mut split = SeriesSplit::default();
    for row in rows {
        if let Some(point) = numeric_pair(row, spec) {
            split.push(series_name(row, series_field), point);
        }
    }

    ChartData {
        labels: Vec::new(),
        datasets: split.into_series(Points::Pairs),
    }
}

fn numeric_pair(row: &Row, spec: &ChartSpec) -> Option<Point> {
    Some(Point {
        x: row.number(&spec.x_field)?,
        y: row.number(&spec.y_field)?,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Points grouped by series name, series in first-seen order.
struct SeriesSplit<P> {
    series: Vec<(String, Vec<P>)>,
    index: HashMap<String, usize>,
}

impl<P> Default for SeriesSplit<P> {
    fn default() -> Self {
        Self {
            series: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<P> SeriesSplit<P> {
    fn push(&mut self, name: String, point: P) {
        match self.index.get(&name) {
            Some(&i) => self.series[i].1.push(point),
            None => {
                self.index.insert(name.clone(), self.series.len());
                self.series.push((name, vec![point]));
            }
        }
    }

    /// Colors cycle through the palette by series position.
    fn into_series(self, wrap: impl Fn(Vec<P>) -> Points) -> Vec<ChartSeries> {
        self.series
            .into_iter()
            .enumerate()
            .map(|(i, (name, points))| solid_series(name, wrap(points), i))
            .collect()
    }
}

fn solid_series(label: String, points: Points, color_index: usize) -> ChartSeries {
    let color = palette_color(color_index);
    ChartSeries {
        label,
        points,
        background_color: Fill::Single(color),
        border_color: Fill::Single(color),
        border_width: BORDER_WIDTH,
    }
}

/// The cell's text as written in the file.
fn x_label(row: &Row, column: &str) -> String {
    text_or(row, column, UNKNOWN_LABEL)
}

fn series_name(row: &Row, column: &str) -> String {
    text_or(row, column, OTHER_SERIES)
}

fn text_or(row: &Row, column: &str, placeholder: &str) -> String {
    if row.get(column).is_missing() {
        placeholder.to_string()
    } else {
        row.text(column).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::palette_len;
    use crate::config::AppConfig;
    use crate::data::loader::load_buffer;

    fn dataset(text: &str) -> Dataset {
        load_buffer(text.as_bytes(), "chart.csv", &AppConfig::default()).unwrap()
    }

    fn sales() -> Dataset {
        dataset(
            "region,product,units,price\n\
             North,Widget,10,2.5\n\
             South,Widget,5,2.5\n\
             North,Gadget,7,4\n\
             East,Gadget,3,4\n\
             South,Gizmo,x,1\n",
        )
    }

    #[test]
    fn unknown_fields_yield_none() {
        let ds = sales();
        assert!(generate(&ds, &ChartSpec::new(ChartKind::Bar, "nope", "units")).is_none());
        assert!(generate(&ds, &ChartSpec::new(ChartKind::Bar, "region", "nope")).is_none());
    }

    #[test]
    fn non_numeric_y_only_allowed_for_pie() {
        let ds = sales();
        for kind in [ChartKind::Line, ChartKind::Bar, ChartKind::Scatter] {
            assert!(generate(&ds, &ChartSpec::new(kind, "units", "region")).is_none());
        }
        assert!(generate(&ds, &ChartSpec::new(ChartKind::Pie, "region", "product")).is_some());
    }

    #[test]
    fn bar_sums_per_sorted_x() {
        let data = generate(&sales(), &ChartSpec::new(ChartKind::Bar, "region", "units")).unwrap();
        assert_eq!(data.labels, vec!["East", "North", "South"]);
        assert_eq!(data.datasets.len(), 1);
        assert_eq!(data.datasets[0].label, "units");
        // the "x" units cell is skipped
        assert_eq!(data.datasets[0].points, Points::Values(vec![3.0, 17.0, 5.0]));
        assert_eq!(data.datasets[0].background_color, Fill::Single(palette_color(0)));
    }

    #[test]
    fn numeric_x_sorts_numerically() {
        let ds = dataset("month,total\n10,1\n2,2\n1,3\n2,4\n");
        let data = generate(&ds, &ChartSpec::new(ChartKind::Line, "month", "total")).unwrap();
        assert_eq!(data.labels, vec!["1", "2", "10"]);
        assert_eq!(data.datasets[0].points, Points::Values(vec![3.0, 6.0, 1.0]));
    }

    #[test]
    fn line_with_series_keeps_per_row_points() {
        let spec = ChartSpec::new(ChartKind::Line, "region", "units").with_series("product");
        let data = generate(&sales(), &spec).unwrap();
        assert_eq!(data.labels, vec!["East", "North", "South"]);
        let names: Vec<&str> = data.datasets.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(names, vec!["Widget", "Gadget"]);
        assert_eq!(
            data.datasets[0].points,
            Points::Keyed(vec![
                KeyedPoint { x: "North".into(), y: 10.0 },
                KeyedPoint { x: "South".into(), y: 5.0 },
            ])
        );
        assert_eq!(data.datasets[1].border_color, Fill::Single(palette_color(1)));
    }

    #[test]
    fn series_field_must_be_string_typed() {
        let spec = ChartSpec::new(ChartKind::Bar, "region", "units").with_series("price");
        let data = generate(&sales(), &spec).unwrap();
        assert_eq!(data.datasets.len(), 1);
        assert!(matches!(data.datasets[0].points, Points::Values(_)));
    }

    #[test]
    fn pie_counts_non_numeric_y_as_one() {
        let data = generate(&sales(), &ChartSpec::new(ChartKind::Pie, "region", "product")).unwrap();
        assert_eq!(data.labels, vec!["North", "South", "East"]);
        assert_eq!(data.datasets[0].points, Points::Values(vec![2.0, 2.0, 1.0]));
    }

    #[test]
    fn pie_sums_numeric_y_with_per_slice_colors() {
        let data = generate(&sales(), &ChartSpec::new(ChartKind::Pie, "region", "units")).unwrap();
        // South: 5 + the unparseable "x" counted as 1
        assert_eq!(data.datasets[0].points, Points::Values(vec![17.0, 6.0, 3.0]));
        let Fill::PerPoint(fills) = &data.datasets[0].background_color else {
            panic!("pie slices are colored individually");
        };
        assert_eq!(fills.len(), 3);
        assert_eq!(fills[2], palette_color(2).translucent());
        assert_eq!(
            data.datasets[0].border_color,
            Fill::PerPoint((0..3).map(palette_color).collect())
        );
    }

    #[test]
    fn scatter_drops_non_numeric_pairs() {
        let data = generate(&sales(), &ChartSpec::new(ChartKind::Scatter, "price", "units")).unwrap();
        assert!(data.labels.is_empty());
        assert_eq!(data.datasets[0].label, "price vs units");
        assert_eq!(data.datasets[0].points.len(), 4);
    }

    #[test]
    fn scatter_with_series_splits_pairs() {
        let spec = ChartSpec::new(ChartKind::Scatter, "price", "units").with_series("region");
        let data = generate(&sales(), &spec).unwrap();
        let names: Vec<&str> = data.datasets.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(names, vec!["North", "South", "East"]);
        assert_eq!(
            data.datasets[0].points,
            Points::Pairs(vec![Point { x: 2.5, y: 10.0 }, Point { x: 4.0, y: 7.0 }])
        );
    }

    #[test]
    fn series_colors_cycle_past_palette() {
        let mut text = String::from("k,v,s\n");
        for i in 0..palette_len() + 1 {
            text.push_str(&format!("a,{i},s{i}\n"));
        }
        let spec = ChartSpec::new(ChartKind::Bar, "k", "v").with_series("s");
        let data = generate(&dataset(&text), &spec).unwrap();
        let last = data.datasets.last().unwrap();
        assert_eq!(last.background_color, Fill::Single(palette_color(0)));
    }

    #[test]
    fn overridden_boolean_y_still_charts() {
        let ds = dataset("k,flag\na,1\nb,0\nc,1\n");
        let spec = ChartSpec::new(ChartKind::Bar, "k", "flag");
        assert!(generate(&ds, &spec).is_none());

        let ds = ds.with_column_type("flag", ColumnType::Number).unwrap();
        let data = generate(&ds, &spec).unwrap();
        assert_eq!(data.labels, vec!["a", "b", "c"]);
        assert_eq!(data.datasets[0].points, Points::Values(vec![1.0, 0.0, 1.0]));
    }

    #[test]
    fn date_labels_use_file_text_in_date_order() {
        let ds = dataset("day,v\n03/02/2024,1\n2024-03-01,2\n2024-03-01,4\n");
        let data = generate(&ds, &ChartSpec::new(ChartKind::Line, "day", "v")).unwrap();
        assert_eq!(data.labels, vec!["2024-03-01", "03/02/2024"]);
        assert_eq!(data.datasets[0].points, Points::Values(vec![6.0, 1.0]));
    }

    #[test]
    fn overridden_string_x_groups_by_text() {
        let ds = dataset("amount,n\n\"$1,200\",1\n30,2\n\"$1,200\",3\n")
            .with_column_type("amount", ColumnType::String)
            .unwrap();
        let data = generate(&ds, &ChartSpec::new(ChartKind::Bar, "amount", "n")).unwrap();
        assert_eq!(data.labels, vec!["$1,200", "30"]);
        assert_eq!(data.datasets[0].points, Points::Values(vec![4.0, 2.0]));
    }

    #[test]
    fn missing_x_and_series_get_placeholder_names() {
        let ds = dataset("cat,val,grp\n,1,g\na,2,\nb,3,g\n");
        let data = generate(&ds, &ChartSpec::new(ChartKind::Bar, "cat", "val")).unwrap();
        assert_eq!(data.labels, vec!["Unknown", "a", "b"]);

        let spec = ChartSpec::new(ChartKind::Bar, "cat", "val").with_series("grp");
        let data = generate(&ds, &spec).unwrap();
        let names: Vec<&str> = data.datasets.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(names, vec!["g", "Other"]);
    }
}
