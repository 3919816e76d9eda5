use super::{ChartKind, ChartSpec};
use crate::data::model::{ColumnType, Dataset};

/// Pick a default chart from column types.
///
/// Priority: date + number gives a line, categorical + number a bar, two
/// numbers a scatter, a lone categorical a pie. The first qualifying
/// column in header order wins each role.
pub fn suggest(dataset: &Dataset) -> Option<ChartSpec> {
    let numeric = columns_where(dataset, |t| t == ColumnType::Number);
    let dates = columns_where(dataset, |t| t == ColumnType::Date);
    let categorical = columns_where(dataset, ColumnType::is_categorical);

    let spec = match (dates.first(), categorical.first(), numeric.as_slice()) {
        (Some(date), _, [num, ..]) => {
            ChartSpec::new(ChartKind::Line, *date, *num).with_title(format!("{num} over time"))
        }
        (None, Some(cat), [num, ..]) => {
            ChartSpec::new(ChartKind::Bar, *cat, *num).with_title(format!("{num} by {cat}"))
        }
        (None, None, [x, y, ..]) => {
            ChartSpec::new(ChartKind::Scatter, *x, *y).with_title(format!("{y} vs {x}"))
        }
        (_, Some(cat), _) => {
            // Slices are counted when the fallback y field is not numeric.
            let headers = dataset.headers();
            let y = headers.get(1).or(headers.first())?;
            ChartSpec::new(ChartKind::Pie, *cat, y.as_str())
                .with_title(format!("Distribution of {cat}"))
        }
        _ => return None,
    };

    log::debug!("Suggested {:?} chart for {}", spec.kind, dataset.filename());
    Some(spec)
}

/// Headers whose type satisfies `pred`, in header order.
fn columns_where(dataset: &Dataset, pred: fn(ColumnType) -> bool) -> Vec<&str> {
    dataset
        .headers()
        .iter()
        .filter(|h| dataset.column_type(h).is_some_and(pred))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::data::loader::load_buffer;

    fn dataset(text: &str) -> Dataset {
        load_buffer(text.as_bytes(), "suggest.csv", &AppConfig::default()).unwrap()
    }

    #[test]
    fn date_and_number_beats_everything() {
        let ds = dataset(
            "region,day,units,price\n\
             North,2024-01-01,3,1.5\n\
             South,2024-01-02,4,2.5\n",
        );
        let spec = suggest(&ds).unwrap();
        assert_eq!(spec.kind, ChartKind::Line);
        assert_eq!(spec.x_field, "day");
        assert_eq!(spec.y_field, "units");
        assert_eq!(spec.title.as_deref(), Some("units over time"));
    }

    #[test]
    fn categorical_and_number_gives_bar() {
        let ds = dataset("count,region,other\n3,North,x\n4,South,y\n");
        let spec = suggest(&ds).unwrap();
        assert_eq!(spec.kind, ChartKind::Bar);
        assert_eq!((spec.x_field.as_str(), spec.y_field.as_str()), ("region", "count"));
        assert_eq!(spec.title.as_deref(), Some("count by region"));
    }

    #[test]
    fn boolean_counts_as_categorical() {
        let ds = dataset("paid,amount\nyes,3\nno,4\n");
        assert_eq!(suggest(&ds).unwrap().kind, ChartKind::Bar);
    }

    #[test]
    fn two_numbers_give_scatter() {
        let ds = dataset("height,weight\n170,65\n180,80\n");
        let spec = suggest(&ds).unwrap();
        assert_eq!(spec.kind, ChartKind::Scatter);
        assert_eq!((spec.x_field.as_str(), spec.y_field.as_str()), ("height", "weight"));
    }

    #[test]
    fn lone_categorical_gives_pie_on_second_header() {
        let ds = dataset("day,fruit\n2024-01-01,apple\n2024-01-02,pear\n");
        let spec = suggest(&ds).unwrap();
        assert_eq!(spec.kind, ChartKind::Pie);
        assert_eq!(spec.x_field, "fruit");
        assert_eq!(spec.y_field, "fruit");
        assert_eq!(spec.title.as_deref(), Some("Distribution of fruit"));

        let single = dataset("fruit\napple\npear\n");
        assert_eq!(suggest(&single).unwrap().y_field, "fruit");
    }

    #[test]
    fn nothing_to_suggest() {
        let ds = dataset("day,amount\n2024-01-01,\n2024-01-02,\n");
        // amount has no values at all, so it is unknown
        assert!(suggest(&ds).is_none());
    }
}
