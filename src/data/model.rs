use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::dates::{format_iso, parse_date, parse_iso_timestamp};
use super::infer::parse_boolean;
use crate::error::DashError;

// ---------------------------------------------------------------------------
// ColumnType – semantic classification of a column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Date,
    Boolean,
    Unknown,
}

impl ColumnType {
    /// String and boolean columns are grouped and counted rather than measured.
    pub fn is_categorical(self) -> bool {
        matches!(self, ColumnType::String | ColumnType::Boolean)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
            ColumnType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CellValue – a single typed cell
// ---------------------------------------------------------------------------

/// A cell after build-time coercion.
///
/// The variant is decided once from the column's inferred type. Cells that
/// could not be coerced keep their original text as `String`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    Null,
}

static NULL_CELL: CellValue = CellValue::Null;

// -- Manual Eq/Ord so cells can key a BTreeMap when grouping --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Number(_) => 2,
                Date(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Number(a), Number(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Number(v) => v.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

/// The string form used as a grouping key. Missing cells render empty and
/// dates at midnight print as a plain `YYYY-MM-DD`.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Number(v) => write!(f, "{}", format_number_key(*v)),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) if d.time() == NaiveTime::MIN => {
                write!(f, "{}", d.format("%Y-%m-%d"))
            }
            CellValue::Date(d) => write!(f, "{}", format_iso(d)),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Null or empty text.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Whether the variant is what a column of type `ty` holds after
    /// coercion. Missing cells fit anywhere.
    fn fits(&self, ty: ColumnType) -> bool {
        matches!(
            (self, ty),
            (CellValue::Null, _)
                | (_, ColumnType::Unknown)
                | (CellValue::String(_), ColumnType::String)
                | (CellValue::Number(_), ColumnType::Number)
                | (CellValue::Bool(_), ColumnType::Boolean)
                | (CellValue::Date(_), ColumnType::Date)
        )
    }
}

/// Read `text` as a value of type `ty`. `None` when it does not parse, and
/// always for string and unknown columns.
pub(crate) fn coerce_text(text: &str, ty: ColumnType) -> Option<CellValue> {
    match ty {
        ColumnType::Number => parse_number(text).map(CellValue::Number),
        ColumnType::Date => parse_date(text).map(CellValue::Date),
        ColumnType::Boolean => parse_boolean(text).map(CellValue::Bool),
        ColumnType::String | ColumnType::Unknown => None,
    }
}

/// Parse a formatted number such as `$1,234.50`. Only finite values count.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integral values print without a fractional part (`10`, not `10.0`).
fn format_number_key(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

// Persisted shape: plain JSON scalars, dates as ISO-8601 strings.

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::String(s) => serializer.serialize_str(s),
            CellValue::Number(v) => serializer.serialize_f64(*v),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Date(d) => serializer.serialize_str(&format_iso(d)),
            CellValue::Null => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CellVisitor;

        impl<'de> Visitor<'de> for CellVisitor {
            type Value = CellValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, number, boolean or null")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<CellValue, E> {
                Ok(CellValue::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<CellValue, E> {
                Ok(CellValue::Number(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CellValue, E> {
                Ok(CellValue::Number(v as f64))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<CellValue, E> {
                Ok(CellValue::Number(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CellValue, E> {
                Ok(CellValue::String(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<CellValue, E> {
                Ok(CellValue::String(v))
            }

            fn visit_none<E: de::Error>(self) -> Result<CellValue, E> {
                Ok(CellValue::Null)
            }

            fn visit_unit<E: de::Error>(self) -> Result<CellValue, E> {
                Ok(CellValue::Null)
            }
        }

        deserializer.deserialize_any(CellVisitor)
    }
}

// ---------------------------------------------------------------------------
// Row – one record, keyed by column name
// ---------------------------------------------------------------------------

/// Typed cells plus the file's text for cells whose coerced form prints
/// differently (`$1,200`, `yes`, `03/01/2024`). The text lets a column be
/// read again under another type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: BTreeMap<String, CellValue>,
    source: BTreeMap<String, String>,
}

impl Row {
    /// Cell for `column`; absent keys read as `Null`.
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&NULL_CELL)
    }

    /// What the file said for `column`. Empty for missing cells.
    pub fn text(&self, column: &str) -> Cow<'_, str> {
        if let Some(raw) = self.source.get(column) {
            return Cow::Borrowed(raw);
        }
        match self.get(column) {
            CellValue::String(s) => Cow::Borrowed(s),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// The cell as a column of type `ty` sees it. Cells coerced for another
    /// type are read again from their text, falling back to plain text.
    pub fn value_as(&self, column: &str, ty: ColumnType) -> Cow<'_, CellValue> {
        let cell = self.get(column);
        if cell.fits(ty) {
            return Cow::Borrowed(cell);
        }
        let text = self.text(column);
        match coerce_text(&text, ty) {
            Some(value) => Cow::Owned(value),
            None => Cow::Owned(CellValue::String(text.into_owned())),
        }
    }

    /// Numeric reading of `column`, whatever type the cell was coerced to.
    pub fn number(&self, column: &str) -> Option<f64> {
        match self.value_as(column, ColumnType::Number).as_ref() {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Store a coerced cell, keeping `text` when the cell would print
    /// differently.
    pub(crate) fn insert_parsed(&mut self, column: String, cell: CellValue, text: &str) {
        let keeps_text = !matches!(cell, CellValue::String(_) | CellValue::Null);
        if keeps_text && cell.to_string() != text {
            self.source.insert(column.clone(), text.to_string());
        }
        self.cells.insert(column, cell);
    }

    fn get_mut(&mut self, column: &str) -> Option<&mut CellValue> {
        self.cells.get_mut(column)
    }
}

impl FromIterator<(String, CellValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        Row {
            cells: iter.into_iter().collect(),
            source: BTreeMap::new(),
        }
    }
}

// A persisted row is its cells only; source text travels on the dataset.

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.cells.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cells = BTreeMap::<String, CellValue>::deserialize(deserializer)?;
        Ok(cells.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// ColumnTypes – header-ordered column → type mapping
// ---------------------------------------------------------------------------

/// Column types in header order. Serializes as a JSON object and keeps the
/// key order of the source document when read back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnTypes {
    entries: Vec<(String, ColumnType)>,
}

impl ColumnTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<ColumnType> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| *ty)
    }

    /// Replace the entry for `column`, or append it.
    pub fn set(&mut self, column: impl Into<String>, ty: ColumnType) {
        let column = column.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = ty,
            None => self.entries.push((column, ty)),
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.entries.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Columns of the given type, in order.
    pub fn columns_of(&self, ty: ColumnType) -> impl Iterator<Item = &str> {
        self.iter().filter(move |(_, t)| *t == ty).map(|(name, _)| name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ColumnType)> for ColumnTypes {
    fn from_iter<I: IntoIterator<Item = (String, ColumnType)>>(iter: I) -> Self {
        let mut types = ColumnTypes::new();
        for (name, ty) in iter {
            types.set(name, ty);
        }
        types
    }
}

impl Serialize for ColumnTypes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, ty) in &self.entries {
            map.serialize_entry(name, ty)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ColumnTypes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TypesVisitor;

        impl<'de> Visitor<'de> for TypesVisitor {
            type Value = ColumnTypes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to column type")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ColumnTypes, A::Error> {
                let mut types = ColumnTypes::new();
                while let Some((name, ty)) = access.next_entry::<String, ColumnType>()? {
                    types.set(name, ty);
                }
                Ok(types)
            }
        }

        deserializer.deserialize_map(TypesVisitor)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the canonical loaded table
// ---------------------------------------------------------------------------

/// An immutable snapshot of one uploaded table.
///
/// `column_types` holds exactly one entry per header. Changing a type yields
/// a new `Dataset` via [`Dataset::with_column_type`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "DatasetRecord")]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Row>,
    column_types: ColumnTypes,
    filename: String,
    size: u64,
}

/// Wire shape of a persisted dataset before invariants are checked.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetRecord {
    headers: Vec<String>,
    rows: Vec<Row>,
    column_types: ColumnTypes,
    filename: String,
    size: u64,
    /// Row index to source text, for rows that have any.
    #[serde(default)]
    source_text: BTreeMap<usize, BTreeMap<String, String>>,
}

impl TryFrom<DatasetRecord> for Dataset {
    type Error = DashError;

    fn try_from(record: DatasetRecord) -> Result<Self, Self::Error> {
        let mut rows = record.rows;
        for (index, source) in record.source_text {
            match rows.get_mut(index) {
                Some(row) => row.source = source,
                None => log::debug!("Dropping source text for missing row {index}"),
            }
        }
        let mut dataset = Dataset::from_parts(
            record.headers,
            rows,
            record.column_types,
            record.filename,
            record.size,
        )?;
        dataset.revive_dates();
        Ok(dataset)
    }
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let source_text: BTreeMap<usize, &BTreeMap<String, String>> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.source.is_empty())
            .map(|(index, row)| (index, &row.source))
            .collect();

        let fields = if source_text.is_empty() { 5 } else { 6 };
        let mut state = serializer.serialize_struct("Dataset", fields)?;
        state.serialize_field("headers", &self.headers)?;
        state.serialize_field("rows", &self.rows)?;
        state.serialize_field("columnTypes", &self.column_types)?;
        state.serialize_field("filename", &self.filename)?;
        state.serialize_field("size", &self.size)?;
        if !source_text.is_empty() {
            state.serialize_field("sourceText", &source_text)?;
        }
        state.end()
    }
}

impl Dataset {
    /// Assemble a dataset, checking that every header has exactly one type.
    pub(crate) fn from_parts(
        headers: Vec<String>,
        rows: Vec<Row>,
        column_types: ColumnTypes,
        filename: String,
        size: u64,
    ) -> Result<Self, DashError> {
        let unique: BTreeSet<&str> = headers.iter().map(String::as_str).collect();
        if unique.len() != headers.len() {
            return Err(DashError::structural("Duplicate column headers found."));
        }
        if column_types.len() != headers.len() {
            return Err(DashError::structural(format!(
                "Expected {} column types, found {}.",
                headers.len(),
                column_types.len()
            )));
        }
        if let Some(missing) = headers.iter().find(|h| !column_types.contains(h)) {
            return Err(DashError::UnknownColumn(missing.clone()));
        }
        Ok(Dataset {
            headers,
            rows,
            column_types,
            filename,
            size,
        })
    }

    /// Persisted dates arrive as ISO strings; turn them back into dates for
    /// date-typed columns.
    fn revive_dates(&mut self) {
        let date_columns: Vec<String> = self
            .column_types
            .columns_of(ColumnType::Date)
            .map(str::to_string)
            .collect();
        if date_columns.is_empty() {
            return;
        }
        for row in &mut self.rows {
            for column in &date_columns {
                if let Some(cell) = row.get_mut(column) {
                    if let CellValue::String(s) = cell {
                        if let Some(d) = parse_iso_timestamp(s) {
                            *cell = CellValue::Date(d);
                        }
                    }
                }
            }
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_types(&self) -> &ColumnTypes {
        &self.column_types
    }

    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.column_types.get(column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Source size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A copy with one column's type replaced. Row values are left as they
    /// are; readers go through [`Row::value_as`] and [`Row::number`], which
    /// re-read the source text under the new type.
    pub fn with_column_type(&self, column: &str, ty: ColumnType) -> Result<Dataset, DashError> {
        if !self.has_column(column) {
            return Err(DashError::UnknownColumn(column.to_string()));
        }
        let mut next = self.clone();
        next.column_types.set(column, ty);
        Ok(next)
    }

    /// Apply stored overrides, ignoring columns this dataset does not have.
    pub fn with_column_types(&self, overrides: &ColumnTypes) -> Dataset {
        let mut next = self.clone();
        for (column, ty) in overrides.iter() {
            if next.has_column(column) {
                next.column_types.set(column, ty);
            } else {
                log::debug!("Ignoring type override for unknown column '{column}'");
            }
        }
        next
    }
}
