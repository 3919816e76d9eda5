/// Data layer: raw text in, typed dataset out.
///
/// Architecture:
/// ```text
///  .csv / .tsv bytes + filename + size
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  file type + size checks, UTF-8 decode
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  parser   │  delimiter detection → RawTable (headers, string rows)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  builder  │  limits, infer per column, coerce cells
///   └──────────┘   (infer + dates decide the column types)
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset  │  headers, typed rows, column types
///   └──────────┘
/// ```

pub mod builder;
pub mod dates;
pub mod infer;
pub mod loader;
pub mod model;
pub mod parser;
pub mod samples;
