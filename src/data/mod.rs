/// Data layer: core table type, loading, and row operations.
///
/// Architecture:
/// ```text
///  .csv / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → DataTable (+ attributes)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ DataTable  │  rows × named columns, typed ColumnId handles
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  predicates, exact-value grouping, distinct values
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
