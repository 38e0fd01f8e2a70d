/// Data layer: core types, loading, generation, filtering and export.
///
/// Architecture:
/// ```text
///  .csv / .xlsx / .json / .parquet        seed
///        │                                  │
///        ▼                                  ▼
///   ┌──────────┐                      ┌───────────┐
///   │  loader   │  cells → records    │ generator  │  synthetic records
///   └──────────┘                      └───────────┘
///        │                                  │
///        └───────────────┬──────────────────┘
///                        ▼
///                 ┌─────────────┐
///                 │ RecordTable  │  Vec<TestRecord>, schema flags
///                 └─────────────┘
///                        │
///                        ▼
///                  ┌──────────┐
///                  │  filter   │  FilterSpec → ordered subset
///                  └──────────┘
///                        │
///                        ▼
///                  ┌──────────┐
///                  │  export   │  subset → CSV / xlsx / parquet bytes
///                  └──────────┘
/// ```

pub mod cell;
pub mod export;
pub mod filter;
pub mod generator;
pub mod loader;
pub mod model;
