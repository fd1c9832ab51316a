/// Data layer: point records, loading, site pairing, selection and output.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet   (one file per site × rock category)
///        │
///        ▼
///   ┌──────────┐
///   │  catalog  │  pair files with (site, category) → SiteFiles
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Vec<PointRecord>
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ SiteTables  │  three CategoryTables per site
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  records inside an elevation range
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  GroupNN.csv, GroupNN_hypsometry.csv
///   └──────────┘
/// ```

pub mod catalog;
pub mod filter;
pub mod loader;
pub mod model;
pub mod writer;
