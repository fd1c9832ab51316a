use std::path::{Path, PathBuf};

/// Width of one elevation band in metres. Fixed for every site and category.
pub const BAND_WIDTH: f64 = 10.0;

/// Domain ceiling of the historical bounded layout (451 bands of 10 m).
pub const LEGACY_DOMAIN_MAX: f64 = 4510.0;

/// Header of every output group file.
pub const GROUP_HEADER: [&str; 5] = ["ObjectID", "StreamID", "Long", "Lat", "Elevation"];

/// File extensions the table loader understands.
pub const TABLE_EXTENSIONS: [&str; 4] = ["csv", "json", "parquet", "pq"];

/// How point tables are paired with (site, rock category).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogMode {
    /// Site label and category are read from each file name.
    #[default]
    Tagged,
    /// An explicit `file,site,category` manifest.
    Manifest,
    /// Sorted listing position: `i / 3` is the site, `i % 3` the category.
    Ordinal,
}

/// Everything a single run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub mode: CatalogMode,
    pub manifest: Option<PathBuf>,
    /// Use a bounded `[0, domain_max)` layout instead of one sized to the data.
    pub domain_max: Option<f64>,
    /// Also write a per-site band count table.
    pub write_hypsometry: bool,
}

impl RunConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            mode: CatalogMode::default(),
            manifest: None,
            domain_max: None,
            write_hypsometry: false,
        }
    }

    /// Output path of a site's merged group, e.g. `Group01.csv`.
    pub fn group_path(&self, site_number: usize) -> PathBuf {
        group_file(&self.output_dir, site_number, "")
    }

    /// Output path of a site's band table, e.g. `Group01_hypsometry.csv`.
    pub fn hypsometry_path(&self, site_number: usize) -> PathBuf {
        group_file(&self.output_dir, site_number, "_hypsometry")
    }
}

fn group_file(dir: &Path, site_number: usize, suffix: &str) -> PathBuf {
    dir.join(format!("Group{site_number:02}{suffix}.csv"))
}
