use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

// ---------------------------------------------------------------------------
// RockCategory – the three lithologies a site is split into
// ---------------------------------------------------------------------------

/// Geological classification of the bedrock under a stream point.
///
/// The declaration order is the merge order of the group extractor:
/// Carbonate IDs always form the lowest-numbered block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RockCategory {
    Carbonate,
    Felsic,
    Mafic,
}

impl RockCategory {
    /// All categories in merge order.
    pub const ALL: [RockCategory; 3] = [
        RockCategory::Carbonate,
        RockCategory::Felsic,
        RockCategory::Mafic,
    ];

    /// Position of the category inside [`RockCategory::ALL`].
    pub fn index(self) -> usize {
        match self {
            RockCategory::Carbonate => 0,
            RockCategory::Felsic => 1,
            RockCategory::Mafic => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RockCategory::Carbonate => "Carbonate",
            RockCategory::Felsic => "Felsic",
            RockCategory::Mafic => "Mafic",
        }
    }

    /// Match a single file-name token such as `carbonate` or `MAF`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "carbonate" | "carb" => Some(RockCategory::Carbonate),
            "felsic" | "fels" => Some(RockCategory::Felsic),
            "mafic" | "maf" => Some(RockCategory::Mafic),
            _ => None,
        }
    }
}

impl fmt::Display for RockCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RockCategory {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RockCategory::from_token(s.trim()).ok_or_else(|| InputError::UnknownCategory(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// PointRecord – one row of a point table
// ---------------------------------------------------------------------------

/// A single stream sample point.
///
/// Serialized with the column names of the output files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    #[serde(rename = "ObjectID")]
    pub object_id: i64,
    #[serde(rename = "StreamID")]
    pub stream_id: i64,
    #[serde(rename = "Long")]
    pub longitude: f64,
    #[serde(rename = "Lat")]
    pub latitude: f64,
    /// Metres above sea level. `0.0` marks a missing value.
    #[serde(rename = "Elevation")]
    pub elevation: f64,
}

impl PointRecord {
    /// Whether the elevation carries the "no data" marker.
    pub fn elevation_missing(&self) -> bool {
        self.elevation == 0.0
    }
}

// ---------------------------------------------------------------------------
// CategoryTable / SiteTables – loaded input, grouped per site
// ---------------------------------------------------------------------------

/// Identity of a study site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteId {
    /// 1-based sequence number; drives output file naming.
    pub number: usize,
    /// Human readable label taken from the file name or manifest.
    pub label: String,
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Group {}", self.number)
    }
}

/// All records of one (site, rock category) pair.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    pub category: RockCategory,
    /// File the records were read from.
    pub source: PathBuf,
    pub records: Vec<PointRecord>,
}

impl CategoryTable {
    /// Elevations of every record, in table order (missing markers included).
    pub fn elevations(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.elevation)
    }

    /// Largest elevation in the table, ignoring missing markers.
    pub fn max_elevation(&self) -> Option<f64> {
        self.records
            .iter()
            .filter(|r| !r.elevation_missing())
            .map(|r| r.elevation)
            .fold(None, |acc, e| Some(acc.map_or(e, |m: f64| m.max(e))))
    }
}

/// The three category tables of one site, indexed by [`RockCategory::index`].
#[derive(Debug, Clone)]
pub struct SiteTables {
    pub site: SiteId,
    pub tables: [CategoryTable; 3],
}

impl SiteTables {
    pub fn table(&self, category: RockCategory) -> &CategoryTable {
        &self.tables[category.index()]
    }

    pub fn max_elevation(&self) -> Option<f64> {
        self.tables
            .iter()
            .filter_map(CategoryTable::max_elevation)
            .fold(None, |acc, e| Some(acc.map_or(e, |m: f64| m.max(e))))
    }
}

// ---------------------------------------------------------------------------
// OutputGroup – merged, renumbered records of one site
// ---------------------------------------------------------------------------

/// Records of all three categories within a site's overlap range.
///
/// `records` holds the Carbonate block, then Felsic, then Mafic;
/// `block_lengths` gives the size of each block in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputGroup {
    pub records: Vec<PointRecord>,
    pub block_lengths: [usize; 3],
}

impl OutputGroup {
    /// The records contributed by one category.
    pub fn block(&self, category: RockCategory) -> &[PointRecord] {
        let start: usize = self.block_lengths[..category.index()].iter().sum();
        &self.records[start..start + self.block_lengths[category.index()]]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
