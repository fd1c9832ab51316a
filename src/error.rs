//! Error types for hypsometric overlap analysis

use std::path::PathBuf;

use thiserror::Error;

use crate::data::model::RockCategory;

/// Problems with the input directory, manifest or point tables.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("found {0} point tables in the input directory; expected a non-zero multiple of 3")]
    FileCount(usize),

    #[error("unknown rock category '{0}' (expected carbonate, felsic or mafic)")]
    UnknownCategory(String),

    #[error("cannot tell the rock category of '{}' from its name", .0.display())]
    UntaggedFile(PathBuf),

    #[error("site '{site}' has more than one {category} table")]
    DuplicateCategory { site: String, category: RockCategory },

    #[error("site '{site}' has no {category} table")]
    MissingCategory { site: String, category: RockCategory },

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("{}: row {row}, column {column}: {reason}", .file.display())]
    InvalidValue {
        file: PathBuf,
        row: usize,
        column: &'static str,
        reason: String,
    },
}

/// Violations of the shared band layout.
#[derive(Error, Debug, PartialEq)]
pub enum BinError {
    #[error("band width must be positive and finite, got {0}")]
    InvalidBandWidth(f64),

    #[error("elevation {elevation} lies outside the band domain [0, {domain_max})")]
    OutOfDomain { elevation: f64, domain_max: f64 },
}

/// Histograms handed to the overlap locator do not share a layout.
#[derive(Error, Debug, PartialEq)]
pub enum OverlapError {
    #[error("histogram length mismatch: {0}, {1} and {2} bands")]
    LengthMismatch(usize, usize, usize),

    #[error("histogram band width mismatch: {0}, {1} and {2}")]
    BandWidthMismatch(f64, f64, f64),
}

/// Failures while merging the per-category blocks of a group.
#[derive(Error, Debug, PartialEq)]
pub enum ExtractError {
    #[error("{site}: shifting {category} {field} {id} by {offset} overflows a 64-bit ID")]
    IdOverflow {
        site: String,
        category: RockCategory,
        field: &'static str,
        id: i64,
        offset: i64,
    },
}
