use std::ops::RangeInclusive;

use super::binner::ElevationHistogram;
use crate::error::OverlapError;

/// Inclusive elevation window spanned by the overlap bands.
///
/// Both bounds are band *starts*: `{min_band * width, max_band * width}`.
/// Records in the top band above its lower edge are therefore outside
/// the window, matching the historical output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapRange {
    min_band: usize,
    max_band: usize,
    band_width: f64,
}

impl OverlapRange {
    pub fn new(min_band: usize, max_band: usize, band_width: f64) -> Self {
        debug_assert!(min_band <= max_band);
        Self {
            min_band,
            max_band,
            band_width,
        }
    }

    pub fn min_band(&self) -> usize {
        self.min_band
    }

    pub fn max_band(&self) -> usize {
        self.max_band
    }

    pub fn min_elevation(&self) -> f64 {
        self.min_band as f64 * self.band_width
    }

    pub fn max_elevation(&self) -> f64 {
        self.max_band as f64 * self.band_width
    }

    pub fn contains(&self, elevation: f64) -> bool {
        (self.min_elevation()..=self.max_elevation()).contains(&elevation)
    }
}

/// Bands where all three categories are present, plus their envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlap {
    bands: Vec<usize>,
    range: OverlapRange,
}

impl Overlap {
    /// Sorted overlap band indices.
    pub fn bands(&self) -> &[usize] {
        &self.bands
    }

    pub fn range(&self) -> &OverlapRange {
        &self.range
    }

    /// Maximal runs of consecutive overlap bands.
    pub fn band_runs(&self) -> Vec<RangeInclusive<usize>> {
        let mut runs: Vec<RangeInclusive<usize>> = Vec::new();
        for &band in &self.bands {
            match runs.last_mut() {
                Some(run) if *run.end() + 1 == band => *run = *run.start()..=band,
                _ => runs.push(band..=band),
            }
        }
        runs
    }

    /// Whether the envelope contains only overlap bands.
    pub fn is_contiguous(&self) -> bool {
        self.range.max_band() - self.range.min_band() + 1 == self.bands.len()
    }
}

fn check_shape(histograms: [&ElevationHistogram; 3]) -> Result<(), OverlapError> {
    let [a, b, c] = histograms;
    if a.band_count() != b.band_count() || b.band_count() != c.band_count() {
        return Err(OverlapError::LengthMismatch(
            a.band_count(),
            b.band_count(),
            c.band_count(),
        ));
    }
    if a.band_width() != b.band_width() || b.band_width() != c.band_width() {
        return Err(OverlapError::BandWidthMismatch(
            a.band_width(),
            b.band_width(),
            c.band_width(),
        ));
    }
    Ok(())
}

/// Band indices where every one of the three histograms is non-zero.
///
/// Presence is tested per histogram; counts are never combined arithmetically.
pub fn overlap_bands(histograms: [&ElevationHistogram; 3]) -> Result<Vec<usize>, OverlapError> {
    check_shape(histograms)?;
    let [a, b, c] = histograms;
    Ok(a.counts()
        .iter()
        .zip(b.counts())
        .zip(c.counts())
        .enumerate()
        .filter(|(_, ((&x, &y), &z))| x > 0 && y > 0 && z > 0)
        .map(|(i, _)| i)
        .collect())
}

/// Find the tri-wise overlap of a site's histograms.
///
/// Returns `Ok(None)` when no band holds points of all three categories.
pub fn locate_overlap(
    histograms: [&ElevationHistogram; 3],
) -> Result<Option<Overlap>, OverlapError> {
    let bands = overlap_bands(histograms)?;
    let (Some(&min_band), Some(&max_band)) = (bands.first(), bands.last()) else {
        return Ok(None);
    };
    let range = OverlapRange::new(min_band, max_band, histograms[0].band_width());
    Ok(Some(Overlap { bands, range }))
}
