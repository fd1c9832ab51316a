use log::debug;

use crate::config::BAND_WIDTH;
use crate::error::BinError;

// ---------------------------------------------------------------------------
// BandLayout – the shared bin edges
// ---------------------------------------------------------------------------

/// Fixed-width elevation bands starting at 0.
///
/// Band `i` covers `[i * band_width, (i + 1) * band_width)`. A single layout is
/// built per run and used for every site and category, so any two histograms
/// from the same run line up band for band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandLayout {
    band_width: f64,
    band_count: usize,
}

impl BandLayout {
    pub fn new(band_width: f64, band_count: usize) -> Result<Self, BinError> {
        if !band_width.is_finite() || band_width <= 0.0 {
            return Err(BinError::InvalidBandWidth(band_width));
        }
        Ok(Self {
            band_width,
            band_count,
        })
    }

    /// Bounded layout over `[0, domain_max)` with the standard band width.
    pub fn fixed(domain_max: f64) -> Result<Self, BinError> {
        if !domain_max.is_finite() || domain_max <= 0.0 {
            return Err(BinError::OutOfDomain {
                elevation: domain_max,
                domain_max,
            });
        }
        Self::new(BAND_WIDTH, (domain_max / BAND_WIDTH).ceil() as usize)
    }

    /// Smallest standard layout whose last band contains `max_elevation`.
    pub fn covering(max_elevation: f64) -> Result<Self, BinError> {
        if !max_elevation.is_finite() || max_elevation < 0.0 {
            return Err(BinError::OutOfDomain {
                elevation: max_elevation,
                domain_max: f64::INFINITY,
            });
        }
        let layout = Self::new(BAND_WIDTH, (max_elevation / BAND_WIDTH).floor() as usize + 1)?;
        debug!(
            "Band layout covering {max_elevation} m: {} bands up to {} m",
            layout.band_count,
            layout.domain_max()
        );
        Ok(layout)
    }

    pub fn band_width(&self) -> f64 {
        self.band_width
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Exclusive upper edge of the last band.
    pub fn domain_max(&self) -> f64 {
        self.band_count as f64 * self.band_width
    }

    /// Lower edge of band `index`.
    pub fn band_start(&self, index: usize) -> f64 {
        index as f64 * self.band_width
    }

    /// Band holding `elevation`; `None` for the missing marker `0.0`.
    pub fn band_of(&self, elevation: f64) -> Result<Option<usize>, BinError> {
        if elevation == 0.0 {
            return Ok(None);
        }
        if !(0.0..self.domain_max()).contains(&elevation) {
            return Err(BinError::OutOfDomain {
                elevation,
                domain_max: self.domain_max(),
            });
        }
        Ok(Some((elevation / self.band_width).floor() as usize))
    }

    /// Count `elevations` into a histogram over every band of the layout.
    pub fn bin<I>(&self, elevations: I) -> Result<ElevationHistogram, BinError>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut counts = vec![0u32; self.band_count];
        for elevation in elevations {
            if let Some(band) = self.band_of(elevation)? {
                counts[band] += 1;
            }
        }
        Ok(ElevationHistogram {
            band_width: self.band_width,
            counts,
        })
    }
}

// ---------------------------------------------------------------------------
// ElevationHistogram – the hypsometric curve of one category at one site
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ElevationHistogram {
    band_width: f64,
    counts: Vec<u32>,
}

impl ElevationHistogram {
    pub fn band_width(&self) -> f64 {
        self.band_width
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Number of bands in the layout this histogram was binned with.
    pub fn band_count(&self) -> usize {
        self.counts.len()
    }

    pub fn count(&self, band: usize) -> u32 {
        self.counts.get(band).copied().unwrap_or(0)
    }

    /// Indices of bands holding at least one point.
    pub fn occupied_bands(&self) -> impl Iterator<Item = usize> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(i, _)| i)
    }

    /// Number of points counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }
}
