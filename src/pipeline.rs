//! Per-site driver: bin → locate overlap → extract group → write.

use std::fs;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::config::RunConfig;
use crate::data::catalog::{catalog_sites, load_sites};
use crate::data::model::{OutputGroup, RockCategory, SiteId, SiteTables};
use crate::data::writer::{write_group, write_hypsometry};
use crate::error::BinError;
use crate::extract::extract_group;
use crate::hypsometry::binner::{BandLayout, ElevationHistogram};
use crate::hypsometry::overlap::{Overlap, locate_overlap};

// ---------------------------------------------------------------------------
// Per-site result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum SiteOutcome {
    /// No band holds points of all three categories.
    NoOverlap,
    Overlap { overlap: Overlap, group: OutputGroup },
}

#[derive(Debug, Clone)]
pub struct SiteReport {
    pub site: SiteId,
    /// Histograms in Carbonate, Felsic, Mafic order.
    pub histograms: [ElevationHistogram; 3],
    pub outcome: SiteOutcome,
}

impl SiteReport {
    /// The line printed for this site on stdout.
    pub fn diagnostic(&self) -> String {
        match &self.outcome {
            SiteOutcome::NoOverlap => format!("{}: No suitable locations found.", self.site),
            SiteOutcome::Overlap { overlap, .. } => format!(
                "{}: Suitable conditions between {} m and {} m elevation.",
                self.site,
                overlap.range().min_elevation(),
                overlap.range().max_elevation()
            ),
        }
    }

    pub fn group(&self) -> Option<&OutputGroup> {
        match &self.outcome {
            SiteOutcome::NoOverlap => None,
            SiteOutcome::Overlap { group, .. } => Some(group),
        }
    }

    fn histogram_refs(&self) -> [&ElevationHistogram; 3] {
        let [c, f, m] = &self.histograms;
        [c, f, m]
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// The one band layout shared by every site and category of a run.
///
/// With `domain_max` the layout is the bounded `[0, domain_max)` domain;
/// otherwise it is sized to the highest elevation across all sites.
pub fn band_layout(sites: &[SiteTables], domain_max: Option<f64>) -> Result<BandLayout, BinError> {
    let layout = match domain_max {
        Some(max) => BandLayout::fixed(max)?,
        None => {
            let highest = sites
                .iter()
                .filter_map(SiteTables::max_elevation)
                .fold(0.0, f64::max);
            BandLayout::covering(highest)?
        }
    };
    info!(
        "Using {} bands of {} m over [0, {})",
        layout.band_count(),
        layout.band_width(),
        layout.domain_max()
    );
    Ok(layout)
}

/// Run the three-way overlap analysis for one site.
pub fn analyze_site(layout: &BandLayout, site: &SiteTables) -> Result<SiteReport> {
    let bin = |category: RockCategory| -> Result<ElevationHistogram> {
        let table = site.table(category);
        layout
            .bin(table.elevations())
            .with_context(|| format!("binning {}", table.source.display()))
    };
    let histograms = [
        bin(RockCategory::Carbonate)?,
        bin(RockCategory::Felsic)?,
        bin(RockCategory::Mafic)?,
    ];
    for (category, hist) in RockCategory::ALL.iter().zip(&histograms) {
        debug!("{}: {} {} points binned", site.site, hist.total(), category);
    }

    let [c, f, m] = &histograms;
    let outcome = match locate_overlap([c, f, m])? {
        None => SiteOutcome::NoOverlap,
        Some(overlap) => {
            debug!(
                "{}: {} overlap bands within bands {}..={}",
                site.site,
                overlap.bands().len(),
                overlap.range().min_band(),
                overlap.range().max_band()
            );
            if !overlap.is_contiguous() {
                warn!(
                    "{}: overlap bands are not contiguous ({:?}); selecting the whole envelope",
                    site.site,
                    overlap.band_runs()
                );
            }
            let group = extract_group(overlap.range(), site)?;
            SiteOutcome::Overlap { overlap, group }
        }
    };

    Ok(SiteReport {
        site: site.site.clone(),
        histograms,
        outcome,
    })
}

/// Write a site's output files into the configured directory.
pub fn write_outputs(config: &RunConfig, report: &SiteReport) -> Result<()> {
    if let Some(group) = report.group() {
        write_group(&config.group_path(report.site.number), group)?;
    }
    if config.write_hypsometry {
        let overlap_bands: &[usize] = match &report.outcome {
            SiteOutcome::Overlap { overlap, .. } => overlap.bands(),
            SiteOutcome::NoOverlap => &[],
        };
        write_hypsometry(
            &config.hypsometry_path(report.site.number),
            report.histogram_refs(),
            overlap_bands,
        )?;
    }
    Ok(())
}

/// Catalog, load and analyse every site, writing outputs as each site
/// completes. `on_site` sees every report in site order.
pub fn run<F>(config: &RunConfig, mut on_site: F) -> Result<Vec<SiteReport>>
where
    F: FnMut(&SiteReport),
{
    let catalog = catalog_sites(config)?;
    let sites = load_sites(&catalog)?;
    let layout = band_layout(&sites, config.domain_max)?;

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    let mut reports = Vec::with_capacity(sites.len());
    for site in &sites {
        debug!("{} is '{}'", site.site, site.site.label);
        let report = analyze_site(&layout, site).with_context(|| format!("analysing {}", site.site))?;
        write_outputs(config, &report)?;
        on_site(&report);
        reports.push(report);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogMode;
    use crate::data::model::{CategoryTable, PointRecord};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write_table(dir: &Path, name: &str, rows: &[(i64, i64, f64)]) {
        let mut text = String::from("ObjectID,StreamID,Long,Lat,Elevation\n");
        for (object_id, stream_id, elevation) in rows {
            text.push_str(&format!("{object_id},{stream_id},-105.5,40.25,{elevation}\n"));
        }
        fs::write(dir.join(name), text).unwrap();
    }

    fn group_ids(path: &Path) -> Vec<(i64, i64, f64)> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader
            .deserialize::<PointRecord>()
            .map(|r| {
                let r = r.unwrap();
                (r.object_id, r.stream_id, r.elevation)
            })
            .collect()
    }

    #[test]
    fn end_to_end_single_site() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_table(
            input.path(),
            "site01_carbonate.csv",
            &[(1, 1, 55.0), (2, 1, 60.0), (3, 2, 68.0), (4, 2, 74.0), (5, 2, 300.0)],
        );
        write_table(
            input.path(),
            "site01_felsic.csv",
            &[(1, 1, 65.0), (2, 1, 70.0), (3, 1, 85.0)],
        );
        write_table(
            input.path(),
            "site01_mafic.csv",
            &[(1, 1, 0.0), (2, 3, 62.0), (3, 3, 71.0)],
        );

        let config = RunConfig::new(input.path(), output.path());
        let mut lines = Vec::new();
        let reports = run(&config, |r| lines.push(r.diagnostic())).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(
            lines,
            vec!["Group 1: Suitable conditions between 60 m and 70 m elevation."]
        );
        assert_eq!(
            group_ids(&output.path().join("Group01.csv")),
            vec![
                (2, 1, 60.0),
                (3, 2, 68.0),
                (4, 3, 65.0),
                (5, 3, 70.0),
                (7, 6, 62.0),
            ]
        );
        assert!(!output.path().join("Group01_hypsometry.csv").exists());
    }

    #[test]
    fn site_without_overlap_writes_nothing() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_table(input.path(), "a_carbonate.csv", &[(1, 1, 100.0)]);
        write_table(input.path(), "a_felsic.csv", &[(1, 1, 100.0)]);
        write_table(input.path(), "a_mafic.csv", &[(1, 1, 500.0)]);
        write_table(input.path(), "b_carbonate.csv", &[(1, 1, 42.0)]);
        write_table(input.path(), "b_felsic.csv", &[(1, 1, 40.0)]);
        write_table(input.path(), "b_mafic.csv", &[(1, 1, 49.0)]);

        let mut config = RunConfig::new(input.path(), output.path().join("bands"));
        config.write_hypsometry = true;
        let reports = run(&config, |_| {}).unwrap();

        assert_eq!(reports[0].diagnostic(), "Group 1: No suitable locations found.");
        assert!(reports[0].group().is_none());
        assert!(!output.path().join("bands/Group01.csv").exists());
        assert!(output.path().join("bands/Group01_hypsometry.csv").exists());

        assert_eq!(
            reports[1].diagnostic(),
            "Group 2: Suitable conditions between 40 m and 40 m elevation."
        );
        assert_eq!(group_ids(&output.path().join("bands/Group02.csv")), vec![(1, 1, 40.0)]);
    }

    #[test]
    fn file_count_checked_before_processing() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_table(input.path(), "a_carbonate.csv", &[(1, 1, 100.0)]);
        write_table(input.path(), "a_felsic.csv", &[(1, 1, 100.0)]);

        let config = RunConfig::new(input.path(), output.path().join("out"));
        let err = run(&config, |_| {}).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::InputError>(),
            Some(crate::error::InputError::FileCount(2))
        ));
        assert!(!output.path().join("out").exists());
    }

    #[test]
    fn ordinal_mode_follows_listing_order() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_table(input.path(), "1.csv", &[(1, 1, 75.0)]);
        write_table(input.path(), "2.csv", &[(1, 1, 71.0)]);
        write_table(input.path(), "3.csv", &[(1, 1, 79.0)]);

        let mut config = RunConfig::new(input.path(), output.path());
        config.mode = CatalogMode::Ordinal;
        let reports = run(&config, |_| {}).unwrap();
        assert_eq!(
            reports[0].diagnostic(),
            "Group 1: Suitable conditions between 70 m and 70 m elevation."
        );
        // Band starts bound the selection, so nothing above 70 m is kept.
        assert!(reports[0].group().unwrap().is_empty());
    }

    #[test]
    fn fixed_domain_rejects_high_points() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_table(input.path(), "x_carbonate.csv", &[(1, 1, 4600.0)]);
        write_table(input.path(), "x_felsic.csv", &[(1, 1, 100.0)]);
        write_table(input.path(), "x_mafic.csv", &[(1, 1, 100.0)]);

        let mut config = RunConfig::new(input.path(), output.path());
        config.domain_max = Some(crate::config::LEGACY_DOMAIN_MAX);
        let err = run(&config, |_| {}).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BinError>(),
            Some(BinError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn layout_is_shared_across_sites() {
        let table = |category: RockCategory, elevation: f64| CategoryTable {
            category,
            source: PathBuf::from("t.csv"),
            records: vec![PointRecord {
                object_id: 1,
                stream_id: 1,
                longitude: 0.0,
                latitude: 0.0,
                elevation,
            }],
        };
        let site = |number: usize, elevation: f64| SiteTables {
            site: SiteId {
                number,
                label: number.to_string(),
            },
            tables: [
                table(RockCategory::Carbonate, elevation),
                table(RockCategory::Felsic, elevation),
                table(RockCategory::Mafic, elevation),
            ],
        };
        let sites = vec![site(1, 120.0), site(2, 3055.0)];

        let layout = band_layout(&sites, None).unwrap();
        assert_eq!(layout.band_count(), 306);
        let low = analyze_site(&layout, &sites[0]).unwrap();
        let high = analyze_site(&layout, &sites[1]).unwrap();
        assert_eq!(low.histograms[0].band_count(), high.histograms[2].band_count());
        assert_eq!(
            low.diagnostic(),
            "Group 1: Suitable conditions between 120 m and 120 m elevation."
        );
    }
}
