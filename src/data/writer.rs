use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use super::model::OutputGroup;
use crate::config::GROUP_HEADER;
use crate::hypsometry::binner::ElevationHistogram;

const HYPSOMETRY_HEADER: [&str; 5] = ["BandMin", "Carbonate", "Felsic", "Mafic", "Overlap"];

/// One band of a site's hypsometry table.
#[derive(Debug, Serialize)]
struct HypsometryRow {
    #[serde(rename = "BandMin")]
    band_min: f64,
    #[serde(rename = "Carbonate")]
    carbonate: u32,
    #[serde(rename = "Felsic")]
    felsic: u32,
    #[serde(rename = "Mafic")]
    mafic: u32,
    #[serde(rename = "Overlap")]
    overlap: bool,
}

/// Write a merged group as `ObjectID,StreamID,Long,Lat,Elevation` rows.
///
/// The header is written even when the group has no records.
pub fn write_group(path: &Path, group: &OutputGroup) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(GROUP_HEADER)?;
    for record in &group.records {
        writer.serialize(record)?;
    }
    writer
        .flush()
        .with_context(|| format!("writing {}", path.display()))?;

    info!("Wrote {} points to {}", group.len(), path.display());
    Ok(())
}

/// Write the band counts of a site's three histograms, one row per band
/// in which any category has points.
pub fn write_hypsometry(
    path: &Path,
    histograms: [&ElevationHistogram; 3],
    overlap_bands: &[usize],
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(HYPSOMETRY_HEADER)?;

    let [carbonate, felsic, mafic] = histograms;
    let band_width = carbonate.band_width();

    let occupied: BTreeSet<usize> = histograms
        .into_iter()
        .flat_map(|hist| hist.occupied_bands())
        .collect();
    for band in occupied {
        writer.serialize(HypsometryRow {
            band_min: band as f64 * band_width,
            carbonate: carbonate.count(band),
            felsic: felsic.count(band),
            mafic: mafic.count(band),
            overlap: overlap_bands.binary_search(&band).is_ok(),
        })?;
    }
    writer
        .flush()
        .with_context(|| format!("writing {}", path.display()))?;

    info!("Wrote hypsometry table {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::PointRecord;
    use crate::hypsometry::binner::BandLayout;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn writes_group_rows_with_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Group01.csv");
        let group = OutputGroup {
            records: vec![PointRecord {
                object_id: 13,
                stream_id: 4,
                longitude: -105.25,
                latitude: 40.5,
                elevation: 62.0,
            }],
            block_lengths: [0, 1, 0],
        };

        write_group(&path, &group).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["ObjectID,StreamID,Long,Lat,Elevation", "13,4,-105.25,40.5,62.0"]);
    }

    #[test]
    fn empty_group_still_has_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Group02.csv");
        let group = OutputGroup {
            records: Vec::new(),
            block_lengths: [0; 3],
        };
        write_group(&path, &group).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim_end(),
            "ObjectID,StreamID,Long,Lat,Elevation"
        );
    }

    #[test]
    fn hypsometry_lists_occupied_bands() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Group01_hypsometry.csv");
        let layout = BandLayout::fixed(100.0).unwrap();
        let c = layout.bin([15.0, 25.0]).unwrap();
        let f = layout.bin([25.0, 26.0]).unwrap();
        let m = layout.bin([25.0, 45.0]).unwrap();

        write_hypsometry(&path, [&c, &f, &m], &[2]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "BandMin,Carbonate,Felsic,Mafic,Overlap",
                "10.0,1,0,0,false",
                "20.0,1,2,1,true",
                "40.0,0,0,1,false",
            ]
        );
    }

    #[test]
    fn hypsometry_rows_follow_band_order_across_categories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Group03_hypsometry.csv");
        let layout = BandLayout::covering(90.0).unwrap();
        let c = layout.bin([75.0, 0.0]).unwrap();
        let f = layout.bin([5.0, 75.0]).unwrap();
        let m = layout.bin([0.0]).unwrap();

        write_hypsometry(&path, [&c, &f, &m], &[]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "BandMin,Carbonate,Felsic,Mafic,Overlap",
                "0.0,0,1,0,false",
                "70.0,1,1,0,false",
            ]
        );
    }

    #[test]
    fn hypsometry_of_site_without_points_has_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Group04_hypsometry.csv");
        let layout = BandLayout::fixed(100.0).unwrap();
        let empty = layout.bin([0.0, 0.0]).unwrap();

        write_hypsometry(&path, [&empty, &empty, &empty], &[]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim_end(),
            "BandMin,Carbonate,Felsic,Mafic,Overlap"
        );
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("Group01.csv");
        let group = OutputGroup {
            records: Vec::new(),
            block_lengths: [0; 3],
        };
        assert!(write_group(&path, &group).is_err());
    }
}
