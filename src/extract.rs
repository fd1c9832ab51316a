//! Group extraction: select each category's points inside the overlap range
//! and merge them into one block-ordered, renumbered group.

use log::debug;

use crate::data::filter::select_in_range;
use crate::data::model::{OutputGroup, PointRecord, RockCategory, SiteId, SiteTables};
use crate::error::ExtractError;
use crate::hypsometry::overlap::OverlapRange;

/// Running ID offsets applied to the next merged block.
///
/// Each value is the largest ID merged so far, so an empty block leaves
/// both offsets unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdOffsets {
    pub object_id: i64,
    pub stream_id: i64,
}

impl IdOffsets {
    /// Shift a block's IDs by the current offsets.
    ///
    /// Fails instead of wrapping when a shifted ID no longer fits in `i64`.
    pub fn apply(
        &self,
        block: &mut [PointRecord],
        site: &SiteId,
        category: RockCategory,
    ) -> Result<(), ExtractError> {
        let shift = |field: &'static str, id: i64, offset: i64| {
            id.checked_add(offset).ok_or_else(|| ExtractError::IdOverflow {
                site: site.to_string(),
                category,
                field,
                id,
                offset,
            })
        };
        for record in block {
            record.object_id = shift("objectID", record.object_id, self.object_id)?;
            record.stream_id = shift("streamID", record.stream_id, self.stream_id)?;
        }
        Ok(())
    }

    /// Raise the offsets to cover the IDs of an already shifted block.
    pub fn absorb(&mut self, block: &[PointRecord]) {
        for record in block {
            self.object_id = self.object_id.max(record.object_id);
            self.stream_id = self.stream_id.max(record.stream_id);
        }
    }
}

/// Build the output group of one site.
///
/// Blocks are merged Carbonate, Felsic, Mafic. Carbonate keeps its IDs;
/// every later block is shifted by the largest IDs merged before it.
pub fn extract_group(range: &OverlapRange, site: &SiteTables) -> Result<OutputGroup, ExtractError> {
    let mut offsets = IdOffsets::default();
    let mut records = Vec::new();
    let mut block_lengths = [0; 3];

    for category in RockCategory::ALL {
        let mut block = select_in_range(site.table(category), range);
        offsets.apply(&mut block, &site.site, category)?;
        offsets.absorb(&block);
        debug!(
            "{}: {} {} points in range, offsets now {:?}",
            site.site,
            block.len(),
            category,
            offsets
        );

        block_lengths[category.index()] = block.len();
        records.extend(block);
    }

    Ok(OutputGroup {
        records,
        block_lengths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CategoryTable;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn point(object_id: i64, stream_id: i64, elevation: f64) -> PointRecord {
        PointRecord {
            object_id,
            stream_id,
            longitude: -105.0,
            latitude: 40.0,
            elevation,
        }
    }

    fn site(carbonate: Vec<PointRecord>, felsic: Vec<PointRecord>, mafic: Vec<PointRecord>) -> SiteTables {
        let table = |category: RockCategory, records| CategoryTable {
            category,
            source: PathBuf::from(format!("{category}.csv")),
            records,
        };
        SiteTables {
            site: SiteId {
                number: 1,
                label: "test".to_string(),
            },
            tables: [
                table(RockCategory::Carbonate, carbonate),
                table(RockCategory::Felsic, felsic),
                table(RockCategory::Mafic, mafic),
            ],
        }
    }

    #[test]
    fn felsic_offset_by_carbonate_maximum() {
        let range = OverlapRange::new(6, 7, 10.0);
        let tables = site(
            vec![point(5, 2, 61.0), point(12, 3, 65.0), point(30, 9, 900.0)],
            vec![point(1, 1, 62.0), point(2, 1, 70.0)],
            vec![],
        );

        let group = extract_group(&range, &tables).unwrap();
        let felsic: Vec<i64> = group
            .block(RockCategory::Felsic)
            .iter()
            .map(|r| r.object_id)
            .collect();
        assert_eq!(felsic, vec![13, 14]);
        assert_eq!(group.block(RockCategory::Felsic)[0].stream_id, 4);
        assert!(group.block(RockCategory::Mafic).is_empty());
        assert_eq!(group.len(), 4);
    }

    #[test]
    fn offset_overflow_is_an_error() {
        let range = OverlapRange::new(6, 7, 10.0);
        let tables = site(
            vec![point(6_000_000_000_000_000_000, 1, 65.0)],
            vec![point(6_000_000_000_000_000_000, 1, 65.0)],
            vec![],
        );

        let err = extract_group(&range, &tables).unwrap_err();
        assert_eq!(
            err,
            ExtractError::IdOverflow {
                site: tables.site.to_string(),
                category: RockCategory::Felsic,
                field: "objectID",
                id: 6_000_000_000_000_000_000,
                offset: 6_000_000_000_000_000_000,
            }
        );
    }

    #[test]
    fn stream_offset_overflow_is_an_error() {
        let range = OverlapRange::new(6, 7, 10.0);
        let tables = site(
            vec![point(1, 1, 61.0)],
            vec![],
            vec![point(1, i64::MAX, 62.0)],
        );

        match extract_group(&range, &tables) {
            Err(ExtractError::IdOverflow { category, field, .. }) => {
                assert_eq!(category, RockCategory::Mafic);
                assert_eq!(field, "streamID");
            }
            other => panic!("expected IdOverflow, got {other:?}"),
        }
    }

    #[test]
    fn empty_block_keeps_prior_offsets() {
        let site_id = SiteId {
            number: 1,
            label: "test".to_string(),
        };
        let mut offsets = IdOffsets::default();
        let mut carbonate = vec![point(12, 4, 60.0)];
        offsets.apply(&mut carbonate, &site_id, RockCategory::Carbonate).unwrap();
        offsets.absorb(&carbonate);

        let mut felsic = vec![point(1, 1, 60.0), point(2, 2, 60.0)];
        offsets.apply(&mut felsic, &site_id, RockCategory::Felsic).unwrap();
        offsets.absorb(&felsic);
        assert_eq!(offsets, IdOffsets { object_id: 14, stream_id: 6 });

        offsets.absorb(&[]);
        assert_eq!(offsets.object_id, 14);
    }

    #[test]
    fn empty_middle_block_does_not_shift_mafic() {
        let range = OverlapRange::new(6, 7, 10.0);
        let tables = site(
            vec![point(3, 3, 60.0)],
            vec![point(1, 1, 500.0)],
            vec![point(1, 1, 66.0), point(2, 5, 67.0)],
        );

        let group = extract_group(&range, &tables).unwrap();
        assert_eq!(group.block_lengths, [1, 0, 2]);
        let mafic: Vec<(i64, i64)> = group
            .block(RockCategory::Mafic)
            .iter()
            .map(|r| (r.object_id, r.stream_id))
            .collect();
        assert_eq!(mafic, vec![(4, 4), (5, 8)]);
    }

    #[test]
    fn merged_object_ids_are_unique_and_block_ordered() {
        let range = OverlapRange::new(0, 100, 10.0);
        let tables = site(
            (1..=20).map(|i| point(i, i / 3, 100.0 + i as f64)).collect(),
            (1..=15).map(|i| point(i, i / 2, 200.0 + i as f64)).collect(),
            (1..=10).map(|i| point(i, i, 300.0 + i as f64)).collect(),
        );

        let group = extract_group(&range, &tables).unwrap();
        assert_eq!(group.len(), 45);

        let ids: HashSet<i64> = group.records.iter().map(|r| r.object_id).collect();
        assert_eq!(ids.len(), group.len());

        let max_of = |c| group.block(c).iter().map(|r: &PointRecord| r.object_id).max().unwrap();
        let min_of = |c| group.block(c).iter().map(|r: &PointRecord| r.object_id).min().unwrap();
        assert!(max_of(RockCategory::Carbonate) < min_of(RockCategory::Felsic));
        assert!(max_of(RockCategory::Felsic) < min_of(RockCategory::Mafic));
    }

    #[test]
    fn selection_keeps_table_order() {
        let range = OverlapRange::new(6, 7, 10.0);
        let tables = site(
            vec![point(9, 1, 69.0), point(2, 1, 61.0), point(4, 1, 75.0)],
            vec![],
            vec![],
        );
        let group = extract_group(&range, &tables).unwrap();
        let ids: Vec<i64> = group.records.iter().map(|r| r.object_id).collect();
        assert_eq!(ids, vec![9, 2]);
    }
}
