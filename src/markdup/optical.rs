use std::collections::BTreeMap;

use rand::{seq::SliceRandom, SeedableRng};
use rand_xorshift::XorShiftRng;

use crate::{
    hts::record_ext::RecordExt,
    utils::errors::Error,
};

use super::{
    metrics::MetricsCollection,
    opts::MarkDuplicatesOpts,
    utils::{
        duplicate_entry::{DuplicateEntry, Orientation},
        physical_location::{optical_distance, PhysicalLocation},
        read_name_parser::parse_location,
    },
};

/// Entries whose clusters may be compared: same lane, same read group and the same strands for
/// read 1 and read 2.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct OpticalKey {
    lane: String,
    read_group: String,
    read_group_found: bool,
    orientation: Orientation,
}

impl OpticalKey {
    fn of(entry: &DuplicateEntry, location: &PhysicalLocation) -> Self {
        let read_group = entry.first_record().read_group();

        Self {
            lane: location.lane.clone(),
            read_group: read_group.unwrap_or_default().to_string(),
            read_group_found: read_group.is_some(),
            orientation: entry.r1_r2_orientation(),
        }
    }
}

/// Flow-cell location of an entry, parsed from its read name.
pub(crate) fn locate(entry: &DuplicateEntry) -> Result<PhysicalLocation, Error> {
    parse_location(entry.first_record().qname_str()?)
}

/// Shuffles `items` in place with a Fisher-Yates shuffle seeded by `seed`.
pub(crate) fn sample_order<T>(items: &mut [T], seed: u64) {
    let mut rng = XorShiftRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
}

/**
 * Adds the optical distances between the read pairs of a duplicate group to the histogram.
 *
 * Entries are ordered by file index first. With a non-negative `optical_histogram_max` the
 * group is then shuffled, seeded with the lowest file index, and only the first
 * `optical_histogram_max` entries of each bucket are compared, so the sample is random but
 * reproducible.
 */
pub(crate) fn add_optical_distances(
    opts: &MarkDuplicatesOpts,
    group: &[&DuplicateEntry],
    metrics: &mut MetricsCollection,
) -> Result<(), Error> {
    if !opts.optical_histogram_enabled() || group.len() < 2 {
        return Ok(());
    }

    let mut duplicates = group.to_vec();
    duplicates.sort_by_key(|e| e.file_idx());

    if opts.optical_histogram_max >= 0 {
        let seed = duplicates[0].file_idx();
        sample_order(&mut duplicates, seed);
    }

    let mut buckets: BTreeMap<OpticalKey, Vec<PhysicalLocation>> = BTreeMap::new();
    for dup in duplicates.iter() {
        let location = locate(dup)?;
        buckets
            .entry(OpticalKey::of(dup, &location))
            .or_default()
            .push(location);
    }

    let limit = if opts.optical_histogram_max < 0 {
        usize::MAX
    } else {
        opts.optical_histogram_max as usize
    };

    for locations in buckets.values() {
        let sampled = &locations[..locations.len().min(limit)];
        for (i, a) in sampled.iter().enumerate() {
            for b in sampled[i + 1..].iter() {
                metrics.add_distance(duplicates.len(), optical_distance(a, b));
            }
        }
    }

    Ok(())
}

/**
 * Finds the optical duplicates of a duplicate group.
 *
 * An entry other than the primary is an optical duplicate when another entry of the group was
 * imaged on the same tile, with the same optical key, within `max_distance` of it. Returns one
 * flag per entry of `group`, in order.
 */
pub(crate) fn find_optical_duplicates(
    group: &[&DuplicateEntry],
    primary: usize,
    max_distance: i32,
) -> Result<Vec<bool>, Error> {
    let located = group
        .iter()
        .map(|e| locate(e).map(|loc| (OpticalKey::of(e, &loc), loc)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut optical = vec![false; group.len()];
    for (i, (key_i, loc_i)) in located.iter().enumerate() {
        if i == primary {
            continue;
        }

        optical[i] = located.iter().enumerate().any(|(j, (key_j, loc_j))| {
            i != j
                && key_i == key_j
                && loc_i.same_tile(loc_j)
                && optical_distance(loc_i, loc_j) <= max_distance
        });
    }

    Ok(optical)
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use rust_htslib::bam::Record;

    use super::*;
    use crate::{
        markdup::utils::read_pair::ReadPair,
        tests::{pair, with_read_group, RecordBuilder},
    };

    fn entry_of((r1, r2): (Record, Record), file_idx: u64) -> DuplicateEntry {
        let mut p = ReadPair::new(r1, file_idx);
        p.add_read(r2, file_idx + 1).unwrap();
        DuplicateEntry::from_read_pair(p)
    }

    fn entry(name: &str, file_idx: u64) -> DuplicateEntry {
        entry_of(pair(name, 0, 100, 300), file_idx)
    }

    /// Same ends as `entry`, but read 1 is the reverse read at 300.
    fn swapped_entry(name: &str, file_idx: u64) -> DuplicateEntry {
        let r1 = RecordBuilder::new(name)
            .pos(0, 300)
            .mate(0, 100, true)
            .reverse()
            .build();
        let r2 = RecordBuilder::new(name)
            .pos(0, 100)
            .mate(0, 300, false)
            .mate_reverse()
            .build();
        entry_of((r1, r2), file_idx)
    }

    fn distances_between(a: DuplicateEntry, b: DuplicateEntry) -> usize {
        let entries = [a, b];
        let group = entries.iter().collect::<Vec<_>>();
        let mut metrics = MetricsCollection::default();
        add_optical_distances(&opts(-1), &group, &mut metrics).unwrap();
        histogram(&metrics).len()
    }

    fn opts(max: i64) -> MarkDuplicatesOpts {
        MarkDuplicatesOpts {
            optical_histogram: Some(PathBuf::from("h.tsv")),
            optical_histogram_max: max,
            ..Default::default()
        }
    }

    fn histogram(metrics: &MetricsCollection) -> Vec<((i32, i32), f64)> {
        metrics
            .optical_distances()
            .bins()
            .map(|b| (b.get_id(), b.get_value()))
            .collect()
    }

    #[test]
    fn shuffle_is_reproducible() {
        let mut a = (0..20).collect::<Vec<_>>();
        let mut b = a.clone();
        sample_order(&mut a, 7);
        sample_order(&mut b, 7);

        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn all_pairs_without_cap() {
        let entries = [
            entry("i:1:1101:0:0", 0),
            entry("i:1:1101:3:4", 2),
            entry("i:1:1101:6:8", 4),
        ];
        let group = entries.iter().collect::<Vec<_>>();
        let mut metrics = MetricsCollection::default();

        add_optical_distances(&opts(-1), &group, &mut metrics).unwrap();

        assert_eq!(
            histogram(&metrics),
            vec![((3, 5), 2.0), ((3, 10), 1.0)]
        );
    }

    #[test]
    fn lanes_are_separate_buckets() {
        let entries = [
            entry("i:1:1101:0:0", 0),
            entry("i:2:1101:3:4", 2),
        ];
        let group = entries.iter().collect::<Vec<_>>();
        let mut metrics = MetricsCollection::default();

        add_optical_distances(&opts(-1), &group, &mut metrics).unwrap();

        assert!(metrics.optical_distances().is_empty());
    }

    #[test]
    fn read_groups_are_separate_buckets() {
        let in_group = |name, idx, rg| entry_of(with_read_group(pair(name, 0, 100, 300), rg), idx);

        assert_eq!(
            distances_between(in_group("i:1:1101:0:0", 0, "a"), in_group("i:1:1101:3:4", 2, "a")),
            1
        );
        assert_eq!(
            distances_between(in_group("i:1:1101:0:0", 0, "a"), in_group("i:1:1101:3:4", 2, "b")),
            0
        );
    }

    #[test]
    fn missing_read_group_differs_from_empty_one() {
        let empty_group = entry_of(with_read_group(pair("i:1:1101:0:0", 0, 100, 300), ""), 0);

        assert_eq!(distances_between(empty_group, entry("i:1:1101:3:4", 2)), 0);
        assert_eq!(distances_between(entry("i:1:1101:0:0", 0), entry("i:1:1101:3:4", 2)), 1);
    }

    #[test]
    fn read_one_strand_separates_buckets() {
        let fr = entry("i:1:1101:0:0", 0);
        let rf = swapped_entry("i:1:1101:3:4", 2);
        assert_eq!(fr.orientation(), rf.orientation());
        assert_eq!(fr.r1_r2_orientation(), Orientation::FR);
        assert_eq!(rf.r1_r2_orientation(), Orientation::RF);

        assert_eq!(distances_between(fr, rf), 0);
        assert_eq!(
            distances_between(swapped_entry("i:1:1101:0:0", 0), swapped_entry("i:1:1101:3:4", 2)),
            1
        );
    }

    #[test]
    fn capped_sample_is_deterministic() {
        let names = [
            "i:1:1101:0:0",
            "i:1:1101:100:0",
            "i:1:1101:0:300",
            "i:1:1101:700:0",
            "i:1:1101:0:1100",
        ];
        let run = |order: &[usize]| {
            let entries = order
                .iter()
                .map(|&i| entry(names[i], 10 + 2 * i as u64))
                .collect::<Vec<_>>();
            let group = entries.iter().collect::<Vec<_>>();
            let mut metrics = MetricsCollection::default();
            add_optical_distances(&opts(2), &group, &mut metrics).unwrap();
            histogram(&metrics)
        };

        let first = run(&[0, 1, 2, 3, 4]);
        // a cap of 2 compares exactly one pair, keyed by the full group size
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].0 .0, 5);
        assert_eq!(first[0].1, 1.0);

        for _ in 0..5 {
            assert_eq!(run(&[0, 1, 2, 3, 4]), first);
        }
        // input order does not matter either
        assert_eq!(run(&[4, 2, 0, 3, 1]), first);
    }

    #[test]
    fn disabled_histogram_skips_parsing() {
        let entries = [entry("not-illumina", 0), entry("also-not", 2)];
        let group = entries.iter().collect::<Vec<_>>();
        let mut metrics = MetricsCollection::default();

        add_optical_distances(&MarkDuplicatesOpts::default(), &group, &mut metrics).unwrap();
        assert!(metrics.optical_distances().is_empty());
    }

    #[test]
    fn malformed_names_are_fatal() {
        let entries = [entry("not-illumina", 0), entry("i:1:1101:3:4", 2)];
        let group = entries.iter().collect::<Vec<_>>();
        let mut metrics = MetricsCollection::default();

        assert!(matches!(
            add_optical_distances(&opts(-1), &group, &mut metrics),
            Err(Error::MalformedReadName { .. })
        ));
    }

    #[test]
    fn optical_duplicates_need_same_tile_and_distance() {
        let entries = [
            entry("i:1:1101:1000:1000", 0),
            entry("i:1:1101:1050:1000", 2),
            entry("i:1:1102:1000:1000", 4),
            entry("i:1:1101:9000:9000", 6),
        ];
        let group = entries.iter().collect::<Vec<_>>();

        let optical = find_optical_duplicates(&group, 0, 100).unwrap();

        assert_eq!(optical, vec![false, true, false, false]);
    }
}
