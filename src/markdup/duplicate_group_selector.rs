use std::cmp::Reverse;

use macro_sup::set_mlog;
use rust_htslib::bam::record::Aux;

use crate::{
    hts::{
        duplicate_scoring_strategy::DuplicateScoringStrategy, flags, parse_tag, SAMTag,
    },
    utils::errors::Error,
};

use super::{
    metrics::MetricsCollection,
    optical::{add_optical_distances, find_optical_duplicates},
    opts::MarkDuplicatesOpts,
    utils::{
        duplicate_entry::DuplicateEntry, duplicate_key::DuplicateKey,
        library_id_generator::LibraryIdGenerator,
    },
};

set_mlog!(stringify!(DuplicateGroupSelector));

/// What happens to one entry of a duplicate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Primary,
    Duplicate { optical: bool },
}

struct GroupDecision {
    members: Vec<usize>,
    marks: Vec<Mark>,
    primary_file_idx: u64,
}

/**
 * Groups entries by their duplicate key and flags every member of a group except the
 * best-scoring one.
 */
pub(crate) struct DuplicateGroupSelector<'a> {
    opts: &'a MarkDuplicatesOpts,
    libraries: &'a LibraryIdGenerator,
}

impl<'a> DuplicateGroupSelector<'a> {
    pub(crate) fn new(opts: &'a MarkDuplicatesOpts, libraries: &'a LibraryIdGenerator) -> Self {
        Self { opts, libraries }
    }

    /// Marks the duplicates among `entries` in place and records what it saw into `metrics`.
    pub(crate) fn mark(
        &self,
        entries: &mut [DuplicateEntry],
        metrics: &mut MetricsCollection,
    ) -> Result<(), Error> {
        let mut keyed = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (DuplicateKey::of(e, self.libraries), e.file_idx(), i))
            .collect::<Vec<_>>();
        keyed.sort_unstable();

        let mut decisions = Vec::new();
        for group in keyed.chunk_by(|a, b| a.0 == b.0) {
            let key = &group[0].0;
            let members = group.iter().map(|(_, _, i)| *i).collect::<Vec<_>>();

            let library = metrics.library_mut(key.library_id);
            if key.is_paired() {
                library.read_pairs_examined += members.len() as u64;
            } else {
                library.unpaired_reads_examined += members.len() as u64;
            }

            if members.len() > 1 {
                decisions.push(self.decide(entries, members, metrics)?);
            }
        }

        mlog::debug!(
            "{} entries, {} duplicate groups",
            entries.len(),
            decisions.len()
        );

        for decision in decisions {
            self.apply(entries, &decision, metrics)?;
        }

        Ok(())
    }

    fn decide(
        &self,
        entries: &[DuplicateEntry],
        members: Vec<usize>,
        metrics: &mut MetricsCollection,
    ) -> Result<GroupDecision, Error> {
        let group = members.iter().map(|&i| &entries[i]).collect::<Vec<_>>();

        let primary = group
            .iter()
            .enumerate()
            .max_by_key(|(_, e)| {
                (
                    DuplicateScoringStrategy::compute_fragment_score(
                        e.records(),
                        self.opts.scoring_strategy,
                    ),
                    Reverse(e.file_idx()),
                )
            })
            .map(|(i, _)| i)
            .unwrap_or(0);

        let paired = group[0].is_pair();
        let optical = match self.opts.optical_distance {
            Some(d) if paired => find_optical_duplicates(&group, primary, d)?,
            _ => vec![false; group.len()],
        };

        if paired {
            add_optical_distances(self.opts, &group, metrics)?;
        }
        metrics.add_duplicate_set(group.len());

        let marks = (0..group.len())
            .map(|i| {
                if i == primary {
                    Mark::Primary
                } else {
                    Mark::Duplicate { optical: optical[i] }
                }
            })
            .collect();

        Ok(GroupDecision {
            primary_file_idx: group[primary].file_idx(),
            members,
            marks,
        })
    }

    fn apply(
        &self,
        entries: &mut [DuplicateEntry],
        decision: &GroupDecision,
        metrics: &mut MetricsCollection,
    ) -> Result<(), Error> {
        let group_size = decision.members.len() as i32;
        let primary_file_idx = decision.primary_file_idx.to_string();

        for (&i, mark) in decision.members.iter().zip(decision.marks.iter()) {
            let entry = &mut entries[i];

            if let Mark::Duplicate { optical } = mark {
                let library = metrics.library_mut(self.libraries.get_library_id(entry.first_record()));
                if entry.is_pair() {
                    library.read_pair_duplicates += 1;
                    if *optical {
                        library.read_pair_optical_duplicates += 1;
                    }
                } else {
                    library.unpaired_read_duplicates += 1;
                }
            }

            for rec in entry.records_mut() {
                if let Mark::Duplicate { .. } = mark {
                    rec.set_flags(rec.flags() | flags::DUPLICATE);
                }

                if self.opts.tag_duplicates {
                    rec.push_aux(&parse_tag(SAMTag::DI.name())?, Aux::String(&primary_file_idx))?;
                    rec.push_aux(&parse_tag(SAMTag::DS.name())?, Aux::I32(group_size))?;
                    if let Mark::Duplicate { optical } = mark {
                        let kind = if *optical { "SQ" } else { "LB" };
                        rec.push_aux(&parse_tag(SAMTag::DT.name())?, Aux::String(kind))?;
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use rust_htslib::bam::Record;

    use super::*;
    use crate::{
        hts::duplicate_scoring_strategy::ScoringStrategy,
        markdup::utils::read_pair::ReadPair,
        tests::{pair_with_qual, with_read_group, RecordBuilder},
    };

    fn pair_entry(name: &str, file_idx: u64, pos1: i64, pos2: i64, qual: u8) -> DuplicateEntry {
        entry_of(pair_with_qual(name, 0, pos1, pos2, qual), file_idx)
    }

    fn entry_of((r1, r2): (Record, Record), file_idx: u64) -> DuplicateEntry {
        let mut p = ReadPair::new(r1, file_idx);
        p.add_read(r2, file_idx + 1).unwrap();
        DuplicateEntry::from_read_pair(p)
    }

    fn single_entry(name: &str, file_idx: u64, pos: i64) -> DuplicateEntry {
        let rec = RecordBuilder::new(name).pos(0, pos).build();
        DuplicateEntry::from_read_pair(ReadPair::new(rec, file_idx))
    }

    fn duplicates(entries: &[DuplicateEntry]) -> Vec<bool> {
        entries
            .iter()
            .map(|e| {
                let flags = e.records().iter().map(|r| r.is_duplicate()).collect::<Vec<_>>();
                assert!(flags.iter().all(|f| *f == flags[0]), "mates disagree");
                flags[0]
            })
            .collect()
    }

    #[test]
    fn highest_score_is_primary() {
        let opts = MarkDuplicatesOpts::default();
        let libs = LibraryIdGenerator::default();
        let mut entries = vec![
            pair_entry("a", 0, 100, 300, 20),
            pair_entry("b", 2, 100, 300, 40),
            pair_entry("c", 4, 100, 300, 30),
            pair_entry("d", 6, 500, 700, 30),
        ];
        let mut metrics = MetricsCollection::default();

        DuplicateGroupSelector::new(&opts, &libs)
            .mark(&mut entries, &mut metrics)
            .unwrap();

        assert_eq!(duplicates(&entries), vec![true, false, true, false]);

        let rows = metrics.library_metrics(&libs);
        assert_eq!(rows[0].read_pairs_examined, 4);
        assert_eq!(rows[0].read_pair_duplicates, 2);
    }

    #[test]
    fn ties_go_to_lowest_file_index() {
        let opts = MarkDuplicatesOpts::default();
        let libs = LibraryIdGenerator::default();
        let mut entries = vec![
            pair_entry("b", 8, 100, 300, 30),
            pair_entry("a", 2, 100, 300, 30),
            pair_entry("c", 4, 100, 300, 30),
        ];
        let mut metrics = MetricsCollection::default();

        DuplicateGroupSelector::new(&opts, &libs)
            .mark(&mut entries, &mut metrics)
            .unwrap();

        assert_eq!(duplicates(&entries), vec![true, false, true]);
    }

    #[test]
    fn singles_and_pairs_are_separate() {
        let opts = MarkDuplicatesOpts::default();
        let libs = LibraryIdGenerator::default();
        let mut entries = vec![
            pair_entry("p", 0, 100, 300, 30),
            single_entry("s1", 2, 100),
            single_entry("s2", 3, 100),
        ];
        let mut metrics = MetricsCollection::default();

        DuplicateGroupSelector::new(&opts, &libs)
            .mark(&mut entries, &mut metrics)
            .unwrap();

        assert_eq!(duplicates(&entries), vec![false, false, true]);

        let rows = metrics.library_metrics(&libs);
        assert_eq!(rows[0].unpaired_reads_examined, 2);
        assert_eq!(rows[0].unpaired_read_duplicates, 1);
        assert_eq!(rows[0].read_pair_duplicates, 0);
    }

    #[test]
    fn tags_and_optical_classification() {
        let opts = MarkDuplicatesOpts {
            tag_duplicates: true,
            optical_distance: Some(100),
            scoring_strategy: ScoringStrategy::SumOfBaseQualities,
            ..Default::default()
        };
        let libs = LibraryIdGenerator::default();
        let mut entries = vec![
            pair_entry("i:1:1101:1000:1000", 10, 100, 300, 40),
            pair_entry("i:1:1101:1010:1000", 12, 100, 300, 30),
            pair_entry("i:1:1101:9000:9000", 14, 100, 300, 30),
        ];
        let mut metrics = MetricsCollection::default();

        DuplicateGroupSelector::new(&opts, &libs)
            .mark(&mut entries, &mut metrics)
            .unwrap();

        assert_eq!(duplicates(&entries), vec![false, true, true]);

        let tag = |e: &DuplicateEntry, t: &[u8]| -> Option<String> {
            match e.first_record().aux(t) {
                Ok(Aux::String(s)) => Some(s.to_string()),
                Ok(Aux::I32(v)) => Some(v.to_string()),
                _ => None,
            }
        };
        for e in entries.iter() {
            assert_eq!(tag(e, b"DI").as_deref(), Some("10"));
            assert_eq!(tag(e, b"DS").as_deref(), Some("3"));
        }
        assert_eq!(tag(&entries[0], b"DT"), None);
        assert_eq!(tag(&entries[1], b"DT").as_deref(), Some("SQ"));
        assert_eq!(tag(&entries[2], b"DT").as_deref(), Some("LB"));

        let rows = metrics.library_metrics(&libs);
        assert_eq!(rows[0].read_pair_optical_duplicates, 1);
    }

    #[test]
    fn mate_unmapped_reads_never_group_with_pairs() {
        let opts = MarkDuplicatesOpts::default();
        let libs = LibraryIdGenerator::default();
        let mate_unmapped = RecordBuilder::new("m")
            .pos(0, 100)
            .mate_unmapped(true)
            .qual(40)
            .build();
        let mut entries = vec![
            pair_entry("p", 0, 100, 300, 30),
            DuplicateEntry::from_read_pair(ReadPair::new(mate_unmapped, 2)),
        ];
        let mut metrics = MetricsCollection::default();

        DuplicateGroupSelector::new(&opts, &libs)
            .mark(&mut entries, &mut metrics)
            .unwrap();

        assert_eq!(duplicates(&entries), vec![false, false]);

        let rows = metrics.library_metrics(&libs);
        assert_eq!(rows[0].read_pairs_examined, 1);
        assert_eq!(rows[0].unpaired_reads_examined, 1);
    }

    #[test]
    fn libraries_are_compared_separately() {
        let opts = MarkDuplicatesOpts::default();
        let mut libs = LibraryIdGenerator::default();
        libs.add_read_group("rg1", "libA");
        libs.add_read_group("rg2", "libB");

        let mut entries = vec![
            entry_of(with_read_group(pair_with_qual("a", 0, 100, 300, 30), "rg1"), 0),
            entry_of(with_read_group(pair_with_qual("b", 0, 100, 300, 30), "rg2"), 2),
            entry_of(with_read_group(pair_with_qual("c", 0, 100, 300, 20), "rg1"), 4),
        ];
        let mut metrics = MetricsCollection::default();

        DuplicateGroupSelector::new(&opts, &libs)
            .mark(&mut entries, &mut metrics)
            .unwrap();

        // only the second libA copy is a duplicate
        assert_eq!(duplicates(&entries), vec![false, false, true]);

        let rows = metrics.library_metrics(&libs);
        let lib_a = rows.iter().find(|r| r.library == "libA").unwrap();
        let lib_b = rows.iter().find(|r| r.library == "libB").unwrap();
        assert_eq!((lib_a.read_pairs_examined, lib_a.read_pair_duplicates), (2, 1));
        assert_eq!((lib_b.read_pairs_examined, lib_b.read_pair_duplicates), (1, 0));
    }
}
