use rust_htslib::bam::Record;

use crate::hts::{flags, record_ext::RecordExt};

use super::read_pair::ReadPair;

/// Strand layout of a fragment. Single reads are `F`/`R`; pairs are written as the strands of
/// their two reads in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum Orientation {
    F,
    R,
    FF,
    FR,
    RF,
    RR,
}

impl Orientation {
    pub(crate) fn single(negative_strand: bool) -> Self {
        if negative_strand {
            Orientation::R
        } else {
            Orientation::F
        }
    }

    pub(crate) fn pair(first_negative_strand: bool, second_negative_strand: bool) -> Self {
        match (first_negative_strand, second_negative_strand) {
            (false, false) => Orientation::FF,
            (false, true) => Orientation::FR,
            (true, false) => Orientation::RF,
            (true, true) => Orientation::RR,
        }
    }
}

/// A completed read pair with global file indices.
pub(crate) struct IndexedPair {
    pub(crate) left: Record,
    pub(crate) right: Record,
    pub(crate) left_file_idx: u64,
    pub(crate) right_file_idx: u64,
}

/// An unpaired or mate-unmapped read with its global file index.
pub(crate) struct IndexedSingle {
    pub(crate) read: Record,
    pub(crate) file_idx: u64,
}

/// A unit that takes part in duplicate comparison.
pub(crate) enum DuplicateEntry {
    Pair(IndexedPair),
    Single(IndexedSingle),
}

impl DuplicateEntry {
    /// Converts an assembled pair; a pair without mate becomes a single entry.
    pub(crate) fn from_read_pair(pair: ReadPair) -> Self {
        match pair.right {
            Some(right) => DuplicateEntry::Pair(IndexedPair {
                left: pair.left,
                right,
                left_file_idx: pair.left_file_idx,
                right_file_idx: pair.right_file_idx,
            }),
            None => DuplicateEntry::Single(IndexedSingle {
                read: pair.left,
                file_idx: pair.left_file_idx,
            }),
        }
    }

    /// The file index that defines this entry: the left read's for pairs.
    pub(crate) fn file_idx(&self) -> u64 {
        match self {
            DuplicateEntry::Pair(p) => p.left_file_idx,
            DuplicateEntry::Single(s) => s.file_idx,
        }
    }

    /// The left read of a pair, or the single read.
    pub(crate) fn first_record(&self) -> &Record {
        match self {
            DuplicateEntry::Pair(p) => &p.left,
            DuplicateEntry::Single(s) => &s.read,
        }
    }

    pub(crate) fn records(&self) -> Vec<&Record> {
        match self {
            DuplicateEntry::Pair(p) => vec![&p.left, &p.right],
            DuplicateEntry::Single(s) => vec![&s.read],
        }
    }

    pub(crate) fn records_mut(&mut self) -> Vec<&mut Record> {
        match self {
            DuplicateEntry::Pair(p) => vec![&mut p.left, &mut p.right],
            DuplicateEntry::Single(s) => vec![&mut s.read],
        }
    }

    pub(crate) fn is_pair(&self) -> bool {
        matches!(self, DuplicateEntry::Pair(_))
    }

    /// Strands of the left and right read.
    pub(crate) fn orientation(&self) -> Orientation {
        match self {
            DuplicateEntry::Pair(p) => Orientation::pair(p.left.is_reverse(), p.right.is_reverse()),
            DuplicateEntry::Single(s) => Orientation::single(s.read.is_reverse()),
        }
    }

    /// Strands of read 1 and read 2, regardless of which one is left. Two duplicates can only
    /// come from the same cluster when their first reads were sequenced on the same strand.
    pub(crate) fn r1_r2_orientation(&self) -> Orientation {
        match self {
            DuplicateEntry::Pair(p) => {
                let (r1, r2) = if p.left.flags() & flags::LAST_IN_TEMPLATE != 0 {
                    (&p.right, &p.left)
                } else {
                    (&p.left, &p.right)
                };
                Orientation::pair(r1.is_reverse(), r2.is_reverse())
            }
            DuplicateEntry::Single(s) => Orientation::single(s.read.is_reverse()),
        }
    }

    /// 5' unclipped positions of the entry's ends, `(tid, pos)`.
    pub(crate) fn five_prime_ends(&self) -> ((i32, i64), Option<(i32, i64)>) {
        match self {
            DuplicateEntry::Pair(p) => (
                (p.left.tid(), p.left.unclipped_five_prime_position()),
                Some((p.right.tid(), p.right.unclipped_five_prime_position())),
            ),
            DuplicateEntry::Single(s) => ((s.read.tid(), s.read.unclipped_five_prime_position()), None),
        }
    }

    pub(crate) fn into_records(self) -> Vec<(u64, Record)> {
        match self {
            DuplicateEntry::Pair(p) => vec![(p.left_file_idx, p.left), (p.right_file_idx, p.right)],
            DuplicateEntry::Single(s) => vec![(s.file_idx, s.read)],
        }
    }
}
