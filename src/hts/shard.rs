use std::fmt::Display;

use rust_htslib::bam::{FetchDefinition, HeaderView};

/// Largest position htslib accepts in a region query.
const HTS_POS_MAX: i64 = ((i32::MAX as i64) << 32) | i32::MAX as i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShardRegion {
    /// Records whose alignment start lies in `[start, end)` of reference `tid`.
    Mapped { tid: i32, start: i64, end: i64 },
    /// Unmapped records without a reference position.
    Unmapped,
}

/// A unit of work: one window of one reference, or the unplaced unmapped reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Shard {
    pub(crate) ordinal: usize,
    pub(crate) region: ShardRegion,
}

impl Shard {
    pub(crate) fn fetch_definition(&self) -> FetchDefinition<'static> {
        match self.region {
            ShardRegion::Mapped { tid, start, end } => {
                FetchDefinition::Region(tid, start, end.min(HTS_POS_MAX))
            }
            ShardRegion::Unmapped => FetchDefinition::Unmapped,
        }
    }

    /// A fetched record belongs to exactly one shard: the one holding its start position.
    pub(crate) fn owns(&self, tid: i32, pos: i64) -> bool {
        match self.region {
            ShardRegion::Mapped {
                tid: shard_tid,
                start,
                end,
            } => tid == shard_tid && start <= pos && pos < end,
            ShardRegion::Unmapped => tid < 0,
        }
    }
}

impl Display for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.region {
            ShardRegion::Mapped { tid, start, end } => {
                write!(f, "shard {} ({}:{}-{})", self.ordinal, tid, start, end)
            }
            ShardRegion::Unmapped => write!(f, "shard {} (unmapped)", self.ordinal),
        }
    }
}

/// Splits every reference into windows of `shard_size` bases and maps positions back to them.
#[derive(Debug, Clone)]
pub(crate) struct ShardIndex {
    shard_size: i64,
    /// Ordinal of the first shard of each reference.
    first_shard: Vec<usize>,
    /// Number of shards of each reference.
    shard_count: Vec<usize>,
    shards: Vec<Shard>,
}

impl ShardIndex {
    pub(crate) fn new(header: &HeaderView, shard_size: i64) -> Self {
        let lengths = (0..header.target_count())
            .map(|tid| header.target_len(tid).unwrap_or(0) as i64)
            .collect::<Vec<_>>();

        Self::from_lengths(&lengths, shard_size)
    }

    pub(crate) fn from_lengths(lengths: &[i64], shard_size: i64) -> Self {
        let shard_size = shard_size.max(1);
        let mut shards = Vec::new();
        let mut first_shard = Vec::with_capacity(lengths.len());
        let mut shard_count = Vec::with_capacity(lengths.len());

        for (tid, &len) in lengths.iter().enumerate() {
            first_shard.push(shards.len());

            let n = (len / shard_size + (len % shard_size != 0) as i64).max(1);
            for i in 0..n {
                let start = i * shard_size;
                // the last window also takes anything placed past the reference end
                let end = if i == n - 1 {
                    i64::MAX
                } else {
                    start + shard_size
                };
                shards.push(Shard {
                    ordinal: shards.len(),
                    region: ShardRegion::Mapped {
                        tid: tid as i32,
                        start,
                        end,
                    },
                });
            }
            shard_count.push(n as usize);
        }

        shards.push(Shard {
            ordinal: shards.len(),
            region: ShardRegion::Unmapped,
        });

        Self {
            shard_size,
            first_shard,
            shard_count,
            shards,
        }
    }

    pub(crate) fn shards(&self) -> &[Shard] {
        &self.shards
    }

    pub(crate) fn len(&self) -> usize {
        self.shards.len()
    }

    /// Shard holding `pos` of reference `tid`, clamped to the reference's first and last shard.
    /// Positions without a reference go to the unmapped shard.
    pub(crate) fn shard_for(&self, tid: i32, pos: i64) -> usize {
        let tid = match usize::try_from(tid) {
            Ok(t) if t < self.first_shard.len() => t,
            _ => return self.shards.len() - 1,
        };

        let window = (pos.max(0) / self.shard_size) as usize;
        self.first_shard[tid] + window.min(self.shard_count[tid] - 1)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn windows_cover_references() {
        let index = ShardIndex::from_lengths(&[250, 100], 100);

        assert_eq!(index.len(), 5);
        assert_eq!(
            index.shards()[1].region,
            ShardRegion::Mapped {
                tid: 0,
                start: 100,
                end: 200
            }
        );
        assert_eq!(
            index.shards()[2].region,
            ShardRegion::Mapped {
                tid: 0,
                start: 200,
                end: i64::MAX
            }
        );
        assert_eq!(index.shards()[4].region, ShardRegion::Unmapped);
    }

    #[test]
    fn positions_map_to_owning_shard() {
        let index = ShardIndex::from_lengths(&[250, 100], 100);

        assert_eq!(index.shard_for(0, 0), 0);
        assert_eq!(index.shard_for(0, 199), 1);
        assert_eq!(index.shard_for(0, 200), 2);
        assert_eq!(index.shard_for(1, 5), 3);
        assert_eq!(index.shard_for(-1, -1), 4);

        for s in index.shards() {
            assert_eq!(s.owns(0, 150), index.shard_for(0, 150) == s.ordinal);
        }
    }

    #[test]
    fn clipped_positions_are_clamped() {
        let index = ShardIndex::from_lengths(&[250, 100], 100);

        // unclipped 5' positions may fall before the reference start or after its end
        assert_eq!(index.shard_for(0, -20), 0);
        assert_eq!(index.shard_for(0, 900), 2);
        assert_eq!(index.shard_for(7, 10), 4);
    }

    #[test]
    fn empty_reference_still_has_a_shard() {
        let index = ShardIndex::from_lengths(&[0], 100);

        assert_eq!(index.len(), 2);
        assert_eq!(index.shard_for(0, 0), 0);
    }

    #[test]
    fn huge_shard_size_gives_one_shard_per_reference() {
        let index = ShardIndex::from_lengths(&[250, i64::MAX], i64::MAX);

        assert_eq!(index.len(), 3);
        assert_eq!(index.shard_for(0, 200), 0);
        assert_eq!(index.shard_for(1, i64::MAX - 1), 1);
    }
}
