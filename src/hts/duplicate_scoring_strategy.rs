use std::{fmt::Display, sync::OnceLock};

use clap::ValueEnum;
use rust_htslib::bam::Record;

use super::utils::murmur3::Murmur3;

/// How the representative of a duplicate group is picked: highest score wins.
#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub(crate) enum ScoringStrategy {
    #[value(name = "SUM_OF_BASE_QUALITIES")]
    SumOfBaseQualities,
    #[value(name = "TOTAL_MAPPED_REFERENCE_LENGTH")]
    TotalMappedReferenceLength,
    #[value(name = "RANDOM")]
    Random,
}

impl Display for ScoringStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_possible_value() {
            Some(v) => write!(f, "{}", v.get_name()),
            None => std::fmt::Debug::fmt(self, f),
        }
    }
}

pub(crate) struct DuplicateScoringStrategy {}

impl DuplicateScoringStrategy {
    const MIN_BASE_QUALITY: u8 = 15;

    fn hasher() -> &'static Murmur3 {
        static MURMUR3: OnceLock<Murmur3> = OnceLock::new();
        MURMUR3.get_or_init(|| Murmur3::new(1))
    }

    /** Calculates a score for the read which is the sum of scores over Q15. */
    fn get_sum_of_base_qualities(rec: &Record) -> i32 {
        rec.qual()
            .iter()
            .copied()
            .filter(|b| *b >= Self::MIN_BASE_QUALITY)
            .map(|b| b as i32)
            .sum()
    }

    fn get_reference_length(rec: &Record) -> i64 {
        let cigar = rec.cigar();
        cigar.end_pos() - rec.pos()
    }

    pub(crate) fn compute_duplicate_score(rec: &Record, scoring_strategy: ScoringStrategy) -> i16 {
        let mut score = 0_i16;

        match scoring_strategy {
            ScoringStrategy::SumOfBaseQualities => {
                // two (very) long reads worth of high-quality bases can go over i16::MAX/2
                // and risk overflow.
                score += Self::get_sum_of_base_qualities(rec).min(i16::MAX as i32 / 2) as i16;
            }
            ScoringStrategy::TotalMappedReferenceLength => {
                if !rec.is_unmapped() {
                    score += Self::get_reference_length(rec).clamp(0, i16::MAX as i64 / 2) as i16;
                }
            }
            ScoringStrategy::Random => {
                // a number between 0 and i16::MAX/2, derived from the read name so that both
                // mates of a template get the same value.
                score += (Self::hasher().hash_bytes(rec.qname()) & 0b11_1111_1111_1111) as i16;
            }
        }

        // filter-failing records are heavily discounted. This can happen once per mate, which
        // stays within i16 since each score is at most i16::MAX/2.
        if rec.is_quality_check_failed() {
            score -= i16::MAX / 2;
        }

        score
    }

    /// Sum of the scores of all records of a fragment.
    pub(crate) fn compute_fragment_score<'r>(
        records: impl IntoIterator<Item = &'r Record>,
        scoring_strategy: ScoringStrategy,
    ) -> i32 {
        records
            .into_iter()
            .map(|r| Self::compute_duplicate_score(r, scoring_strategy) as i32)
            .sum()
    }
}
