use rust_htslib::bam::{record::Aux, Record};

use crate::utils::errors::Error;

use super::SAMTag;

/// Alignment coordinate helpers that `rust_htslib::bam::Record` does not provide directly.
pub(crate) trait RecordExt {
    /// 0-based start of the alignment including leading soft and hard clips.
    fn unclipped_start(&self) -> i64;

    /// 0-based, inclusive end of the alignment including trailing soft and hard clips.
    fn unclipped_end(&self) -> i64;

    /// The unclipped position of the 5' end of the read: the unclipped start for forward reads,
    /// the unclipped end for reverse reads.
    fn unclipped_five_prime_position(&self) -> i64 {
        if self.is_reverse_strand() {
            self.unclipped_end()
        } else {
            self.unclipped_start()
        }
    }

    fn is_reverse_strand(&self) -> bool;

    /// `RG` tag value, if present and a string.
    fn read_group(&self) -> Option<&str>;

    fn qname_str(&self) -> Result<&str, Error>;
}

impl RecordExt for Record {
    fn unclipped_start(&self) -> i64 {
        let cigar = self.cigar();
        self.pos() - cigar.leading_softclips() - cigar.leading_hardclips()
    }

    fn unclipped_end(&self) -> i64 {
        let cigar = self.cigar();
        // `end_pos` is exclusive.
        cigar.end_pos() - 1 + cigar.trailing_softclips() + cigar.trailing_hardclips()
    }

    fn is_reverse_strand(&self) -> bool {
        self.is_reverse()
    }

    fn read_group(&self) -> Option<&str> {
        match self.aux(SAMTag::RG.code()) {
            Ok(Aux::String(rg)) => Some(rg),
            _ => None,
        }
    }

    fn qname_str(&self) -> Result<&str, Error> {
        std::str::from_utf8(self.qname()).map_err(|_| Error::InvalidUTF8ReadName)
    }
}
