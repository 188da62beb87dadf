use std::fmt;

use rust_htslib::bam::Record;

use crate::{hts::record_ext::RecordExt, utils::errors::Error};

/**
 * One or two reads of a template, ordered by unclipped 5' position.
 *
 * While only one read has been seen it lives in `left` and `right` is `None`. When the mate
 * arrives the two are ordered by (reference id, unclipped 5' position, file index), so `left`
 * may be swapped out for the mate. Mate-unmapped and unpaired reads stay single.
 *
 * File indices are shard-local while the pair waits for a mate from another shard; the
 * distant-mate resolver rewrites them to global indices before the pair is completed.
 */
pub(crate) struct ReadPair {
    pub(crate) left: Record,
    pub(crate) right: Option<Record>,

    pub(crate) left_file_idx: u64,
    pub(crate) right_file_idx: u64,
}

impl ReadPair {
    pub(crate) fn new(read: Record, file_idx: u64) -> Self {
        Self {
            left: read,
            right: None,
            left_file_idx: file_idx,
            right_file_idx: 0,
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.right.is_some()
    }

    /// Shifts the file indices by a shard's global offset.
    pub(crate) fn offset_file_idx(&mut self, offset: u64) {
        self.left_file_idx += offset;
        if self.right.is_some() {
            self.right_file_idx += offset;
        }
    }

    /// Completes the pair with `new_read`, swapping it into `left` if it sorts first.
    pub(crate) fn add_read(&mut self, new_read: Record, file_idx: u64) -> Result<(), Error> {
        if self.right.is_some() {
            return Err(Error::template_collision(new_read.qname(), new_read.flags()));
        }

        if sort_key(&new_read, file_idx) < sort_key(&self.left, self.left_file_idx) {
            let old_left = std::mem::replace(&mut self.left, new_read);
            self.right = Some(old_left);
            self.right_file_idx = self.left_file_idx;
            self.left_file_idx = file_idx;
        } else {
            self.right = Some(new_read);
            self.right_file_idx = file_idx;
        }

        Ok(())
    }

    /// Consumes the pair, yielding each record with its file index.
    pub(crate) fn into_records(self) -> impl Iterator<Item = (u64, Record)> {
        let right_file_idx = self.right_file_idx;
        std::iter::once((self.left_file_idx, self.left))
            .chain(self.right.map(|r| (right_file_idx, r)))
    }
}

fn sort_key(rec: &Record, file_idx: u64) -> (i32, i64, u64) {
    (rec.tid(), rec.unclipped_five_prime_position(), file_idx)
}

impl fmt::Display for ReadPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{})",
            self.left.tid(),
            self.left.pos(),
            self.left_file_idx
        )?;
        match self.right {
            Some(ref r) => write!(f, "({},{},{})", r.tid(), r.pos(), self.right_file_idx),
            None => write!(f, "(-)"),
        }
    }
}
