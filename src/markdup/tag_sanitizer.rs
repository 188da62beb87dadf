use rust_htslib::bam::Record;

use crate::{
    hts::{flags, SAMTag},
    utils::errors::Error,
};

/// Clears the duplicate flag and drops the aux tags left over from an earlier duplicate
/// marking run. Other tags keep their order.
pub(crate) fn clear_dup_flag_tags(rec: &mut Record) -> Result<(), Error> {
    rec.set_flags(rec.flags() & !flags::DUPLICATE);

    for tag in SAMTag::DUPLICATE_TAGS.iter().map(|t| t.code()) {
        // a malformed record may carry the same tag more than once
        while rec.aux(tag).is_ok() {
            rec.remove_aux(tag)?;
        }
    }

    Ok(())
}
