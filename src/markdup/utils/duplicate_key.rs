use super::{
    duplicate_entry::{DuplicateEntry, Orientation},
    library_id_generator::LibraryIdGenerator,
};

/// Fields two entries must share to be duplicates of one another.
///
/// Single entries carry `-1` for the second end, and their orientation is `F` or `R`, so they
/// never share a key with a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct DuplicateKey {
    pub(crate) library_id: i16,
    pub(crate) read1_reference_index: i32,
    pub(crate) read1_coordinate: i64,
    pub(crate) orientation: Orientation,
    pub(crate) read2_reference_index: i32,
    pub(crate) read2_coordinate: i64,
}

impl DuplicateKey {
    pub(crate) fn of(entry: &DuplicateEntry, libraries: &LibraryIdGenerator) -> Self {
        let ((tid1, pos1), end2) = entry.five_prime_ends();
        let (tid2, pos2) = end2.unwrap_or((-1, -1));

        Self {
            library_id: libraries.get_library_id(entry.first_record()),
            read1_reference_index: tid1,
            read1_coordinate: pos1,
            orientation: entry.orientation(),
            read2_reference_index: tid2,
            read2_coordinate: pos2,
        }
    }

    pub(crate) fn is_paired(&self) -> bool {
        self.read2_reference_index != -1
    }
}
