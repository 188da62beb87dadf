use std::collections::HashMap;

use rust_htslib::bam::{Header, HeaderView, Record};

use crate::hts::record_ext::RecordExt;

/// Maps records to a small integer library id through their read group's `LB` field.
///
/// All ids are assigned up front from the header so the generator can be shared read-only
/// between shard workers.
pub(crate) struct LibraryIdGenerator {
    read_group_library_ids: HashMap<String, i16>, // from read group id to library id
    library_names: Vec<String>,                    // indexed by library id
}

impl Default for LibraryIdGenerator {
    fn default() -> Self {
        Self {
            read_group_library_ids: HashMap::new(),
            library_names: vec![Self::UNKNOWN_LIBRARY.to_string()],
        }
    }
}

impl LibraryIdGenerator {
    pub(crate) const UNKNOWN_LIBRARY: &'static str = "Unknown Library";
    pub(crate) const UNKNOWN_LIBRARY_ID: i16 = 0;

    pub(crate) fn new(header: &HeaderView) -> Self {
        let mut generator = Self::default();

        let header_map = Header::from_template(header).to_hashmap();
        if let Some(read_groups) = header_map.get("RG") {
            for rg in read_groups {
                let Some(id) = rg.get("ID") else {
                    continue;
                };
                let library = rg
                    .get("LB")
                    .map(|lb| lb.as_str())
                    .unwrap_or(Self::UNKNOWN_LIBRARY);

                generator.add_read_group(id, library);
            }
        }

        generator
    }

    /// Registers a read group, assigning a new id the first time a library is seen.
    pub(crate) fn add_read_group(&mut self, read_group: &str, library: &str) -> i16 {
        let library_id = match self.library_names.iter().position(|l| l == library) {
            Some(id) => id as i16,
            None => {
                self.library_names.push(library.to_string());
                (self.library_names.len() - 1) as i16
            }
        };

        self.read_group_library_ids
            .insert(read_group.to_string(), library_id);

        library_id
    }

    /**
     * Gets the library id for the record. If the RG tag is not present on the record, or the
     * read group has no library, the unknown library id is returned.
     */
    pub(crate) fn get_library_id(&self, rec: &Record) -> i16 {
        rec.read_group()
            .and_then(|rg| self.read_group_library_ids.get(rg))
            .copied()
            .unwrap_or(Self::UNKNOWN_LIBRARY_ID)
    }

    pub(crate) fn library_name(&self, library_id: i16) -> &str {
        self.library_names
            .get(library_id as usize)
            .map(|s| s.as_str())
            .unwrap_or(Self::UNKNOWN_LIBRARY)
    }
}
