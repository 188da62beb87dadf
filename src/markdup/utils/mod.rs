pub(crate) mod distant_mates;
pub(crate) mod duplicate_entry;
pub(crate) mod duplicate_key;
pub(crate) mod library_id_generator;
pub(crate) mod physical_location;
pub(crate) mod read_name_parser;
pub(crate) mod read_pair;
