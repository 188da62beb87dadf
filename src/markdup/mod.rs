pub(crate) mod duplicate_group_selector;
pub(crate) mod markduplicates;
pub(crate) mod metrics;
pub(crate) mod optical;
pub(crate) mod opts;
pub(crate) mod tag_sanitizer;
pub(crate) mod utils;
