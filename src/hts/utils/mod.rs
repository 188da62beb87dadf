pub(crate) mod histogram;
pub(crate) mod murmur3;
