pub(crate) mod duplicate_scoring_strategy;
pub(crate) mod header;
pub(crate) mod metrics;
pub(crate) mod record_ext;
pub(crate) mod shard;
pub(crate) mod utils;

use std::sync::OnceLock;

use regex::Regex;
use rust_htslib::bam::{Header, HeaderView};

use anyhow::{anyhow, Error};

use crate::utils::errors::Error as CoreError;

/// SAM flag bits used by duplicate marking.
pub(crate) mod flags {
    pub(crate) const PAIRED: u16 = 0x1;
    pub(crate) const UNMAPPED: u16 = 0x4;
    pub(crate) const MATE_UNMAPPED: u16 = 0x8;
    pub(crate) const REVERSE: u16 = 0x10;
    pub(crate) const MATE_REVERSE: u16 = 0x20;
    pub(crate) const FIRST_IN_TEMPLATE: u16 = 0x40;
    pub(crate) const LAST_IN_TEMPLATE: u16 = 0x80;
    pub(crate) const SECONDARY: u16 = 0x100;
    pub(crate) const QC_FAIL: u16 = 0x200;
    pub(crate) const DUPLICATE: u16 = 0x400;
    pub(crate) const SUPPLEMENTARY: u16 = 0x800;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SAMTag {
    RG,
    /// Duplicate set index.
    DI,
    /// Duplicate set size.
    DS,
    /// Duplicate type, `LB` (library/PCR) or `SQ` (sequencing/optical).
    DT,
    DU,
}

impl SAMTag {
    /// Tags written by a previous duplicate marking pass.
    pub(crate) const DUPLICATE_TAGS: [SAMTag; 4] = [SAMTag::DI, SAMTag::DS, SAMTag::DT, SAMTag::DU];

    pub(crate) fn name(&self) -> &'static str {
        match self {
            SAMTag::RG => "RG",
            SAMTag::DI => "DI",
            SAMTag::DS => "DS",
            SAMTag::DT => "DT",
            SAMTag::DU => "DU",
        }
    }

    pub(crate) fn code(&self) -> &'static [u8] {
        self.name().as_bytes()
    }
}

fn tag_pattern() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]$").unwrap())
}

/// Validates a two character aux tag code.
pub(crate) fn parse_tag(code: &str) -> Result<[u8; 2], CoreError> {
    if !tag_pattern().is_match(code) {
        return Err(CoreError::InvalidTag(code.to_string()));
    }

    let b = code.as_bytes();
    Ok([b[0], b[1]])
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SortOrder {
    Unknown,
    Unsorted,
    QueryName,
    Coordinate,
}

impl SortOrder {
    pub(crate) fn from_str(s: &str) -> Result<Self, Error> {
        let v = match s {
            "unknown" => Self::Unknown,
            "unsorted" => Self::Unsorted,
            "queryname" => Self::QueryName,
            "coordinate" => Self::Coordinate,
            _ => Err(anyhow!("Invalid value: {}", s))?,
        };

        Ok(v)
    }

    /// Reads `@HD SO`. A header without it is `Unknown`.
    pub(crate) fn from_header(h: &HeaderView) -> Result<Self, Error> {
        let header_map = Header::from_template(h).to_hashmap();

        let so = header_map
            .get("HD")
            .and_then(|records| records.first())
            .and_then(|hd| hd.get("SO"));

        match so {
            Some(s) => SortOrder::from_str(s),
            None => Ok(SortOrder::Unknown),
        }
    }
}
