use thiserror::Error as ErrorDerive;

#[derive(ErrorDerive, Debug)]
pub(crate) enum Error {
    #[error("Invalid UTF8 encountered when parsing read name.")]
    InvalidUTF8ReadName,

    #[error("Could not parse name: {name}, {reason}")]
    MalformedReadName { name: String, reason: String },

    /// More than two primary records share one template name.
    #[error("Tried to add third read {name} (flags={flags}) to read pair")]
    DuplicateTemplateCollision { name: String, flags: u16 },

    #[error("Invalid auxiliary tag code {0:?}. A tag must be [A-Za-z][A-Za-z0-9].")]
    InvalidTag(String),

    #[error(transparent)]
    Htslib(#[from] rust_htslib::errors::Error),
}

impl Error {
    pub(crate) fn template_collision(name: &[u8], flags: u16) -> Self {
        Self::DuplicateTemplateCollision {
            name: String::from_utf8_lossy(name).into_owned(),
            flags,
        }
    }

    pub(crate) fn malformed_read_name(name: &str, reason: impl ToString) -> Self {
        Self::MalformedReadName {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}
