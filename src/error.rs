use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("{0}")]
    Argument(String),

    #[error("invalid bundle magic")]
    InvalidMagic,

    #[error("unsupported bundle version: {0}")]
    UnsupportedVersion(u32),

    #[error("invalid bundle platform: 0x{0:08X}")]
    InvalidPlatform(u32),

    #[error("resource entry {index}: {reason}")]
    EntryValidation { index: usize, reason: String },

    #[error("{0}")]
    Sidecar(String),

    #[error("zlib compression failed: {0}")]
    Compression(String),

    #[error("zlib decompression failed: {0}")]
    Decompression(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sidecar parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl BundleError {
    /// Process exit status for this error kind.
    ///
    /// 2 = bundle magic/platform/version invalid, 3 = entry validation
    /// failed, 1 = everything else (arguments, sidecar, I/O).
    pub fn exit_code(&self) -> i32 {
        match self {
            BundleError::InvalidMagic
            | BundleError::UnsupportedVersion(_)
            | BundleError::InvalidPlatform(_) => 2,
            BundleError::EntryValidation { .. } => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, BundleError>;
