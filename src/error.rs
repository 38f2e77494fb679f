use crate::bspfile::LumpType;
use thiserror::Error;
use zip::result::ZipError;

pub type BspResult<T> = Result<T, BspError>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BspError {
    #[error("file is too short to contain a bsp header")]
    InvalidHeader,
    #[error("file is a zip archive, not a bsp")]
    ArchiveFile,
    #[error("GoldSrc format maps are not supported")]
    GoldSrcFormat,
    #[error("unknown ident {0:#010x}")]
    UnknownIdent(u32),
    #[error("range {start}..{end} is out of bounds of a {len} byte buffer")]
    OutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("Invalid lump size, lump size {lump_size} is not a multiple of the element size {element_size}")]
    InvalidLumpSize {
        lump: LumpType,
        element_size: usize,
        lump_size: usize,
    },
    #[error("compressed lump is missing its LZMA magic")]
    MissingLzmaMagic,
    #[error("compressed lump is truncated, envelope states {stated} bytes but {available} follow")]
    TruncatedLzmaStream { stated: usize, available: usize },
    #[error("error while decompressing lump")]
    LumpDecompress(lzma_rs::error::Error),
    #[error("brush {brush} does not contain side {side}")]
    MalformedBrush { brush: usize, side: usize },
    #[error("io error while reading data: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed field found while parsing: {0:#}")]
    MalformedData(binrw::Error),
    #[error(transparent)]
    Zip(#[from] ZipError),
}

impl From<binrw::Error> for BspError {
    fn from(e: binrw::Error) -> Self {
        match e {
            binrw::Error::Io(e) => BspError::Io(e),
            e => BspError::MalformedData(e),
        }
    }
}

impl From<lzma_rs::error::Error> for BspError {
    fn from(e: lzma_rs::error::Error) -> Self {
        use lzma_rs::error::Error;

        match e {
            Error::IoError(e) => BspError::Io(e),
            e => BspError::LumpDecompress(e),
        }
    }
}
