use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    ZeroParameter(&'static str),
    BlockSizeNotPowerOfTwo(u64),
    UnevenGeometry { size: u64, block_size: u64, assoc: u64 },
    SetsNotPowerOfTwo(u64),
    GeometryOverflow { what: &'static str, lhs: u64, rhs: u64 },
    UnknownProtocol(String),
    UnknownProcessor { proc: usize, num_procs: usize },
    Trace { line: usize, reason: String },
    Io(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ZeroParameter(what) => write!(f, "{what} must be non-zero"),
            Error::BlockSizeNotPowerOfTwo(b) => write!(f, "block size {b} is not a power of two"),
            Error::UnevenGeometry { size, block_size, assoc } => write!(
                f,
                "cache size {size} is not a multiple of block size {block_size} x associativity {assoc}"
            ),
            Error::SetsNotPowerOfTwo(sets) => write!(f, "number of sets {sets} is not a power of two"),
            Error::GeometryOverflow { what, lhs, rhs } => {
                write!(f, "{what} overflows: {lhs} x {rhs}")
            }
            Error::UnknownProtocol(p) => write!(f, "unknown coherence protocol `{p}`"),
            Error::UnknownProcessor { proc, num_procs } => {
                write!(f, "processor {proc} out of range (system has {num_procs})")
            }
            Error::Trace { line, reason } => write!(f, "trace line {line}: {reason}"),
            Error::Io(e) => write!(f, "i/o error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
