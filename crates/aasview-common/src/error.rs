// error.rs — errors raised while decoding or walking an AAS file

use std::fmt;

use thiserror::Error;

use crate::aasfiles::LumpType;

pub type AasResult<T> = Result<T, AasError>;

/// Why a face's edges failed to chain into a single closed loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopFault {
    /// Two edges leave the same vertex.
    DuplicateVertex(i32),
    /// No edge leaves this vertex.
    BrokenChain(i32),
    /// The walk returned to its start before visiting every edge.
    ClosedEarly,
    /// The walk visited every edge without returning to its start.
    NotClosed,
}

impl fmt::Display for LoopFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopFault::DuplicateVertex(v) => write!(f, "two edges leave vertex {}", v),
            LoopFault::BrokenChain(v) => write!(f, "no edge leaves vertex {}", v),
            LoopFault::ClosedEarly => f.write_str("loop closes before using every edge"),
            LoopFault::NotClosed => f.write_str("edges do not close into a loop"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AasError {
    #[error("not a recognized file: bad magic {found:?}")]
    BadMagic { found: [u8; 4] },

    #[error("unsupported version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("file too short: need {needed} bytes, have {len}")]
    Truncated { needed: usize, len: usize },

    #[error("{lump} lump ({size} bytes at offset {offset}) lies outside the {len}-byte file")]
    LumpOutOfBounds {
        lump: LumpType,
        offset: u32,
        size: u32,
        len: usize,
    },

    #[error("face {face}: {fault}")]
    BadFaceLoop { face: i32, fault: LoopFault },

    #[error("face {face} is out of range ({count} faces)")]
    FaceOutOfRange { face: i32, count: usize },

    #[error("edge {edge} is out of range ({count} edges)")]
    EdgeOutOfRange { edge: i32, count: usize },

    #[error("vertex {vertex} is out of range ({count} vertexes)")]
    VertexOutOfRange { vertex: i32, count: usize },
}

impl AasError {
    /// Bad magic, wrong version or a header that does not fit.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            AasError::BadMagic { .. } | AasError::UnsupportedVersion { .. } | AasError::Truncated { .. }
        )
    }

    pub fn is_bounds_error(&self) -> bool {
        matches!(self, AasError::LumpOutOfBounds { .. })
    }

    pub fn is_topology_error(&self) -> bool {
        matches!(self, AasError::BadFaceLoop { .. })
    }
}
