//! Decoder and navigability analysis for EAAS area awareness files.
//!
//! [`aasload`] turns the raw bytes into an [`AasFile`]; [`aasinfo`] derives
//! ground, portal and liquid face sets and the walk / fall / step links
//! between areas; [`aaspoly`] holds the polygon and adjacency queries both
//! the analyzer and a renderer need.

pub mod aas_shared;
pub mod aasfiles;
pub mod error;
pub mod aasload;
pub mod aaspoly;
pub mod aasinfo;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod testutil;

pub use aasinfo::{analyze, analyze_with, AnalysisConfig, AreaLink, ReachKind, ReachabilityInfo};
pub use aasload::{parse, AasFile};
pub use error::{AasError, AasResult};
