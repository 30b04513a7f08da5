//! # Driftcert Kernel
//!
//! Turns two materialized configuration trees (golden and candidate) into
//! precisely located deltas. Everything here is pure and deterministic:
//! identical snapshots give identical deltas, in identical order.
//!
//! This crate does not judge deltas. Risk classification, policy tagging
//! and scoring live downstream.
//!
//! ## Architecture
//!
//! ```text
//! Snapshot              ← relative path → (bytes, content hash)
//!     │
//! StructuralDiff        ← added / removed / modified / renamed paths
//!     │
//! NormalizedFile        ← canonical tree, manifest, text or binary
//!     │
//! FileDiff              ← key-level deltas + dependency deltas
//!     │
//! Detector              ← category refinement (profile, pipeline, image)
//!     │
//! DriftReport           ← `detect_drift`: all of the above in one call
//! ```

pub mod binary;
pub mod delta;
pub mod descriptors;
pub mod detectors;
pub mod drift;
pub mod error;
pub mod formats;
pub mod hash;
pub mod hunks;
pub mod locator;
pub mod manifest;
pub mod normalize;
pub mod semantic;
pub mod snapshot;
pub mod structural;
pub mod tree;

pub use delta::{Category, ChangeType, Delta, DependencyDelta, Ecosystem, PolicyTag, RiskLevel};
pub use detectors::{
    Detector, apply_detectors, default_detectors, is_production_profile, merge_by_id,
};
pub use drift::{DriftReport, Side, UnparseableFile, detect_drift};
pub use error::{KernelError, ParseError};
pub use hash::{ContentHash, canonical_json_bytes};
pub use locator::{Locator, PathSegment};
pub use manifest::Manifest;
pub use normalize::{Content, FileFormat, NormalizedFile, normalize};
pub use semantic::{FileDiff, FilePair, diff_files, diff_pair};
pub use snapshot::{FileBlob, Snapshot};
pub use structural::{Rename, StructuralDiff, diff_structure};
pub use tree::Node;
