use thiserror::Error;

use super::geometry::FitError;

/// Fatal pipeline failures. Per-residue and per-pair rejections are not
/// errors at this level; they are recorded and the run continues.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not read structure {path}: {reason}")]
    Structure { path: String, reason: String },
    #[error("could not read nucleotide registry {path}: {reason}")]
    Registry { path: String, reason: String },
    #[error("could not load base template {name}: {reason}")]
    Template { name: String, reason: String },
    #[error("pair selection cancelled after {iterations} iterations")]
    Cancelled { iterations: usize },
    #[error("internal invariant violated: {0}")]
    InvariantViolated(String),
}

/// Why a residue was not recognised as a nucleotide. Recoverable: the
/// residue is excluded from pairing and the pipeline continues.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassificationRejection {
    #[error("only {0} ring atoms matched, need at least 3")]
    TooFewRingAtoms(usize),
    #[error("no C1' sugar carbon, not a nucleotide")]
    MissingSugarCarbon,
    #[error("ring fit rms {rms:.4} above cutoff {cutoff:.4}")]
    RingFit { rms: f64, cutoff: f64 },
    #[error("amino-acid backbone geometry")]
    AminoAcid,
    #[error("template fit rms {rms:.4} above template tolerance {tolerance:.4}")]
    FrameFit { rms: f64, tolerance: f64 },
    #[error("template fit degenerate: {0}")]
    FrameFitDegenerate(FitError),
    #[error("no recognisable nucleotide geometry")]
    NotANucleotide,
}

/// Why a candidate pair failed validation. Recoverable: recorded in
/// diagnostics when requested, pairing continues.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PairRejection {
    #[error("residue {0} has no reference frame")]
    MissingFrame(usize),
    #[error("origin distance {0:.2} outside window")]
    OriginDistance(f64),
    #[error("vertical separation {0:.2} outside window")]
    VerticalDistance(f64),
    #[error("plane angle {0:.2} outside window")]
    PlaneAngle(f64),
    #[error("glycosidic nitrogen distance {0:.2} outside window")]
    NNDistance(f64),
    #[error("glycosidic nitrogen missing on residue {0}")]
    MissingNitrogen(usize),
    #[error("{found} base hydrogen bonds, need {needed}")]
    TooFewHydrogenBonds { found: usize, needed: usize },
    #[error("projected ring overlap {0:.3}, bases are stacked")]
    RingOverlap(f64),
}
