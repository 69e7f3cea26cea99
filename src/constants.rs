// RMSD cutoff for accepting a ring-atom fit against the standard base geometry
pub const NT_CUTOFF: f64 = 0.2618;

// Frames whose template fit is worse than this are discarded
pub const MAX_FRAME_RMS: f64 = 0.5;

// Base-origin separation window for a candidate pair
pub const MIN_DORG: f64 = 0.0;
pub const MAX_DORG: f64 = 15.0;

// Vertical (stacking direction) separation window
pub const MIN_DV: f64 = 0.0;
pub const MAX_DV: f64 = 2.5;

// Angle between the two base-plane normals, in degrees
pub const MIN_PLANE_ANGLE: f64 = 0.0;
pub const MAX_PLANE_ANGLE: f64 = 65.0;

// Glycosidic-nitrogen separation lower bound
pub const MIN_DNN: f64 = 4.5;
pub const MAX_DNN: f64 = f64::INFINITY;

// Donor-acceptor distance limits for hydrogen-bond enumeration
pub const HB_LOWER: f64 = 2.0;
pub const HB_DIST1: f64 = 4.0;

// A hydrogen bond inside this window is a good one
pub const HB_GOOD_LOWER: f64 = 2.5;
pub const HB_GOOD_UPPER: f64 = 3.5;

// Elements allowed to take part in hydrogen bonds
pub const HB_ATOMS: &str = ".O.N.";

// Minimum number of base hydrogen bonds for a valid pair
pub const MIN_BASE_HB: usize = 1;

// Projected ring overlap at or above this area means stacked, not paired
pub const MAX_OVERLAP: f64 = 0.01;

// O3'-P linkage upper bound for backbone continuity between steps
pub const HELIX_BREAK_DIST: f64 = 7.5;

// Quality bonus applied to canonical Watson-Crick geometry
pub const WC_QUALITY_BONUS: f64 = -2.0;

// Below this magnitude a hinge axis is treated as undefined (parallel normals)
pub const HINGE_EPS: f64 = 1.0e-9;

// Orthonormality tolerance for fitted orientation matrices
pub const ORTHO_TOL: f64 = 1.0e-6;

// Covalent-bond heuristics used when recognising amino-acid backbones
pub const BOND_DCRT: f64 = 2.0;

// Directory holding the standard base templates and the nucleotide registry
pub const DATA_DIR_ENV: &str = "BASEPAIR_DATA";
pub const DEFAULT_DATA_DIR: &str = "data";

// Registry of modified nucleotides inside the data directory
pub const REGISTRY_FILE: &str = "modified_nucleotides.json";
