use serde::Serialize;

use super::constants::WC_QUALITY_BONUS;
use super::errors::PairRejection;
use super::geometry::angle_deg;
use super::hbond::{self, HBond};
use super::overlap;
use super::params::{bp_parameters, BpParameters};
use super::structure::{Frame, Structure};
use super::PairParams;

/// Pair classification. The legacy integer ids survive only at the output
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BpType {
    Invalid,
    PassedBasicChecks,
    Wobble,
    WatsonCrick,
}

impl BpType {
    pub fn legacy_id(&self) -> i32 {
        match self {
            BpType::Invalid => 0,
            BpType::PassedBasicChecks => -1,
            BpType::Wobble => 1,
            BpType::WatsonCrick => 2,
        }
    }
}

// Letter pairs eligible for the Watson-Crick branch; XX is the legacy
// wildcard for bases without a resolved letter.
const WC_LETTER_PAIRS: [&str; 9] = ["XX", "AT", "AU", "TA", "UA", "GC", "CG", "IC", "CI"];

/// Everything measured while validating one candidate pair.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    /// Canonical residue indices, i < j.
    pub i: usize,
    pub j: usize,
    /// Base letters of i and j, e.g. "CG".
    pub letters: String,
    pub dorg: f64,
    pub d_v: f64,
    pub dnn: f64,
    pub plane_angle: f64,
    pub overlap_area: f64,
    pub hbonds: Vec<HBond>,
    pub base_hb: usize,
    pub bp: BpParameters,
    pub bp_type: BpType,
    pub base_quality: f64,
    pub hbond_adjustment: f64,
    /// Final adjusted quality; lower is better.
    pub quality: f64,
    /// z_i . z_j < 0 on the original frames; the partner frame was
    /// reversed for the pair-frame construction.
    pub antiparallel: bool,
    /// Origin of the leading base, orientation of the pair mid frame.
    pub pair_frame: Frame,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.bp_type != BpType::Invalid
    }
}

fn fold_to_quadrant(angle: f64) -> f64 {
    if angle > 90.0 {
        180.0 - angle
    } else {
        angle
    }
}

/// Validate a candidate pair. The residues are taken in canonical order
/// (i < j) regardless of the argument order.
pub fn validate_pair(
    structure: &Structure,
    i: usize,
    j: usize,
    params: &PairParams,
) -> Result<ValidationResult, PairRejection> {
    let (i, j) = if i <= j { (i, j) } else { (j, i) };
    let res_i = structure.residue(i);
    let res_j = structure.residue(j);

    let frame_i = res_i.frame.ok_or(PairRejection::MissingFrame(i))?;
    let frame_j = res_j.frame.ok_or(PairRejection::MissingFrame(j))?;

    let d = frame_j.origin - frame_i.origin;
    let dorg = d.norm();
    if dorg < params.min_dorg || dorg > params.max_dorg {
        return Err(PairRejection::OriginDistance(dorg));
    }

    let antiparallel = frame_i.z().dot(frame_j.z()) < 0.0;
    let zj_aligned = if antiparallel { -frame_j.z() } else { frame_j.z() };
    let zm = (frame_i.z() + zj_aligned).normalized();
    let d_v = d.dot(zm).abs();
    if d_v < params.min_dv || d_v > params.max_dv {
        return Err(PairRejection::VerticalDistance(d_v));
    }

    let plane_angle = fold_to_quadrant(angle_deg(frame_i.z(), frame_j.z()));
    if plane_angle < params.min_plane_angle || plane_angle > params.max_plane_angle {
        return Err(PairRejection::PlaneAngle(plane_angle));
    }

    let n_i = res_i
        .glycosidic_nitrogen()
        .ok_or(PairRejection::MissingNitrogen(i))?;
    let n_j = res_j
        .glycosidic_nitrogen()
        .ok_or(PairRejection::MissingNitrogen(j))?;
    let dnn = n_i.coord.distance(n_j.coord);
    if dnn < params.min_dnn || dnn > params.max_dnn {
        return Err(PairRejection::NNDistance(dnn));
    }

    let hbonds = hbond::find_hbonds(res_i, res_j, params);
    let base_hb = hbond::base_bond_count(&hbonds);
    if base_hb < params.min_base_hb {
        return Err(PairRejection::TooFewHydrogenBonds {
            found: base_hb,
            needed: params.min_base_hb,
        });
    }

    let overlap_area = overlap::pair_overlap_area(res_i, res_j);
    if params.check_overlap && overlap_area >= params.max_overlap {
        return Err(PairRejection::RingOverlap(overlap_area));
    }

    let base_quality = dorg + 2.0 * d_v + plane_angle / 20.0;
    let hbond_adjustment = hbond::quality_adjustment(&hbonds, params);

    // Intra-pair parameters with the partner brought into the antiparallel
    // convention, arguments in the legacy reversed order.
    let fj_conv = if antiparallel { frame_j.reversed() } else { frame_j };
    let (bp, mid_frame) = bp_parameters(&fj_conv, &frame_i);

    let letter_i = res_i.base_letter().unwrap_or('X');
    let letter_j = res_j.base_letter().unwrap_or('X');
    let letters: String = [letter_i, letter_j].iter().collect();

    let mut bp_type = BpType::PassedBasicChecks;
    if bp.stretch.abs() <= 2.0 && bp.opening.abs() <= 60.0 {
        let shear = bp.shear.abs();
        if (1.8..=2.8).contains(&shear) {
            bp_type = BpType::Wobble;
        }
        if shear <= 1.8 && WC_LETTER_PAIRS.contains(&letters.as_str()) {
            bp_type = BpType::WatsonCrick;
        }
    }

    let wc_bonus = if bp_type == BpType::WatsonCrick {
        WC_QUALITY_BONUS
    } else {
        0.0
    };
    let quality = base_quality + hbond_adjustment + wc_bonus;

    Ok(ValidationResult {
        i,
        j,
        letters,
        dorg,
        d_v,
        dnn,
        plane_angle,
        overlap_area,
        hbonds,
        base_hb,
        bp,
        bp_type,
        base_quality,
        hbond_adjustment,
        quality,
        antiparallel,
        pair_frame: Frame::new(frame_i.origin, mid_frame.orientation),
    })
}
