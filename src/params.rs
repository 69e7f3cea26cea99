use serde::Serialize;

use super::constants::HINGE_EPS;
use super::geometry::{angle_deg, signed_angle_deg, Mat3};
use super::helix::{HelixItem, HelixOrdering};
use super::structure::Frame;

/// Six inter-base-pair step parameters plus the mid-step frame they were
/// measured in. Translations in Angstrom, rotations in degrees.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StepParameters {
    pub shift: f64,
    pub slide: f64,
    pub rise: f64,
    pub tilt: f64,
    pub roll: f64,
    pub twist: f64,
    pub mid_frame: Frame,
}

/// Intra-pair parameters between the two bases of one pair, computed with
/// the same construction as the step parameters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BpParameters {
    pub shear: f64,
    pub stretch: f64,
    pub stagger: f64,
    pub buckle: f64,
    pub propeller: f64,
    pub opening: f64,
}

/// Parameters referred to the local helical axis. Scalars the geometry
/// cannot define (near-zero twist, near-identity rotation) are None.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HelicalParameters {
    pub x_disp: Option<f64>,
    pub y_disp: Option<f64>,
    pub rise: Option<f64>,
    pub inclination: Option<f64>,
    pub tip: Option<f64>,
    pub twist: Option<f64>,
}

/// Signed half-angle construction: both frames are rotated about the hinge
/// (z1 x z2) by half the z-z angle so their z axes meet in the middle,
/// the mid frame bisects the rotated x axes, translations are read in the
/// mid frame and the hinge phase splits the z-z angle into tilt and roll.
fn cehs(f1: &Frame, f2: &Frame) -> ([f64; 6], Frame) {
    let z1 = f1.z();
    let z2 = f2.z();
    let hinge = z1.cross(z2);
    let rolltilt = angle_deg(z1, z2);

    let (t1, t2) = if hinge.norm() < HINGE_EPS {
        (f1.orientation, f2.orientation)
    } else {
        let axis = hinge.normalized();
        (
            Mat3::rotation(axis, 0.5 * rolltilt) * f1.orientation,
            Mat3::rotation(axis, -0.5 * rolltilt) * f2.orientation,
        )
    };

    let zm = (t1.col(2) + t2.col(2)).normalized();
    let xsum = t1.col(0) + t2.col(0);
    let xm = {
        let projected = xsum - zm * xsum.dot(zm);
        if projected.norm() < HINGE_EPS {
            // Twist at 180 degrees: the bisector is undefined, fall back to
            // the first frame's x axis.
            let fallback = t1.col(0) - zm * t1.col(0).dot(zm);
            fallback.normalized()
        } else {
            projected.normalized()
        }
    };
    let ym = zm.cross(xm);
    let mid = Mat3::from_cols(xm, ym, zm);

    let twist = signed_angle_deg(t1.col(0), t2.col(0), zm);
    let d = f2.origin - f1.origin;
    let shift = d.dot(xm);
    let slide = d.dot(ym);
    let rise = d.dot(zm);

    let (tilt, roll) = if hinge.norm() < HINGE_EPS {
        (0.0, 0.0)
    } else {
        let phase = signed_angle_deg(hinge, ym, zm).to_radians();
        (rolltilt * phase.sin(), rolltilt * phase.cos())
    };

    let mid_frame = Frame::new((f1.origin + f2.origin) / 2.0, mid);
    ([shift, slide, rise, tilt, roll, twist], mid_frame)
}

/// Step parameters of `f2` relative to `f1`.
pub fn step_parameters(f1: &Frame, f2: &Frame) -> StepParameters {
    let ([shift, slide, rise, tilt, roll, twist], mid_frame) = cehs(f1, f2);
    StepParameters {
        shift,
        slide,
        rise,
        tilt,
        roll,
        twist,
        mid_frame,
    }
}

/// Intra-pair parameters. The caller passes the frames in reversed order,
/// partner first, with the partner frame already brought into the
/// antiparallel convention; this preserves the signs of the reference
/// pipeline. Returns the parameters and the pair mid frame.
pub fn bp_parameters(f_second: &Frame, f_first: &Frame) -> (BpParameters, Frame) {
    let ([shear, stretch, stagger, buckle, propeller, opening], mid_frame) =
        cehs(f_second, f_first);
    (
        BpParameters {
            shear,
            stretch,
            stagger,
            buckle,
            propeller,
            opening,
        },
        mid_frame,
    )
}

/// Parameters of `f2` relative to `f1` about the local helical axis, the
/// fixed line of the rotation between the two frames.
pub fn helical_parameters(f1: &Frame, f2: &Frame) -> HelicalParameters {
    let dx = f2.x() - f1.x();
    let dy = f2.y() - f1.y();
    let raw_axis = dx.cross(dy);
    let axis = if raw_axis.norm() < HINGE_EPS {
        // Rotation close to the identity; a rise-only step along the mean
        // normal is the only sensible reading.
        let zsum = f1.z() + f2.z();
        if zsum.norm() < HINGE_EPS {
            return HelicalParameters::default();
        }
        zsum.normalized()
    } else {
        raw_axis.normalized()
    };
    let axis = if axis.dot(f1.z() + f2.z()) < 0.0 { -axis } else { axis };

    let d = f2.origin - f1.origin;
    let rise = d.dot(axis);

    let p1 = f1.x() - axis * f1.x().dot(axis);
    let p2 = f2.x() - axis * f2.x().dot(axis);
    let twist = if p1.norm() < HINGE_EPS || p2.norm() < HINGE_EPS {
        None
    } else {
        Some(signed_angle_deg(p1, p2, axis))
    };

    // Tip and inclination: the z-to-axis angle decomposed in the mid frame,
    // mirroring the tilt/roll phase split.
    let (_, mid_frame) = cehs(f1, f2);
    let mid = mid_frame.orientation;
    let gamma = angle_deg(mid.col(2), axis);
    let (inclination, tip) = if gamma.abs() < 1e-9 {
        (Some(0.0), Some(0.0))
    } else {
        let hinge = mid.col(2).cross(axis);
        if hinge.norm() < HINGE_EPS {
            (None, None)
        } else {
            let phase = signed_angle_deg(hinge, mid.col(1), mid.col(2)).to_radians();
            (Some(gamma * phase.sin()), Some(gamma * phase.cos()))
        }
    };

    let (x_disp, y_disp) = match twist {
        Some(tw) => {
            let half = tw.to_radians() / 2.0;
            if half.tan().abs() < HINGE_EPS {
                (None, None)
            } else {
                let d_perp = d - axis * rise;
                let centre = (f1.origin + f2.origin) / 2.0
                    + axis.cross(d_perp) * (0.5 / half.tan());
                let g = angle_deg(f1.z(), axis);
                let aligned = if g.abs() < 1e-9 {
                    f1.orientation
                } else {
                    Mat3::rotation(f1.z().cross(axis), g) * f1.orientation
                };
                let rel = f1.origin - centre;
                (Some(rel.dot(aligned.col(0))), Some(rel.dot(aligned.col(1))))
            }
        }
        None => (None, None),
    };

    HelicalParameters {
        x_disp,
        y_disp,
        rise: Some(rise),
        inclination,
        tip,
        twist,
    }
}

/// One step between two consecutive pairs of the helix ordering.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StepRecord {
    /// Indices into the selected-pair list.
    pub from_pair: usize,
    pub to_pair: usize,
    pub step: StepParameters,
    pub helical: HelicalParameters,
}

/// Walk the helix ordering and compute parameters for every consecutive
/// pair of pairs, skipping across break markers.
pub fn compute_steps(pair_frames: &[Frame], ordering: &HelixOrdering) -> Vec<StepRecord> {
    let mut steps = Vec::new();
    let mut previous: Option<usize> = None;
    for item in ordering.items.iter() {
        match item {
            HelixItem::Break => previous = None,
            HelixItem::Pair(index) => {
                if let Some(prev) = previous {
                    let f1 = &pair_frames[prev];
                    let f2 = &pair_frames[*index];
                    steps.push(StepRecord {
                        from_pair: prev,
                        to_pair: *index,
                        step: step_parameters(f1, f2),
                        helical: helical_parameters(f1, f2),
                    });
                }
                previous = Some(*index);
            }
        }
    }
    steps
}
