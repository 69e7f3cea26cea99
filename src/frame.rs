use log::{debug, warn};

use super::errors::{ClassificationRejection, PipelineError};
use super::geometry;
use super::registry::Registry;
use super::report::Recorder;
use super::structure::{BaseType, Frame, Structure};
use super::templates::TemplateStore;
use super::typing;

/// Outcome counters for the frame-assignment pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameSummary {
    /// Residues that received a reference frame.
    pub nucleotides: usize,
    /// Residues rejected as unrecognisable or badly fitting.
    pub rejected: usize,
    /// Amino acids among the rejected.
    pub amino_acids: usize,
}

/// Assign a base type and reference frame to every recognisable nucleotide,
/// walking residues in canonical order. Rejections are recorded and do not
/// stop the pass; a missing template file does.
pub fn assign_frames(
    structure: &mut Structure,
    registry: &Registry,
    templates: &mut TemplateStore,
    recorder: &mut dyn Recorder,
) -> Result<FrameSummary, PipelineError> {
    let mut summary = FrameSummary::default();

    for index in 1..=structure.len() {
        let detection = match typing::detect(structure.residue(index), registry) {
            Ok(detection) => detection,
            Err(why) => {
                summary.rejected += 1;
                if why == ClassificationRejection::AminoAcid {
                    summary.amino_acids += 1;
                    structure.residue_mut(index).base_type = BaseType::AminoAcid;
                }
                recorder.residue_rejected(index, structure.residue(index), &why);
                continue;
            }
        };

        let template = templates.get(&detection.template)?;
        let ring = match typing::match_ring_atoms(structure.residue(index), template) {
            Ok(ring) => ring,
            Err(why) => {
                summary.rejected += 1;
                recorder.residue_rejected(index, structure.residue(index), &why);
                continue;
            }
        };

        let sup = match geometry::fit(&ring.standard, &ring.experimental) {
            Ok(sup) => sup,
            Err(fit_error) => {
                let why = ClassificationRejection::FrameFitDegenerate(fit_error);
                warn!(
                    "residue {} ({}): {}",
                    index,
                    structure.residue(index).ident(),
                    why
                );
                summary.rejected += 1;
                recorder.residue_rejected(index, structure.residue(index), &why);
                continue;
            }
        };

        // Registry-typed residues skip the NT_CUTOFF gate; the template
        // tolerance is the only bound on how distorted they may be.
        if sup.rms > template.tolerance {
            let why = ClassificationRejection::FrameFit {
                rms: sup.rms,
                tolerance: template.tolerance,
            };
            summary.rejected += 1;
            recorder.residue_rejected(index, structure.residue(index), &why);
            continue;
        }

        if !sup.rotation.is_rotation() || !sup.rotation.is_finite() || !sup.translation.is_finite()
        {
            let why = ClassificationRejection::FrameFitDegenerate(geometry::FitError::Degenerate);
            warn!(
                "residue {} ({}): non-orthonormal orientation from template fit",
                index,
                structure.residue(index).ident()
            );
            summary.rejected += 1;
            recorder.residue_rejected(index, structure.residue(index), &why);
            continue;
        }

        let matched = ring.len();
        let residue = structure.residue_mut(index);
        residue.base_type = BaseType::Standard(detection.kind);
        residue.is_purine = detection.is_purine;
        residue.frame = Some(Frame::new(sup.translation, sup.rotation));
        residue.rms_fit = Some(sup.rms);
        residue.matched_atoms = matched;
        summary.nucleotides += 1;

        debug!(
            "residue {} ({}) typed {}{} rms {:.4} over {} ring atoms{}",
            index,
            residue.ident(),
            detection.kind.letter(),
            if residue.is_purine { " (purine)" } else { "" },
            sup.rms,
            matched,
            if detection.via_registry { " [registry]" } else { "" },
        );
        recorder.residue_classified(index, structure.residue(index));
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullRecorder;
    use crate::structure::{BaseKind, Residue};
    use crate::templates::Template;
    use crate::geometry::{Mat3, Vec3};
    use std::path::PathBuf;

    fn data_store() -> TemplateStore {
        TemplateStore::new(&PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"))
    }

    fn residue_from_template(name: &str, template: &Template, atoms: &[&str]) -> Residue {
        let mut residue = Residue::new(name, 'A', 1);
        for atom in atoms {
            if let Some(coord) = template.coord(atom) {
                residue.push_atom(atom, &atom[..1], coord);
            }
        }
        residue
    }

    #[test]
    fn ideal_guanine_gets_an_identity_frame() {
        let mut store = data_store();
        let template = store.get("Atomic_G.pdb").unwrap().clone();
        let atoms = ["C1'", "C4", "N3", "C2", "N1", "C6", "C5", "N7", "C8", "N9", "O6", "N2"];
        let residue = residue_from_template("G", &template, &atoms);

        let mut structure = Structure::new();
        structure.push_residue(residue);
        let summary =
            assign_frames(&mut structure, &Registry::empty(), &mut store, &mut NullRecorder)
                .unwrap();
        assert_eq!(summary.nucleotides, 1);
        assert_eq!(summary.rejected, 0);

        let residue = structure.residue(1);
        assert_eq!(residue.base_type, BaseType::Standard(BaseKind::Guanine));
        assert!(residue.is_purine);
        assert_eq!(residue.matched_atoms, 9);
        let frame = residue.frame.expect("frame assigned");
        // Template coordinates are already in the standard frame.
        assert!(frame.origin.norm() < 1e-9);
        assert!((frame.orientation.m[0][0] - 1.0).abs() < 1e-9);
        assert!(residue.rms_fit.unwrap() < 1e-9);
    }

    #[test]
    fn frame_follows_a_rigid_motion() {
        let mut store = data_store();
        let template = store.get("Atomic_C.pdb").unwrap().clone();
        let atoms = ["C1'", "C4", "N3", "C2", "N1", "C6", "C5"];
        let mut residue = residue_from_template("C", &template, &atoms);
        let r = Mat3::rotation(Vec3::new(0.2, 1.0, -0.4), 133.0);
        let t = Vec3::new(4.0, 9.0, -2.5);
        for atom in residue.atoms.iter_mut() {
            atom.coord = r.mul_vec(atom.coord) + t;
        }

        let mut structure = Structure::new();
        structure.push_residue(residue);
        assign_frames(&mut structure, &Registry::empty(), &mut store, &mut NullRecorder).unwrap();

        let frame = structure.residue(1).frame.expect("frame");
        assert!((frame.origin - t).norm() < 1e-9);
        for rr in 0..3 {
            for cc in 0..3 {
                assert!((frame.orientation.m[rr][cc] - r.m[rr][cc]).abs() < 1e-9);
            }
        }
        assert!(frame.orientation.is_rotation());
    }

    #[test]
    fn registry_typed_residue_survives_above_cutoff_distortion() {
        use crate::constants::{MAX_FRAME_RMS, NT_CUTOFF};
        use crate::registry::Registry;

        let mut store = data_store();
        let registry = Registry::load(
            &PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("data")
                .join("modified_nucleotides.json"),
        )
        .unwrap();

        let template = store.get("Atomic.a.pdb").unwrap().clone();
        let atoms = ["C1'", "C4", "N3", "C2", "N1", "C6", "C5", "N7", "C8", "N9"];
        let mut residue = residue_from_template("A23", &template, &atoms);
        // Pucker the ring out of plane beyond NT_CUTOFF but inside the
        // template tolerance.
        for (i, atom) in residue.atoms.iter_mut().enumerate() {
            if atom.name != "C1'" {
                let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                atom.coord = atom.coord + Vec3::new(0.0, 0.0, sign * 0.3);
            }
        }

        let mut structure = Structure::new();
        structure.push_residue(residue);
        let summary =
            assign_frames(&mut structure, &registry, &mut store, &mut NullRecorder).unwrap();
        assert_eq!(summary.nucleotides, 1);

        let residue = structure.residue(1);
        assert_eq!(residue.base_type, BaseType::Standard(BaseKind::Adenine));
        let rms = residue.rms_fit.unwrap();
        assert!(rms > NT_CUTOFF, "distortion too mild: {rms}");
        assert!(rms < MAX_FRAME_RMS, "distortion too strong: {rms}");
        assert!(residue.frame.is_some());
    }

    #[test]
    fn unrecognisable_residue_is_counted_not_fatal() {
        let mut store = data_store();
        let mut glc = Residue::new("GLC", 'A', 1);
        for (name, x) in [("C1", 0.0), ("C2", 1.5), ("C4", 2.2), ("C5", 1.5), ("C6", 0.0)] {
            glc.push_atom(name, "C", Vec3::new(x, x * 0.3, 0.0));
        }
        let mut structure = Structure::new();
        structure.push_residue(glc);
        let summary =
            assign_frames(&mut structure, &Registry::empty(), &mut store, &mut NullRecorder)
                .unwrap();
        assert_eq!(summary.nucleotides, 0);
        assert_eq!(summary.rejected, 1);
        assert!(structure.residue(1).frame.is_none());
        assert_eq!(structure.residue(1).base_type, BaseType::Other);
    }
}
