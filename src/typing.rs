use super::constants::{BOND_DCRT, NT_CUTOFF};
use super::errors::ClassificationRejection;
use super::geometry::{self, Vec3};
use super::registry::Registry;
use super::structure::{BaseKind, Residue};
use super::templates::Template;

/// Canonical ring atom names, pyrimidine six-ring first, purine extension
/// last. Matching preserves this order.
pub const RING_ATOMS: [&str; 9] = ["C4", "N3", "C2", "N1", "C6", "C5", "N7", "C8", "N9"];

const PURINE_ATOMS: [&str; 3] = ["N7", "C8", "N9"];

// Standard ring geometry used when a residue is not in the registry: the
// nine adenine ring atoms in the standard reference frame. Pyrimidine
// rings fit its six-ring far below the cutoff.
const STD_RING: [(&str, [f64; 3]); 9] = [
    ("C4", [-1.267, 3.124, 0.0]),
    ("N3", [-2.320, 2.290, 0.0]),
    ("C2", [-1.912, 1.023, 0.0]),
    ("N1", [-0.668, 0.532, 0.0]),
    ("C6", [0.369, 1.398, 0.0]),
    ("C5", [0.071, 2.771, 0.0]),
    ("N7", [0.877, 3.902, 0.0]),
    ("C8", [0.024, 4.897, 0.0]),
    ("N9", [-1.291, 4.498, 0.0]),
];

lazy_static! {
    static ref STANDARD_RING: Template = Template::from_atoms(
        "standard-ring",
        STD_RING
            .iter()
            .map(|(name, xyz)| (name.to_string(), Vec3::from(*xyz)))
            .collect(),
    );
}

/// Ring atoms of a residue matched against a template, in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct RingMatch {
    pub names: Vec<&'static str>,
    pub experimental: Vec<Vec3>,
    pub standard: Vec<Vec3>,
    /// True when the purine atoms took part in the match.
    pub with_purine_atoms: bool,
}

impl RingMatch {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The pyrimidine-only subset of this match.
    pub fn pyrimidine_subset(&self) -> RingMatch {
        let mut sub = RingMatch {
            names: Vec::new(),
            experimental: Vec::new(),
            standard: Vec::new(),
            with_purine_atoms: false,
        };
        for (i, &name) in self.names.iter().enumerate() {
            if PURINE_ATOMS.contains(&name) {
                continue;
            }
            sub.names.push(name);
            sub.experimental.push(self.experimental[i]);
            sub.standard.push(self.standard[i]);
        }
        sub
    }
}

/// Extract the ring atoms a residue shares with a template. The purine
/// atoms are only matched when the residue carries both N7 and C8; an atom
/// named C8 alone (a side chain, say) does not make a purine.
pub fn match_ring_atoms(
    residue: &Residue,
    template: &Template,
) -> Result<RingMatch, ClassificationRejection> {
    if !residue.has_atom("C1'") && !residue.has_atom("C1R") {
        return Err(ClassificationRejection::MissingSugarCarbon);
    }

    let purine = residue.has_atom("N7")
        && residue.has_atom("C8")
        && template.has_atom("N7")
        && template.has_atom("C8");

    let mut matched = RingMatch {
        names: Vec::new(),
        experimental: Vec::new(),
        standard: Vec::new(),
        with_purine_atoms: purine,
    };
    for &name in RING_ATOMS.iter() {
        if PURINE_ATOMS.contains(&name) && !purine {
            continue;
        }
        let (atom, std) = match (residue.atom(name), template.coord(name)) {
            (Some(atom), Some(std)) => (atom, std),
            _ => continue,
        };
        matched.names.push(name);
        matched.experimental.push(atom.coord);
        matched.standard.push(std);
    }

    if matched.len() < 3 {
        return Err(ClassificationRejection::TooFewRingAtoms(matched.len()));
    }
    Ok(matched)
}

/// Outcome of residue-type detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub kind: BaseKind,
    pub is_purine: bool,
    /// Template file the base-frame calculator should fit against.
    pub template: String,
    pub via_registry: bool,
}

fn looks_like_amino_acid(residue: &Residue) -> bool {
    let ca = match residue.atom("CA") {
        Some(a) => a.coord,
        None => return false,
    };
    let partner = residue.atom("C").or_else(|| residue.atom("N"));
    match partner {
        Some(a) => ca.distance(a.coord) <= BOND_DCRT,
        None => false,
    }
}

fn infer_kind(residue: &Residue, is_purine: bool) -> BaseKind {
    match residue.name.as_str() {
        "A" | "ADE" => return BaseKind::Adenine,
        "G" | "GUA" => return BaseKind::Guanine,
        "C" | "CYT" => return BaseKind::Cytosine,
        "T" | "THY" => return BaseKind::Thymine,
        "U" | "URA" => return BaseKind::Uracil,
        "I" | "INO" => return BaseKind::Inosine,
        "P" | "PSU" => return BaseKind::Pseudouridine,
        _ => {}
    }
    if is_purine {
        if residue.has_atom("O6") || residue.has_atom("N2") {
            BaseKind::Guanine
        } else {
            BaseKind::Adenine
        }
    } else if residue.has_atom("N4") {
        BaseKind::Cytosine
    } else if residue.has_atom("C5M") {
        BaseKind::Thymine
    } else {
        BaseKind::Uracil
    }
}

/// Decide whether a residue is a nucleotide and of which base identity.
///
/// The registry is consulted first and is authoritative. Unregistered
/// residues get the two-try RMSD check against the standard ring: all
/// matched atoms first, then the pyrimidine six-ring alone when a purine
/// match fit badly. Acceptance is `rms <= NT_CUTOFF` on either attempt, and
/// the accepting attempt decides purine against pyrimidine.
pub fn detect(residue: &Residue, registry: &Registry) -> Result<Detection, ClassificationRejection> {
    if let Some(entry) = registry.lookup(&residue.name) {
        return Ok(Detection {
            kind: entry.kind,
            is_purine: entry.is_purine,
            template: entry.template.clone(),
            via_registry: true,
        });
    }

    let ring = match match_ring_atoms(residue, &STANDARD_RING) {
        Ok(ring) => ring,
        Err(why) => {
            if looks_like_amino_acid(residue) {
                return Err(ClassificationRejection::AminoAcid);
            }
            return Err(why);
        }
    };

    let full_rms = geometry::fit(&ring.standard, &ring.experimental)
        .map(|sup| sup.rms)
        .map_err(|_| ClassificationRejection::NotANucleotide)?;

    let (rms, is_purine) = if full_rms <= NT_CUTOFF {
        (full_rms, ring.with_purine_atoms)
    } else if ring.with_purine_atoms {
        // A warped purine can still carry a clean pyrimidine ring.
        let sub = ring.pyrimidine_subset();
        let sub_rms = geometry::fit(&sub.standard, &sub.experimental)
            .map(|sup| sup.rms)
            .map_err(|_| ClassificationRejection::NotANucleotide)?;
        if sub_rms <= NT_CUTOFF {
            (sub_rms, false)
        } else {
            return Err(ClassificationRejection::RingFit {
                rms: full_rms.min(sub_rms),
                cutoff: NT_CUTOFF,
            });
        }
    } else {
        return Err(ClassificationRejection::RingFit {
            rms: full_rms,
            cutoff: NT_CUTOFF,
        });
    };
    debug_assert!(rms.is_finite());

    let kind = infer_kind(residue, is_purine);
    Ok(Detection {
        kind,
        is_purine,
        template: kind.template_name().to_string(),
        via_registry: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mat3;
    use crate::structure::Residue;

    fn residue_from_std_ring(name: &str, names: &[&str]) -> Residue {
        let mut residue = Residue::new(name, 'A', 1);
        residue.push_atom("C1'", "C", Vec3::new(-2.479, 5.346, 0.0));
        for (atom, xyz) in STD_RING.iter() {
            if names.contains(atom) {
                residue.push_atom(atom, &atom[..1], Vec3::from(*xyz));
            }
        }
        residue
    }

    #[test]
    fn purine_needs_both_n7_and_c8() {
        let all: Vec<&str> = RING_ATOMS.to_vec();
        let full = residue_from_std_ring("A", &all);
        let ring = match_ring_atoms(&full, &STANDARD_RING).unwrap();
        assert!(ring.with_purine_atoms);
        assert_eq!(ring.len(), 9);

        // C8 without N7: six atoms only, not a purine.
        let mut no_n7 = residue_from_std_ring("X", &["C4", "N3", "C2", "N1", "C6", "C5"]);
        no_n7.push_atom("C8", "C", Vec3::new(5.0, 5.0, 5.0));
        let ring = match_ring_atoms(&no_n7, &STANDARD_RING).unwrap();
        assert!(!ring.with_purine_atoms);
        assert_eq!(ring.len(), 6);
    }

    #[test]
    fn sugar_carbon_is_mandatory() {
        let mut residue = Residue::new("A", 'A', 1);
        for (atom, xyz) in STD_RING.iter() {
            residue.push_atom(atom, &atom[..1], Vec3::from(*xyz));
        }
        assert_eq!(
            match_ring_atoms(&residue, &STANDARD_RING),
            Err(ClassificationRejection::MissingSugarCarbon)
        );
    }

    #[test]
    fn detects_ideal_adenine_anywhere_in_space() {
        let mut residue = residue_from_std_ring("ADE", &RING_ATOMS);
        let r = Mat3::rotation(Vec3::new(1.0, 1.0, 0.3), 71.0);
        let t = Vec3::new(12.0, -3.0, 8.0);
        for atom in residue.atoms.iter_mut() {
            atom.coord = r.mul_vec(atom.coord) + t;
        }
        let detection = detect(&residue, &Registry::empty()).unwrap();
        assert_eq!(detection.kind, BaseKind::Adenine);
        assert!(detection.is_purine);
        assert!(!detection.via_registry);
        assert_eq!(detection.template, "Atomic_A.pdb");
    }

    #[test]
    fn warped_purine_falls_back_to_pyrimidine_ring() {
        // Displace the purine atoms far out of plane; the six-ring is intact.
        let mut residue = residue_from_std_ring("7DA", &RING_ATOMS);
        for atom in residue.atoms.iter_mut() {
            if PURINE_ATOMS.contains(&atom.name.as_str()) {
                atom.coord = atom.coord + Vec3::new(0.4, -0.3, 1.2);
            }
        }
        let detection = detect(&residue, &Registry::empty()).unwrap();
        assert!(!detection.is_purine);
    }

    #[test]
    fn rejects_a_wrecked_ring() {
        let mut residue = residue_from_std_ring("UNK", &["C4", "N3", "C2", "N1", "C6", "C5"]);
        for (i, atom) in residue.atoms.iter_mut().enumerate() {
            if atom.name != "C1'" {
                atom.coord = atom.coord + Vec3::new(0.0, 0.0, 0.5 * (i as f64));
            }
        }
        match detect(&residue, &Registry::empty()) {
            Err(ClassificationRejection::RingFit { rms, cutoff }) => {
                assert!(rms > cutoff);
            }
            other => panic!("expected ring-fit rejection, got {other:?}"),
        }
    }

    #[test]
    fn amino_acid_backbone_is_recognised() {
        let mut residue = Residue::new("ALA", 'A', 1);
        residue.push_atom("N", "N", Vec3::new(0.0, 0.0, 0.0));
        residue.push_atom("CA", "C", Vec3::new(1.46, 0.0, 0.0));
        residue.push_atom("C", "C", Vec3::new(2.0, 1.4, 0.0));
        residue.push_atom("O", "O", Vec3::new(1.4, 2.4, 0.0));
        assert_eq!(
            detect(&residue, &Registry::empty()),
            Err(ClassificationRejection::AminoAcid)
        );
    }

    #[test]
    fn glucose_never_reaches_the_ring_fit() {
        let mut glc = Residue::new("GLC", 'A', 1);
        for (name, x) in [("C1", 0.0), ("C2", 1.5), ("C3", 2.2), ("C4", 1.5), ("C5", 0.0), ("C6", -0.7)] {
            glc.push_atom(name, "C", Vec3::new(x, x * 0.4, 0.0));
        }
        for (name, x) in [("O2", 2.2), ("O3", 3.6), ("O4", 2.2), ("O6", -2.1)] {
            glc.push_atom(name, "O", Vec3::new(x, 1.0, 0.8));
        }
        assert_eq!(
            detect(&glc, &Registry::empty()),
            Err(ClassificationRejection::MissingSugarCarbon)
        );
    }

    #[test]
    fn base_letter_heuristics() {
        let mut u = residue_from_std_ring("5XU", &["C4", "N3", "C2", "N1", "C6", "C5"]);
        assert_eq!(detect(&u, &Registry::empty()).unwrap().kind, BaseKind::Uracil);
        u.push_atom("N4", "N", Vec3::new(1.875, 2.027, 0.0));
        assert_eq!(detect(&u, &Registry::empty()).unwrap().kind, BaseKind::Cytosine);

        let mut t = residue_from_std_ring("5XT", &["C4", "N3", "C2", "N1", "C6", "C5"]);
        t.push_atom("C5M", "C", Vec3::new(2.466, 4.961, 0.0));
        assert_eq!(detect(&t, &Registry::empty()).unwrap().kind, BaseKind::Thymine);

        let a = residue_from_std_ring("XAD", &RING_ATOMS);
        assert_eq!(detect(&a, &Registry::empty()).unwrap().kind, BaseKind::Adenine);
        let mut g = residue_from_std_ring("XGU", &RING_ATOMS);
        g.push_atom("O6", "O", Vec3::new(1.554, 0.955, 0.0));
        assert_eq!(detect(&g, &Registry::empty()).unwrap().kind, BaseKind::Guanine);
    }
}
