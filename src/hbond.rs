use serde::Serialize;
use std::collections::HashMap;

use super::structure::Residue;
use super::PairParams;

macro_rules! hashmap {
    ($( $key: expr => $val: expr ),*) => {{
         let mut map = ::std::collections::HashMap::new();
         $( map.insert($key, $val); )*
         map
    }}
}

/// How a retained hydrogen bond is written in diagnostics: good '-',
/// marginal ' ', rejected '*'.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Linkage {
    Good,
    Marginal,
    Rejected,
}

impl Linkage {
    pub fn symbol(&self) -> char {
        match self {
            Linkage::Good => '-',
            Linkage::Marginal => ' ',
            Linkage::Rejected => '*',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Donor,
    Acceptor,
    Both,
}

// Donor/acceptor roles per base letter and atom name. Unknown combinations
// do not disqualify a bond, they only leave its kind to the distance test.
lazy_static! {
    static ref HB_ROLE: HashMap<&'static str, Role> = hashmap![
        "A.N6" => Role::Donor, "A.N1" => Role::Acceptor, "A.N3" => Role::Acceptor, "A.N7" => Role::Acceptor,
        "G.N1" => Role::Donor, "G.N2" => Role::Donor, "G.O6" => Role::Acceptor, "G.N3" => Role::Acceptor, "G.N7" => Role::Acceptor,
        "C.N4" => Role::Donor, "C.N3" => Role::Acceptor, "C.O2" => Role::Acceptor,
        "T.N3" => Role::Donor, "T.O2" => Role::Acceptor, "T.O4" => Role::Acceptor,
        "U.N3" => Role::Donor, "U.O2" => Role::Acceptor, "U.O4" => Role::Acceptor,
        "I.N1" => Role::Donor, "I.O6" => Role::Acceptor, "I.N3" => Role::Acceptor, "I.N7" => Role::Acceptor,
        "P.N1" => Role::Donor, "P.N3" => Role::Donor, "P.O2" => Role::Acceptor, "P.O4" => Role::Acceptor
    ];
}

// Backbone atoms that never count toward the base hydrogen-bond total.
const PHOSPHATE_EXCLUDE: [&str; 6] = ["O1P", "O2P", "O3'", "O4'", "O5'", "N7"];

#[derive(Debug, Clone, Serialize)]
pub struct HBond {
    /// Atom name on the first residue of the pair.
    pub atom_i: String,
    /// Atom name on the second residue of the pair.
    pub atom_j: String,
    /// Donor-acceptor distance rounded to 2 decimals; the rounding is part
    /// of the contract.
    pub distance: f64,
    pub linkage: Linkage,
    /// Neither atom is backbone or the O2' hydroxyl.
    pub base_bond: bool,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn role(letter: Option<char>, atom: &str) -> Option<Role> {
    if atom == "O2'" {
        return Some(Role::Both);
    }
    let letter = letter?;
    HB_ROLE.get(format!("{letter}.{atom}").as_str()).copied()
}

fn roles_conflict(a: Option<Role>, b: Option<Role>) -> bool {
    matches!(
        (a, b),
        (Some(Role::Donor), Some(Role::Donor)) | (Some(Role::Acceptor), Some(Role::Acceptor))
    )
}

fn element_allowed(element: &str, allowed: &str) -> bool {
    !element.is_empty() && allowed.contains(&format!(".{element}."))
}

fn is_base_atom(name: &str) -> bool {
    name != "O2'" && !PHOSPHATE_EXCLUDE.contains(&name)
}

/// Enumerate the hydrogen bonds between two residues.
///
/// Candidates are O/N pairs within the distance window. An atom joins at
/// most one retained bond; when two candidates share an atom the shorter
/// wins and the loser is marked rejected.
pub fn find_hbonds(res_i: &Residue, res_j: &Residue, params: &PairParams) -> Vec<HBond> {
    struct Candidate {
        i: usize,
        j: usize,
        distance: f64,
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    for (i, ai) in res_i.atoms.iter().enumerate() {
        if !element_allowed(&ai.element, &params.hb_atoms) {
            continue;
        }
        for (j, aj) in res_j.atoms.iter().enumerate() {
            if !element_allowed(&aj.element, &params.hb_atoms) {
                continue;
            }
            let distance = round2(ai.coord.distance(aj.coord));
            if distance < params.hb_lower || distance > params.hb_dist1 {
                continue;
            }
            candidates.push(Candidate { i, j, distance });
        }
    }

    candidates.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(res_i.atoms[a.i].name.cmp(&res_i.atoms[b.i].name))
            .then(res_j.atoms[a.j].name.cmp(&res_j.atoms[b.j].name))
    });

    let letter_i = res_i.base_letter();
    let letter_j = res_j.base_letter();
    let mut used_i = vec![false; res_i.atoms.len()];
    let mut used_j = vec![false; res_j.atoms.len()];
    let mut bonds = Vec::with_capacity(candidates.len());
    for c in candidates {
        let name_i = &res_i.atoms[c.i].name;
        let name_j = &res_j.atoms[c.j].name;
        let linkage = if used_i[c.i] || used_j[c.j] {
            Linkage::Rejected
        } else {
            used_i[c.i] = true;
            used_j[c.j] = true;
            let in_good_window =
                c.distance >= params.hb_good_lower && c.distance <= params.hb_good_upper;
            if in_good_window && !roles_conflict(role(letter_i, name_i), role(letter_j, name_j)) {
                Linkage::Good
            } else {
                Linkage::Marginal
            }
        };
        bonds.push(HBond {
            atom_i: name_i.clone(),
            atom_j: name_j.clone(),
            distance: c.distance,
            linkage,
            base_bond: is_base_atom(name_i) && is_base_atom(name_j),
        });
    }
    bonds
}

/// Retained bonds between base atoms, the count validation gates on.
pub fn base_bond_count(bonds: &[HBond]) -> usize {
    bonds
        .iter()
        .filter(|b| b.base_bond && b.linkage != Linkage::Rejected)
        .count()
}

/// Quality adjustment from the good bonds: -3 for two or more, else minus
/// the count.
pub fn quality_adjustment(bonds: &[HBond], params: &PairParams) -> f64 {
    let k = bonds
        .iter()
        .filter(|b| {
            b.linkage == Linkage::Good
                && b.distance >= params.hb_good_lower
                && b.distance <= params.hb_good_upper
        })
        .count();
    if k >= 2 {
        -3.0
    } else {
        -(k as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;
    use crate::structure::{BaseKind, BaseType, Residue};

    fn typed(name: &str, kind: BaseKind) -> Residue {
        let mut residue = Residue::new(name, 'A', 1);
        residue.base_type = BaseType::Standard(kind);
        residue.is_purine = kind.is_purine();
        residue
    }

    #[test]
    fn watson_crick_gc_bonds_are_good() {
        let mut g = typed("G", BaseKind::Guanine);
        g.push_atom("O6", "O", Vec3::new(1.554, -0.955, 0.0));
        g.push_atom("N1", "N", Vec3::new(-0.700, -0.641, 0.0));
        g.push_atom("N2", "N", Vec3::new(-2.949, -0.139, 0.0));
        let mut c = typed("C", BaseKind::Cytosine);
        c.push_atom("N4", "N", Vec3::new(1.875, 2.027, 0.0));
        c.push_atom("N3", "N", Vec3::new(-0.391, 2.344, 0.0));
        c.push_atom("O2", "O", Vec3::new(-2.628, 2.709, 0.0));

        let bonds = find_hbonds(&g, &c, &PairParams::default());
        let good: Vec<&HBond> = bonds.iter().filter(|b| b.linkage == Linkage::Good).collect();
        assert_eq!(good.len(), 3, "bonds: {bonds:?}");
        assert_eq!(base_bond_count(&bonds), 3);
        assert_eq!(quality_adjustment(&bonds, &PairParams::default()), -3.0);
    }

    #[test]
    fn shared_atom_keeps_the_shorter_bond() {
        let mut u = typed("U", BaseKind::Uracil);
        u.push_atom("O4", "O", Vec3::new(0.0, 0.0, 0.0));
        let mut a = typed("A", BaseKind::Adenine);
        a.push_atom("N6", "N", Vec3::new(2.9, 0.0, 0.0));
        a.push_atom("N1", "N", Vec3::new(0.0, 3.1, 0.0));

        let bonds = find_hbonds(&u, &a, &PairParams::default());
        assert_eq!(bonds.len(), 2);
        assert_eq!(bonds[0].atom_j, "N6");
        assert_eq!(bonds[0].linkage, Linkage::Good);
        assert_eq!(bonds[1].atom_j, "N1");
        assert_eq!(bonds[1].linkage, Linkage::Rejected);
        assert_eq!(bonds[1].linkage.symbol(), '*');
        // Only one atom of U takes part: one retained bond.
        assert_eq!(base_bond_count(&bonds), 1);
    }

    #[test]
    fn donor_donor_contact_is_only_marginal() {
        let mut g = typed("G", BaseKind::Guanine);
        g.push_atom("N1", "N", Vec3::new(0.0, 0.0, 0.0));
        let mut u = typed("U", BaseKind::Uracil);
        u.push_atom("N3", "N", Vec3::new(2.9, 0.0, 0.0));

        let bonds = find_hbonds(&g, &u, &PairParams::default());
        assert_eq!(bonds.len(), 1);
        assert_eq!(bonds[0].linkage, Linkage::Marginal);
        assert_eq!(quality_adjustment(&bonds, &PairParams::default()), 0.0);
    }

    #[test]
    fn backbone_and_sugar_atoms_do_not_count_as_base_bonds() {
        let mut a = typed("A", BaseKind::Adenine);
        a.push_atom("O2'", "O", Vec3::new(0.0, 0.0, 0.0));
        a.push_atom("O1P", "O", Vec3::new(0.0, 4.0, 6.0));
        let mut g = typed("G", BaseKind::Guanine);
        g.push_atom("N3", "N", Vec3::new(2.8, 0.0, 0.0));

        let bonds = find_hbonds(&a, &g, &PairParams::default());
        assert_eq!(bonds.len(), 1);
        assert_eq!(bonds[0].atom_i, "O2'");
        // Retained, classified, but never a base bond.
        assert_eq!(bonds[0].linkage, Linkage::Good);
        assert_eq!(base_bond_count(&bonds), 0);
    }

    #[test]
    fn distances_are_rounded_to_two_decimals() {
        let mut u = typed("U", BaseKind::Uracil);
        u.push_atom("O4", "O", Vec3::new(0.0, 0.0, 0.0));
        let mut a = typed("A", BaseKind::Adenine);
        // Raw 2.4961: rounds into the good window.
        a.push_atom("N6", "N", Vec3::new(2.4961, 0.0, 0.0));

        let bonds = find_hbonds(&u, &a, &PairParams::default());
        assert_eq!(bonds.len(), 1);
        assert!((bonds[0].distance - 2.50).abs() < 1e-12);
        assert_eq!(bonds[0].linkage, Linkage::Good);
    }

    #[test]
    fn out_of_window_contacts_are_ignored() {
        let mut u = typed("U", BaseKind::Uracil);
        u.push_atom("O4", "O", Vec3::new(0.0, 0.0, 0.0));
        let mut a = typed("A", BaseKind::Adenine);
        a.push_atom("N6", "N", Vec3::new(1.4, 0.0, 0.0));
        a.push_atom("N1", "N", Vec3::new(4.6, 0.0, 0.0));
        let bonds = find_hbonds(&u, &a, &PairParams::default());
        assert!(bonds.is_empty());
    }
}
