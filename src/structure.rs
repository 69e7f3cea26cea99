use pdbtbx::{
    ContainsAtomConformer, ContainsAtomConformerResidue, ContainsAtomConformerResidueChain,
    Element, Format, ReadOptions, StrictnessLevel,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use super::errors::PipelineError;
use super::geometry::{Mat3, Vec3};

/// The seven standard base identities a nucleotide can resolve to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum BaseKind {
    Adenine,
    Cytosine,
    Guanine,
    Thymine,
    Uracil,
    Inosine,
    Pseudouridine,
}

impl BaseKind {
    pub fn letter(&self) -> char {
        match self {
            BaseKind::Adenine => 'A',
            BaseKind::Cytosine => 'C',
            BaseKind::Guanine => 'G',
            BaseKind::Thymine => 'T',
            BaseKind::Uracil => 'U',
            BaseKind::Inosine => 'I',
            BaseKind::Pseudouridine => 'P',
        }
    }

    pub fn is_purine(&self) -> bool {
        matches!(self, BaseKind::Adenine | BaseKind::Guanine | BaseKind::Inosine)
    }

    /// Template file for the standard (unmodified) form of this base.
    pub fn template_name(&self) -> &'static str {
        match self {
            BaseKind::Adenine => "Atomic_A.pdb",
            BaseKind::Cytosine => "Atomic_C.pdb",
            BaseKind::Guanine => "Atomic_G.pdb",
            BaseKind::Thymine => "Atomic_T.pdb",
            BaseKind::Uracil => "Atomic_U.pdb",
            BaseKind::Inosine => "Atomic_I.pdb",
            BaseKind::Pseudouridine => "Atomic_P.pdb",
        }
    }

    pub fn from_letter(letter: char) -> Option<BaseKind> {
        match letter.to_ascii_uppercase() {
            'A' => Some(BaseKind::Adenine),
            'C' => Some(BaseKind::Cytosine),
            'G' => Some(BaseKind::Guanine),
            'T' => Some(BaseKind::Thymine),
            'U' => Some(BaseKind::Uracil),
            'I' => Some(BaseKind::Inosine),
            'P' => Some(BaseKind::Pseudouridine),
            _ => None,
        }
    }
}

/// Residue classification after type detection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum BaseType {
    Standard(BaseKind),
    AminoAcid,
    Other,
}

impl BaseType {
    pub fn letter(&self) -> Option<char> {
        match self {
            BaseType::Standard(kind) => Some(kind.letter()),
            _ => None,
        }
    }

    pub fn is_nucleotide(&self) -> bool {
        matches!(self, BaseType::Standard(_))
    }
}

/// Per-residue reference frame. Columns of `orientation` are the base x, y
/// and z axes in world coordinates; z is the base-plane normal, x points
/// from the ring centre toward the glycosidic attachment.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct Frame {
    pub origin: Vec3,
    pub orientation: Mat3,
}

impl Frame {
    pub fn new(origin: Vec3, orientation: Mat3) -> Frame {
        Frame { origin, orientation }
    }

    pub fn x(&self) -> Vec3 {
        self.orientation.col(0)
    }

    pub fn y(&self) -> Vec3 {
        self.orientation.col(1)
    }

    pub fn z(&self) -> Vec3 {
        self.orientation.col(2)
    }

    /// The same frame with y and z reversed, used when the partner base of
    /// a pair has to be brought into the antiparallel convention.
    pub fn reversed(&self) -> Frame {
        Frame {
            origin: self.origin,
            orientation: Mat3::from_cols(self.x(), -self.y(), -self.z()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Atom {
    /// Canonical (trimmed, normalised) atom name, e.g. "O2'".
    pub name: String,
    pub element: String,
    /// 0-based index of the owning residue in the structure pool.
    pub residue: usize,
    pub coord: Vec3,
    pub alt_loc: Option<char>,
    pub occupancy: f64,
    pub b_factor: f64,
    pub hetero: bool,
}

impl Atom {
    /// Name as a 4-character right-padded field, the PDB convention.
    pub fn padded_name(&self) -> String {
        format!("{:<4}", self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Residue {
    /// Canonical 3-letter residue name.
    pub name: String,
    pub chain_id: char,
    pub seq_num: i32,
    pub insertion_code: Option<char>,
    pub atoms: Vec<Atom>,
    pub base_type: BaseType,
    pub is_purine: bool,
    pub frame: Option<Frame>,
    pub rms_fit: Option<f64>,
    pub matched_atoms: usize,
}

impl Residue {
    pub fn new(name: &str, chain_id: char, seq_num: i32) -> Residue {
        Residue {
            name: canonical_residue_name(name),
            chain_id,
            seq_num,
            insertion_code: None,
            atoms: Vec::new(),
            base_type: BaseType::Other,
            is_purine: false,
            frame: None,
            rms_fit: None,
            matched_atoms: 0,
        }
    }

    pub fn push_atom(&mut self, name: &str, element: &str, coord: Vec3) {
        self.atoms.push(Atom {
            name: canonical_atom_name(name),
            element: element.trim().to_ascii_uppercase(),
            residue: 0,
            coord,
            alt_loc: None,
            occupancy: 1.0,
            b_factor: 0.0,
            hetero: false,
        });
    }

    pub fn atom(&self, name: &str) -> Option<&Atom> {
        let target = canonical_atom_name(name);
        self.atoms.iter().find(|a| a.name == target)
    }

    pub fn has_atom(&self, name: &str) -> bool {
        self.atom(name).is_some()
    }

    pub fn base_letter(&self) -> Option<char> {
        self.base_type.letter()
    }

    /// N9 for purines, N1 for pyrimidines, chosen from the detected type
    /// rather than by re-scanning atom names.
    pub fn glycosidic_nitrogen(&self) -> Option<&Atom> {
        if !self.base_type.is_nucleotide() {
            return None;
        }
        if self.is_purine {
            self.atom("N9")
        } else {
            self.atom("N1")
        }
    }

    pub fn ident(&self) -> String {
        match self.insertion_code {
            Some(code) => format!("{}.{}.{}{}", self.chain_id, self.name, self.seq_num, code),
            None => format!("{}.{}.{}", self.chain_id, self.name, self.seq_num),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Chain {
    pub id: char,
    /// 0-based indices into the structure residue pool, in parse order.
    pub residues: Vec<usize>,
}

/// Parsed structure: a flat residue pool plus chains holding indices into
/// it. Traversal order matches parse order; the canonical residue index is
/// the 1-based position in that traversal.
#[derive(Debug, Default)]
pub struct Structure {
    residues: Vec<Residue>,
    chains: Vec<Chain>,
}

impl Structure {
    pub fn new() -> Structure {
        Structure {
            residues: Vec::new(),
            chains: Vec::new(),
        }
    }

    pub fn push_residue(&mut self, mut residue: Residue) -> usize {
        let index = self.residues.len();
        for atom in residue.atoms.iter_mut() {
            atom.residue = index;
        }
        match self.chains.last_mut() {
            Some(chain) if chain.id == residue.chain_id => chain.residues.push(index),
            _ => self.chains.push(Chain {
                id: residue.chain_id,
                residues: vec![index],
            }),
        }
        self.residues.push(residue);
        index
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Residue by canonical (1-based) index.
    pub fn residue(&self, canonical: usize) -> &Residue {
        &self.residues[canonical - 1]
    }

    pub fn residue_mut(&mut self, canonical: usize) -> &mut Residue {
        &mut self.residues[canonical - 1]
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    /// Read a PDB or mmCIF file into a structure, keeping parse order.
    ///
    /// The reader is configured for this pipeline's needs: one model, heavy
    /// atoms only (frames and bond searches never look at hydrogens), chain
    /// ids kept as deposited so the canonical index follows the file, and a
    /// lenient strictness level because marginal depositions must still be
    /// analysable, with residue-level recovery left to type detection.
    pub fn from_path(path: &Path) -> Result<Structure, PipelineError> {
        let input = path.to_string_lossy().to_string();
        let fail = |reason: String| PipelineError::Structure {
            path: input.clone(),
            reason,
        };

        let mut reader = ReadOptions::new();
        reader
            .set_level(StrictnessLevel::Loose)
            .set_discard_hydrogens(true)
            .set_only_first_model(true)
            .set_only_atomic_coords(true)
            .set_capitalise_chains(false);
        if let Some(format) = Structure::format_for(path) {
            reader.set_format(format);
        }

        match reader.read(&input) {
            Ok((pdb, _)) => Ok(Structure::from_pdbtbx(&pdb)),
            Err(issues) => {
                let mut reason = String::new();
                for issue in issues {
                    if !reason.is_empty() {
                        reason.push_str("; ");
                    }
                    reason.push_str(&issue.to_string());
                }
                Err(fail(reason))
            }
        }
    }

    /// File format from the extension; unknown extensions are left for the
    /// reader to sniff.
    fn format_for(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "cif" | "mmcif" => Some(Format::Mmcif),
            "pdb" | "pdb1" | "ent" => Some(Format::Pdb),
            _ => None,
        }
    }

    pub fn from_pdbtbx(pdb: &pdbtbx::PDB) -> Structure {
        #[derive(PartialEq, Eq, Hash, Clone)]
        struct Key {
            chain: char,
            seq_num: i32,
            insertion_code: Option<char>,
            name: String,
        }
        struct Row {
            serial: usize,
            name: String,
            element: String,
            coord: Vec3,
            alt_loc: Option<char>,
            occupancy: f64,
            b_factor: f64,
            hetero: bool,
        }

        let mut groups: HashMap<Key, Vec<Row>> = HashMap::new();
        for h in pdb.atoms_with_hierarchy() {
            let name = canonical_residue_name(h.conformer().name());
            if name == "HOH" || name == "WAT" {
                continue;
            }
            let key = Key {
                chain: h.chain().id().chars().next().unwrap_or(' '),
                seq_num: i32::try_from(h.residue().serial_number()).unwrap_or(9999),
                insertion_code: h.residue().insertion_code().and_then(|s| s.chars().next()),
                name,
            };
            let atom = h.atom();
            groups.entry(key).or_default().push(Row {
                serial: atom.serial_number(),
                name: atom.name().to_string(),
                element: atom.element().map(Element::symbol).unwrap_or("").to_string(),
                coord: Vec3::new(atom.x(), atom.y(), atom.z()),
                alt_loc: h
                    .conformer()
                    .alternative_location()
                    .and_then(|s| s.chars().next()),
                occupancy: atom.occupancy(),
                b_factor: atom.b_factor(),
                hetero: atom.hetero(),
            });
        }

        // Restore parse order: residues by their first atom serial, atoms by serial.
        let mut entries: Vec<(usize, Key, Vec<Row>)> = groups
            .into_iter()
            .map(|(key, mut rows)| {
                rows.sort_by_key(|r| r.serial);
                let first = rows.first().map(|r| r.serial).unwrap_or(usize::MAX);
                (first, key, rows)
            })
            .collect();
        entries.sort_by_key(|(first, _, _)| *first);

        let mut structure = Structure::new();
        for (_, key, rows) in entries {
            let mut residue = Residue::new(&key.name, key.chain, key.seq_num);
            residue.insertion_code = key.insertion_code;
            for row in rows {
                residue.atoms.push(Atom {
                    name: canonical_atom_name(&row.name),
                    element: row.element.trim().to_ascii_uppercase(),
                    residue: 0,
                    coord: row.coord,
                    alt_loc: row.alt_loc,
                    occupancy: row.occupancy,
                    b_factor: row.b_factor,
                    hetero: row.hetero,
                });
            }
            structure.push_residue(residue);
        }
        structure
    }
}

// Alternate atom spellings seen in older depositions, folded onto the
// names the templates and the ring matcher use. Stars-for-primes and case
// are handled before this table applies.
const ATOM_NAME_ALIASES: [(&str, &str); 7] = [
    ("O1'", "O4'"),
    ("OL", "O1P"),
    ("OR", "O2P"),
    ("C5A", "C5M"),
    ("C7", "C5M"),
    ("O5T", "O5'"),
    ("O3T", "O3'"),
];

/// Normalise an atom name: trimmed, uppercase, primes instead of stars,
/// and known alternate spellings folded onto the canonical one.
pub fn canonical_atom_name(raw: &str) -> String {
    let name: String = raw
        .trim()
        .chars()
        .map(|c| if c == '*' { '\'' } else { c.to_ascii_uppercase() })
        .collect();
    for (alias, canonical) in ATOM_NAME_ALIASES {
        if name == alias {
            return canonical.to_string();
        }
    }
    name
}

/// Normalise a residue name: uppercase, with the deoxy two-letter codes
/// (DA, DC, DG, DT) folded onto the bare base letter the templates cover.
pub fn canonical_residue_name(raw: &str) -> String {
    let name = raw.trim().to_ascii_uppercase();
    if let Some(base) = name.strip_prefix('D') {
        if base.len() == 1 && "ATGC".contains(base) {
            return base.to_string();
        }
    }
    name
}
