use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::{DATA_DIR_ENV, DEFAULT_DATA_DIR, MAX_FRAME_RMS};
use super::errors::PipelineError;
use super::geometry::Vec3;
use super::structure::canonical_atom_name;

/// Standard-base template: atom name to coordinate map in the standard
/// reference frame, where the base plane is z = 0 and x points toward the
/// glycosidic attachment.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    atoms: Vec<(String, Vec3)>,
    index: HashMap<String, usize>,
    /// Residues fitting worse than this get no frame.
    pub tolerance: f64,
}

impl Template {
    pub fn from_atoms(name: &str, atoms: Vec<(String, Vec3)>) -> Template {
        let mut index = HashMap::new();
        for (i, (atom_name, _)) in atoms.iter().enumerate() {
            index.entry(atom_name.clone()).or_insert(i);
        }
        Template {
            name: name.to_string(),
            atoms,
            index,
            tolerance: MAX_FRAME_RMS,
        }
    }

    /// Parse the ATOM/HETATM records of a template coordinate file.
    pub fn parse(name: &str, text: &str) -> Result<Template, String> {
        let mut atoms = Vec::new();
        for line in text.lines() {
            if !line.starts_with("ATOM") && !line.starts_with("HETATM") {
                continue;
            }
            if line.len() < 54 {
                return Err(format!("short ATOM record in {name}: {line:?}"));
            }
            let atom_name = canonical_atom_name(&line[12..16]);
            let x = line[30..38].trim().parse::<f64>();
            let y = line[38..46].trim().parse::<f64>();
            let z = line[46..54].trim().parse::<f64>();
            match (x, y, z) {
                (Ok(x), Ok(y), Ok(z)) => atoms.push((atom_name, Vec3::new(x, y, z))),
                _ => return Err(format!("bad coordinates in {name}: {line:?}")),
            }
        }
        if atoms.is_empty() {
            return Err(format!("{name} holds no ATOM records"));
        }
        Ok(Template::from_atoms(name, atoms))
    }

    pub fn coord(&self, atom_name: &str) -> Option<Vec3> {
        let target = canonical_atom_name(atom_name);
        self.index.get(&target).map(|&i| self.atoms[i].1)
    }

    pub fn has_atom(&self, atom_name: &str) -> bool {
        self.coord(atom_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

/// Read-through cache of template files, keyed by file name inside the
/// data directory. Immutable once a template has been loaded.
#[derive(Debug)]
pub struct TemplateStore {
    dir: PathBuf,
    cache: HashMap<String, Template>,
}

impl TemplateStore {
    pub fn new(dir: &Path) -> TemplateStore {
        TemplateStore {
            dir: dir.to_path_buf(),
            cache: HashMap::new(),
        }
    }

    /// Data directory from the environment, with the conventional fallback.
    pub fn default_dir() -> PathBuf {
        match env::var(DATA_DIR_ENV) {
            Ok(val) => PathBuf::from(val),
            Err(_) => PathBuf::from(DEFAULT_DATA_DIR),
        }
    }

    pub fn with_default_dir() -> TemplateStore {
        TemplateStore::new(&TemplateStore::default_dir())
    }

    pub fn get(&mut self, file_name: &str) -> Result<&Template, PipelineError> {
        if !self.cache.contains_key(file_name) {
            let path = self.dir.join(file_name);
            let text = fs::read_to_string(&path).map_err(|e| PipelineError::Template {
                name: file_name.to_string(),
                reason: e.to_string(),
            })?;
            let template =
                Template::parse(file_name, &text).map_err(|reason| PipelineError::Template {
                    name: file_name.to_string(),
                    reason,
                })?;
            self.cache.insert(file_name.to_string(), template);
        }
        Ok(&self.cache[file_name])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
ATOM      1  C1'   U A   1      -2.481   5.354   0.000
ATOM      2  N1    U A   1      -1.284   4.500   0.000
ATOM      3  C2    U A   1      -1.462   3.131   0.000
";

    #[test]
    fn parses_atom_records() {
        let template = Template::parse("Atomic_U.pdb", SAMPLE).unwrap();
        assert_eq!(template.len(), 3);
        let n1 = template.coord("N1").unwrap();
        assert!((n1.x - -1.284).abs() < 1e-12);
        assert!((n1.y - 4.500).abs() < 1e-12);
        assert!(template.has_atom("C1'"));
        assert!(!template.has_atom("N9"));
    }

    #[test]
    fn rejects_empty_and_malformed_input() {
        assert!(Template::parse("x", "REMARK nothing here\n").is_err());
        assert!(Template::parse("x", "ATOM      1  N1\n").is_err());
    }

    #[test]
    fn store_loads_and_caches_shipped_templates() {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
        let mut store = TemplateStore::new(&dir);
        let len = store.get("Atomic_A.pdb").unwrap().len();
        assert!(len >= 10, "adenine template too small: {len}");
        // Second access comes from the cache.
        assert_eq!(store.get("Atomic_A.pdb").unwrap().len(), len);
        assert!(store.get("Atomic_Z.pdb").is_err());
    }
}
