use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::constants::REGISTRY_FILE;
use super::errors::PipelineError;
use super::structure::{canonical_residue_name, BaseKind};
use super::templates::TemplateStore;

/// One modified nucleotide known to the registry.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub kind: BaseKind,
    pub is_purine: bool,
    /// Template file to fit against, e.g. "Atomic.u.pdb".
    pub template: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    code: String,
    #[serde(rename = "type")]
    base_type: String,
    template: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawRegistry {
    #[serde(default)]
    modified_adenines: BTreeMap<String, RawEntry>,
    #[serde(default)]
    modified_guanines: BTreeMap<String, RawEntry>,
    #[serde(default)]
    modified_cytosines: BTreeMap<String, RawEntry>,
    #[serde(default)]
    modified_thymines: BTreeMap<String, RawEntry>,
    #[serde(default)]
    modified_uracils: BTreeMap<String, RawEntry>,
    #[serde(default)]
    modified_inosines: BTreeMap<String, RawEntry>,
    #[serde(default)]
    modified_pseudouridines: BTreeMap<String, RawEntry>,
}

fn kind_from_type_name(name: &str) -> Option<BaseKind> {
    match name.to_ascii_uppercase().as_str() {
        "ADENINE" => Some(BaseKind::Adenine),
        "CYTOSINE" => Some(BaseKind::Cytosine),
        "GUANINE" => Some(BaseKind::Guanine),
        "THYMINE" => Some(BaseKind::Thymine),
        "URACIL" => Some(BaseKind::Uracil),
        "INOSINE" => Some(BaseKind::Inosine),
        "PSEUDOURIDINE" => Some(BaseKind::Pseudouridine),
        _ => None,
    }
}

/// The modified-nucleotide registry, authoritative for residue codes whose
/// geometry would mislead the RMSD detector. Read once at startup,
/// immutable afterwards.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, RegistryEntry>,
}

impl Registry {
    /// An empty registry; every lookup falls back to RMSD detection.
    pub fn empty() -> Registry {
        Registry::default()
    }

    pub fn load(path: &Path) -> Result<Registry, PipelineError> {
        let err = |reason: String| PipelineError::Registry {
            path: path.to_string_lossy().to_string(),
            reason,
        };
        let file = File::open(path).map_err(|e| err(e.to_string()))?;
        let reader = BufReader::new(file);
        let raw: RawRegistry = serde_json::from_reader(reader).map_err(|e| err(e.to_string()))?;

        let mut entries = HashMap::new();
        let groups = [
            raw.modified_adenines,
            raw.modified_guanines,
            raw.modified_cytosines,
            raw.modified_thymines,
            raw.modified_uracils,
            raw.modified_inosines,
            raw.modified_pseudouridines,
        ];
        for group in groups {
            for (code, entry) in group {
                let kind = kind_from_type_name(&entry.base_type).ok_or_else(|| {
                    err(format!(
                        "unknown base type {:?} for residue code {:?}",
                        entry.base_type, code
                    ))
                })?;
                let expected = kind.letter().to_ascii_lowercase().to_string();
                if entry.code != expected {
                    return Err(err(format!(
                        "residue code {:?}: code {:?} does not match type {:?}",
                        code, entry.code, entry.base_type
                    )));
                }
                entries.insert(
                    canonical_residue_name(&code),
                    RegistryEntry {
                        kind,
                        is_purine: kind.is_purine(),
                        template: entry.template,
                        description: entry.description,
                    },
                );
            }
        }
        Ok(Registry { entries })
    }

    /// Load from the conventional location inside the data directory.
    pub fn load_default() -> Result<Registry, PipelineError> {
        Registry::load(&TemplateStore::default_dir().join(REGISTRY_FILE))
    }

    pub fn lookup(&self, residue_name: &str) -> Option<&RegistryEntry> {
        self.entries.get(&canonical_residue_name(residue_name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
