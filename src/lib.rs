#[macro_use]
extern crate lazy_static;

pub mod constants;
pub mod errors;
pub mod frame;
pub mod geometry;
pub mod hbond;
pub mod helix;
pub mod overlap;
pub mod params;
pub mod registry;
pub mod report;
pub mod select;
pub mod structure;
pub mod templates;
pub mod typing;
pub mod validate;

use log::info;
use serde::Deserialize;
use std::sync::atomic::AtomicBool;

use errors::PipelineError;
use frame::FrameSummary;
use helix::HelixOrdering;
use params::StepRecord;
use registry::Registry;
use report::{NullRecorder, Recorder, RunReport};
use select::SelectedPair;
use structure::{Frame, Structure};
use templates::TemplateStore;

/// Thresholds of the pairing pipeline. The defaults come from
/// `constants`; a driver may deserialise overrides from a settings file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PairParams {
    pub min_dorg: f64,
    pub max_dorg: f64,
    pub min_dv: f64,
    pub max_dv: f64,
    pub min_plane_angle: f64,
    pub max_plane_angle: f64,
    pub min_dnn: f64,
    pub max_dnn: f64,
    pub hb_lower: f64,
    pub hb_dist1: f64,
    pub hb_good_lower: f64,
    pub hb_good_upper: f64,
    pub hb_atoms: String,
    pub min_base_hb: usize,
    pub check_overlap: bool,
    pub max_overlap: f64,
    pub helix_break_dist: f64,
}

impl Default for PairParams {
    fn default() -> PairParams {
        PairParams {
            min_dorg: constants::MIN_DORG,
            max_dorg: constants::MAX_DORG,
            min_dv: constants::MIN_DV,
            max_dv: constants::MAX_DV,
            min_plane_angle: constants::MIN_PLANE_ANGLE,
            max_plane_angle: constants::MAX_PLANE_ANGLE,
            min_dnn: constants::MIN_DNN,
            max_dnn: constants::MAX_DNN,
            hb_lower: constants::HB_LOWER,
            hb_dist1: constants::HB_DIST1,
            hb_good_lower: constants::HB_GOOD_LOWER,
            hb_good_upper: constants::HB_GOOD_UPPER,
            hb_atoms: constants::HB_ATOMS.to_string(),
            min_base_hb: constants::MIN_BASE_HB,
            check_overlap: true,
            max_overlap: constants::MAX_OVERLAP,
            helix_break_dist: constants::HELIX_BREAK_DIST,
        }
    }
}

/// Everything one run produces, beyond what was written onto the
/// structure's residues.
#[derive(Debug)]
pub struct Analysis {
    pub summary: FrameSummary,
    /// Selected pairs in commit order.
    pub pairs: Vec<SelectedPair>,
    /// Overall best valid partner per residue.
    pub best_partner: Vec<Option<usize>>,
    pub ordering: HelixOrdering,
    pub steps: Vec<StepRecord>,
    pub report: RunReport,
}

/// The geometry and pairing pipeline: frame assignment, pair validation
/// and selection, helix ordering, step parameters. Owns the template
/// cache; the registry is shared, read-only state.
pub struct Pipeline<'a> {
    pub registry: &'a Registry,
    pub templates: TemplateStore,
    pub params: PairParams,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a Registry, templates: TemplateStore) -> Pipeline<'a> {
        Pipeline {
            registry,
            templates,
            params: PairParams::default(),
        }
    }

    pub fn with_params(
        registry: &'a Registry,
        templates: TemplateStore,
        params: PairParams,
    ) -> Pipeline<'a> {
        Pipeline {
            registry,
            templates,
            params,
        }
    }

    pub fn run(&mut self, structure: &mut Structure) -> Result<Analysis, PipelineError> {
        self.run_with(structure, None, &mut NullRecorder)
    }

    /// Run with a cooperative cancellation flag (checked between selector
    /// iterations) and an event recorder.
    pub fn run_with(
        &mut self,
        structure: &mut Structure,
        cancel: Option<&AtomicBool>,
        recorder: &mut dyn Recorder,
    ) -> Result<Analysis, PipelineError> {
        let summary = frame::assign_frames(structure, self.registry, &mut self.templates, recorder)?;
        info!(
            "{} of {} residues recognised as nucleotides",
            summary.nucleotides,
            structure.len()
        );

        let selection = select::select_pairs(structure, &self.params, cancel, recorder)?;
        info!(
            "{} pairs selected from {} valid candidates",
            selection.pairs.len(),
            selection.pairs_valid
        );

        let residue_pairs: Vec<(usize, usize)> =
            selection.pairs.iter().map(|p| (p.i, p.j)).collect();
        let ordering = helix::organize(structure, &residue_pairs, &self.params);
        let pair_frames: Vec<Frame> = selection
            .pairs
            .iter()
            .map(|p| p.result.pair_frame)
            .collect();
        let steps = params::compute_steps(&pair_frames, &ordering);

        let report = RunReport {
            residues_total: structure.len(),
            nucleotides: summary.nucleotides,
            residues_rejected: summary.rejected,
            amino_acids: summary.amino_acids,
            pairs_tested: selection.pairs_tested,
            pairs_valid: selection.pairs_valid,
            pairs_selected: selection.pairs.len(),
            helices: ordering.helices().len(),
            steps: steps.len(),
            error: None,
        };

        Ok(Analysis {
            summary,
            pairs: selection.pairs,
            best_partner: selection.best_partner,
            ordering,
            steps,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn empty_structure_yields_an_empty_analysis() {
        let registry = Registry::empty();
        let templates =
            TemplateStore::new(&PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"));
        let mut pipeline = Pipeline::new(&registry, templates);
        let mut structure = Structure::new();
        let analysis = pipeline.run(&mut structure).unwrap();
        assert!(analysis.pairs.is_empty());
        assert!(analysis.steps.is_empty());
        assert_eq!(analysis.report.residues_total, 0);
        assert_eq!(analysis.report.pairs_selected, 0);
        assert!(analysis.report.error.is_none());
    }
}
