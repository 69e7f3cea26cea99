use serde::Serialize;
use serde_json::json;
use std::io::Write;

use super::errors::{ClassificationRejection, PairRejection};
use super::select::SelectedPair;
use super::structure::Residue;
use super::validate::ValidationResult;

/// Observer for per-residue and per-pair events. The pipeline writes to
/// it; in-memory callers keep the null implementation, batch tools plug in
/// a serialising one.
pub trait Recorder {
    fn residue_classified(&mut self, _index: usize, _residue: &Residue) {}
    fn residue_rejected(
        &mut self,
        _index: usize,
        _residue: &Residue,
        _why: &ClassificationRejection,
    ) {
    }
    fn pair_tested(
        &mut self,
        _i: usize,
        _j: usize,
        _outcome: &Result<ValidationResult, PairRejection>,
    ) {
    }
    fn pair_selected(&mut self, _pair: &SelectedPair) {}
}

/// Discards every event.
pub struct NullRecorder;

impl Recorder for NullRecorder {}

/// Counters summarising one run, kept even when the run terminates early.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    pub residues_total: usize,
    pub nucleotides: usize,
    pub residues_rejected: usize,
    pub amino_acids: usize,
    pub pairs_tested: usize,
    pub pairs_valid: usize,
    pub pairs_selected: usize,
    pub helices: usize,
    pub steps: usize,
    /// The error that terminated the run early, if any.
    pub error: Option<String>,
}

/// Writes one JSON object per event, one per line.
pub struct JsonlRecorder<W: Write> {
    out: W,
}

impl<W: Write> JsonlRecorder<W> {
    pub fn new(out: W) -> JsonlRecorder<W> {
        JsonlRecorder { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, value: serde_json::Value) {
        // A broken diagnostics sink must not take the run down.
        let _ = writeln!(self.out, "{value}");
    }
}

impl<W: Write> Recorder for JsonlRecorder<W> {
    fn residue_classified(&mut self, index: usize, residue: &Residue) {
        self.emit(json!({
            "event": "residue",
            "index": index,
            "ident": residue.ident(),
            "base": residue.base_letter().map(String::from).unwrap_or_default(),
            "purine": residue.is_purine,
            "rms_fit": residue.rms_fit,
            "matched_atoms": residue.matched_atoms,
        }));
    }

    fn residue_rejected(&mut self, index: usize, residue: &Residue, why: &ClassificationRejection) {
        self.emit(json!({
            "event": "residue_rejected",
            "index": index,
            "ident": residue.ident(),
            "reason": why.to_string(),
        }));
    }

    fn pair_tested(&mut self, i: usize, j: usize, outcome: &Result<ValidationResult, PairRejection>) {
        match outcome {
            Ok(result) => self.emit(json!({
                "event": "pair",
                "i": i,
                "j": j,
                "letters": result.letters,
                "quality": result.quality,
                "bp_type": result.bp_type.legacy_id(),
            })),
            Err(why) => self.emit(json!({
                "event": "pair_rejected",
                "i": i,
                "j": j,
                "reason": why.to_string(),
            })),
        }
    }

    fn pair_selected(&mut self, pair: &SelectedPair) {
        self.emit(json!({
            "event": "selected",
            "i": pair.i,
            "j": pair.j,
            "letters": pair.letters,
            "quality": pair.quality,
            "bp_type": pair.result.bp_type.legacy_id(),
            "hbonds": pair.result.hbonds,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ClassificationRejection;
    use crate::structure::Residue;

    #[test]
    fn jsonl_recorder_emits_one_object_per_event() {
        let mut recorder = JsonlRecorder::new(Vec::new());
        let mut residue = Residue::new("GLC", 'A', 5);
        residue.rms_fit = None;
        recorder.residue_rejected(3, &residue, &ClassificationRejection::MissingSugarCarbon);
        recorder.residue_classified(4, &residue);

        let bytes = recorder.into_inner();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "residue_rejected");
        assert_eq!(first["index"], 3);
        assert!(first["reason"].as_str().unwrap().contains("C1'"));

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "residue");
        assert_eq!(second["ident"], "A.GLC.5");
    }

    #[test]
    fn null_recorder_accepts_everything() {
        let residue = Residue::new("U", 'A', 1);
        NullRecorder.residue_classified(1, &residue);
        NullRecorder.residue_rejected(1, &residue, &ClassificationRejection::NotANucleotide);
    }
}
