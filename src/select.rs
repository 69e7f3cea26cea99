use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::errors::PipelineError;
use super::report::Recorder;
use super::structure::Structure;
use super::validate::{self, ValidationResult};
use super::PairParams;

/// A committed pair, canonical residue indices i < j.
#[derive(Debug, Clone, Serialize)]
pub struct SelectedPair {
    pub i: usize,
    pub j: usize,
    pub letters: String,
    pub quality: f64,
    pub result: ValidationResult,
}

/// Output of the selection stage.
#[derive(Debug, Default)]
pub struct SelectionOutcome {
    /// Pairs in the order they were committed.
    pub pairs: Vec<SelectedPair>,
    pub pairs_tested: usize,
    pub pairs_valid: usize,
    /// Overall best valid partner per residue (0-based position holds the
    /// partner of canonical residue index position+1).
    pub best_partner: Vec<Option<usize>>,
    /// Outer iterations until the greedy matching settled.
    pub iterations: usize,
}

/// Mutual-best greedy matching over all residues with frames, in canonical
/// order. Every candidate pair is validated once up front; the outer loop
/// then commits pairs whose members pick each other as their best
/// unmatched partner, and repeats until nothing moves. Ties on quality go
/// to the smaller canonical index. A cooperative cancellation flag is
/// checked between outer iterations.
pub fn select_pairs(
    structure: &Structure,
    params: &PairParams,
    cancel: Option<&AtomicBool>,
    recorder: &mut dyn Recorder,
) -> Result<SelectionOutcome, PipelineError> {
    let n = structure.len();
    let mut outcome = SelectionOutcome {
        best_partner: vec![None; n],
        ..SelectionOutcome::default()
    };

    let framed: Vec<usize> = (1..=n)
        .filter(|&index| structure.residue(index).frame.is_some())
        .collect();

    // Frames are immutable during selection, so one validation sweep
    // serves every outer iteration.
    let mut results: HashMap<(usize, usize), ValidationResult> = HashMap::new();
    let mut candidates: Vec<Vec<(f64, usize)>> = vec![Vec::new(); n + 1];
    for (a, &i) in framed.iter().enumerate() {
        for &j in framed.iter().skip(a + 1) {
            outcome.pairs_tested += 1;
            match validate::validate_pair(structure, i, j, params) {
                Ok(result) => {
                    recorder.pair_tested(i, j, &Ok(result.clone()));
                    candidates[i].push((result.quality, j));
                    candidates[j].push((result.quality, i));
                    results.insert((i, j), result);
                    outcome.pairs_valid += 1;
                }
                Err(why) => {
                    recorder.pair_tested(i, j, &Err(why));
                }
            }
        }
    }
    for list in candidates.iter_mut() {
        list.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
    }
    for &i in framed.iter() {
        outcome.best_partner[i - 1] = candidates[i].first().map(|&(_, j)| j);
    }

    let mut matched = vec![false; n + 1];
    let best_unmatched = |index: usize, matched: &[bool]| -> Option<usize> {
        candidates[index]
            .iter()
            .find(|&&(_, partner)| !matched[partner])
            .map(|&(_, partner)| partner)
    };

    loop {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(PipelineError::Cancelled {
                    iterations: outcome.iterations,
                });
            }
        }
        outcome.iterations += 1;
        let mut progress = false;

        for &i in framed.iter() {
            if matched[i] {
                continue;
            }
            let j = match best_unmatched(i, &matched) {
                Some(j) => j,
                None => continue,
            };
            if best_unmatched(j, &matched) != Some(i) {
                continue;
            }
            let key = (i.min(j), i.max(j));
            let result = results[&key].clone();
            debug!(
                "pair {}-{} ({}) committed, quality {:.3}",
                key.0, key.1, result.letters, result.quality
            );
            let pair = SelectedPair {
                i: key.0,
                j: key.1,
                letters: result.letters.clone(),
                quality: result.quality,
                result,
            };
            recorder.pair_selected(&pair);
            outcome.pairs.push(pair);
            matched[i] = true;
            matched[j] = true;
            progress = true;
        }

        if !progress {
            break;
        }
    }

    let mut seen = vec![0usize; n + 1];
    for pair in outcome.pairs.iter() {
        seen[pair.i] += 1;
        seen[pair.j] += 1;
    }
    if let Some(index) = seen.iter().position(|&count| count > 1) {
        return Err(PipelineError::InvariantViolated(format!(
            "residue {index} belongs to more than one selected pair"
        )));
    }

    Ok(outcome)
}
