use crate::core::utility::{perceived_utility, utility};
use crate::models::Agent;
use std::cmp::Ordering;

/// Produce a total order over counterpart ids, best first.
///
/// Descending utility as perceived by `agent`; ties broken by ascending
/// original index so identical inputs always produce identical orderings.
/// When `bias_mode` is set the perceived (bias-shifted) utility drives the
/// order; this only differs from the true utility for reviewers carrying a
/// bias weight.
pub fn rank_counterparts(agent: &Agent, counterparts: &[Agent], bias_mode: bool) -> Vec<usize> {
    let utilities: Vec<f64> = counterparts
        .iter()
        .map(|counterpart| {
            if bias_mode {
                perceived_utility(agent, counterpart)
            } else {
                utility(agent, counterpart)
            }
        })
        .collect();

    let mut order: Vec<usize> = (0..counterparts.len()).collect();
    order.sort_by(|&i, &j| {
        utilities[j]
            .partial_cmp(&utilities[i])
            .unwrap_or(Ordering::Equal)
            .then_with(|| i.cmp(&j))
    });
    order
}

/// Rank every applicant's view of the reviewer population in one pass.
/// Rankings are computed up front and stay immutable for the whole run.
pub fn build_rankings(applicants: &[Agent], reviewers: &[Agent]) -> Vec<Vec<usize>> {
    applicants
        .iter()
        .map(|applicant| rank_counterparts(applicant, reviewers, false))
        .collect()
}
