use crate::models::RoundRecord;
use std::collections::VecDeque;

/// Mutable run state for one matching run, exclusively owned by the engine.
///
/// Holds the tentative match slots for both sides, each applicant's proposal
/// cursor into its preference ranking, the queue of unmatched applicants
/// awaiting their next proposal, and the counters feeding the round log.
/// Match symmetry is maintained by construction: every mutation goes through
/// the `record_*` operations, which always update both sides together.
#[derive(Debug, Clone)]
pub struct MatchState {
    applicant_match: Vec<Option<usize>>,
    reviewer_match: Vec<Option<usize>>,
    applicant_utility: Vec<f64>,
    reviewer_utility: Vec<f64>,
    /// Next rank each applicant will propose at; advances monotonically
    cursor: Vec<usize>,
    unmatched: VecDeque<usize>,
    /// Applicants whose cursor exhausted the ranking, out for good
    retired: usize,
    breakups: usize,
    rejections: usize,
    q_resets: usize,
    pass_matched: usize,
}

impl MatchState {
    pub fn new(size: usize) -> Self {
        Self {
            applicant_match: vec![None; size],
            reviewer_match: vec![None; size],
            applicant_utility: vec![0.0; size],
            reviewer_utility: vec![0.0; size],
            cursor: vec![0; size],
            unmatched: (0..size).collect(),
            retired: 0,
            breakups: 0,
            rejections: 0,
            q_resets: 0,
            pass_matched: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.applicant_match.len()
    }

    /// True once no applicant is awaiting a proposal
    pub fn is_terminal(&self) -> bool {
        self.unmatched.is_empty()
    }

    pub fn cursor(&self, applicant: usize) -> usize {
        self.cursor[applicant]
    }

    pub fn advance_cursor(&mut self, applicant: usize) {
        self.cursor[applicant] += 1;
    }

    pub fn reviewer_match(&self, reviewer: usize) -> Option<usize> {
        self.reviewer_match[reviewer]
    }

    pub fn applicant_match(&self, applicant: usize) -> Option<usize> {
        self.applicant_match[applicant]
    }

    /// Start a new round: reset the per-round counters and note how many
    /// applicants hold a tentative match and will sit this round out.
    pub fn begin_round(&mut self) {
        self.breakups = 0;
        self.rejections = 0;
        self.pass_matched = self.size() - self.unmatched.len() - self.retired;
    }

    /// Drain the queue of applicants due to propose this round
    pub fn take_unmatched(&mut self) -> Vec<usize> {
        self.unmatched.drain(..).collect()
    }

    /// Permanently remove an applicant whose ranking is exhausted
    pub fn retire(&mut self, applicant: usize) {
        debug_assert!(self.applicant_match[applicant].is_none());
        debug_assert_eq!(self.cursor[applicant], self.size());
        self.retired += 1;
    }

    pub fn retired_count(&self) -> usize {
        self.retired
    }

    /// A reviewer tentatively accepts an applicant
    pub fn record_tentative(
        &mut self,
        applicant: usize,
        reviewer: usize,
        applicant_utility: f64,
        reviewer_utility: f64,
    ) {
        debug_assert!(self.applicant_match[applicant].is_none());
        self.applicant_match[applicant] = Some(reviewer);
        self.reviewer_match[reviewer] = Some(applicant);
        self.applicant_utility[applicant] = applicant_utility;
        self.reviewer_utility[reviewer] = reviewer_utility;
    }

    /// A proposer lost the decision; back into the queue for the next round
    pub fn record_rejection(&mut self, applicant: usize) {
        self.rejections += 1;
        self.unmatched.push_back(applicant);
    }

    /// A reviewer drops its tentative partner for a better proposer.
    /// The old partner's cursor already sits past this reviewer, so it can
    /// never propose here again.
    pub fn record_breakup(&mut self, reviewer: usize, old_applicant: usize) {
        debug_assert_eq!(self.reviewer_match[reviewer], Some(old_applicant));
        self.breakups += 1;
        self.applicant_match[old_applicant] = None;
        self.applicant_utility[old_applicant] = 0.0;
        self.unmatched.push_back(old_applicant);
    }

    pub fn matched_count(&self) -> usize {
        self.applicant_match.iter().filter(|m| m.is_some()).count()
    }

    /// Snapshot of the aggregate statistics for the round that just finished
    pub fn round_record(&self, iterat: u32) -> RoundRecord {
        let size = self.size();
        let a_matched = self.matched_count();
        let b_matched = self.reviewer_match.iter().filter(|m| m.is_some()).count();
        debug_assert_eq!(a_matched, b_matched);

        RoundRecord {
            iterat,
            a_match_count: a_matched,
            a_unmatch_count: size - a_matched,
            b_match_count: b_matched,
            b_unmatch_count: size - b_matched,
            a_match_utility_mean: mean(&self.applicant_utility),
            b_match_utility_mean: mean(&self.reviewer_utility),
            breakups_count: self.breakups,
            q_reset_count: self.q_resets,
            rejections_count: self.rejections,
            pass_matched_count: self.pass_matched,
        }
    }

    /// Tear the state apart into its terminal match and utility vectors
    pub fn into_parts(self) -> (Vec<Option<usize>>, Vec<Option<usize>>, Vec<f64>, Vec<f64>) {
        (
            self.applicant_match,
            self.reviewer_match,
            self.applicant_utility,
            self.reviewer_utility,
        )
    }

    /// Check the match-symmetry invariant; compiled out of release builds
    pub fn assert_symmetry(&self) {
        for (a, slot) in self.applicant_match.iter().enumerate() {
            if let Some(r) = slot {
                debug_assert_eq!(self.reviewer_match[*r], Some(a));
            }
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    // Populations are validated non-empty before a state is ever built
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_all_unmatched() {
        let mut state = MatchState::new(3);
        assert!(!state.is_terminal());
        assert_eq!(state.matched_count(), 0);
        assert_eq!(state.take_unmatched(), vec![0, 1, 2]);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_tentative_match_is_symmetric() {
        let mut state = MatchState::new(2);
        state.begin_round();
        state.take_unmatched();
        state.record_tentative(1, 0, 10.0, 20.0);

        assert_eq!(state.applicant_match(1), Some(0));
        assert_eq!(state.reviewer_match(0), Some(1));
        state.assert_symmetry();
    }

    #[test]
    fn test_breakup_requeues_old_partner() {
        let mut state = MatchState::new(2);
        state.begin_round();
        state.take_unmatched();
        state.record_tentative(0, 0, 5.0, 5.0);

        state.record_breakup(0, 0);
        state.record_tentative(1, 0, 6.0, 6.0);

        assert_eq!(state.applicant_match(0), None);
        assert_eq!(state.reviewer_match(0), Some(1));
        assert!(!state.is_terminal());
        assert_eq!(state.take_unmatched(), vec![0]);
    }

    #[test]
    fn test_round_record_counts_and_means() {
        let mut state = MatchState::new(4);
        state.begin_round();
        state.take_unmatched();
        state.record_tentative(0, 1, 8.0, 4.0);
        state.record_tentative(2, 3, 4.0, 8.0);
        state.record_rejection(1);
        state.record_rejection(3);

        let record = state.round_record(1);
        assert_eq!(record.iterat, 1);
        assert_eq!(record.a_match_count, 2);
        assert_eq!(record.a_unmatch_count, 2);
        assert_eq!(record.b_match_count, 2);
        assert_eq!(record.rejections_count, 2);
        assert_eq!(record.breakups_count, 0);
        assert_eq!(record.q_reset_count, 0);
        // 12.0 spread over all four agents, unmatched contributing zero
        assert!((record.a_match_utility_mean - 3.0).abs() < 1e-12);
        assert!((record.b_match_utility_mean - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_pass_matched_counts_sitting_applicants() {
        let mut state = MatchState::new(3);
        state.begin_round();
        state.take_unmatched();
        state.record_tentative(0, 0, 1.0, 1.0);
        state.record_rejection(1);
        state.record_rejection(2);

        // Next round: applicant 0 holds a match and sits out
        state.begin_round();
        let record = state.round_record(2);
        assert_eq!(record.pass_matched_count, 1);
    }

    #[test]
    fn test_retire_keeps_queue_terminal() {
        let mut state = MatchState::new(2);
        state.begin_round();
        state.take_unmatched();
        state.record_tentative(0, 0, 1.0, 1.0);
        // Applicant 1 exhausts its ranking
        state.advance_cursor(1);
        state.advance_cursor(1);
        state.retire(1);

        assert!(state.is_terminal());
        assert_eq!(state.retired_count(), 1);
        assert_eq!(state.matched_count(), 1);
    }
}
