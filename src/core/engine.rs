use crate::core::ranking::build_rankings;
use crate::core::state::MatchState;
use crate::core::utility::{perceived_utility, utility};
use crate::models::{Market, MarketError, RoundRecord};
use thiserror::Error;
use tracing::{debug, info};

/// Errors surfaced by the matching engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input rejected before the first round; no partial run is attempted
    #[error("invalid input data: {0}")]
    InvalidInput(#[from] MarketError),

    /// The loop exceeded its proposal bound without reaching a fixed point.
    /// Cursors advance on every proposal and never revisit a reviewer, so
    /// this indicates an internal-consistency fault, not bad input.
    #[error("no convergence after {proposals} proposals in {iterations} rounds")]
    NonConvergence {
        iterations: u32,
        proposals: usize,
        last_round: Option<RoundRecord>,
    },

    /// Every applicant exhausted its ranking without holding a match
    #[error("market collapsed: all {size} applicants exhausted their rankings unmatched")]
    AllUnmatched { size: usize },
}

/// Phases of the matching loop; the deciding phase carries the proposals
/// collected per reviewer
#[derive(Debug)]
enum Phase {
    Proposing,
    Deciding(Vec<Vec<usize>>),
    Converged,
}

/// Terminal result of one matching run
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Reviewer held by each applicant, by initial index
    pub applicant_match: Vec<Option<usize>>,
    /// Applicant held by each reviewer, by initial index
    pub reviewer_match: Vec<Option<usize>>,
    /// Utility each applicant realizes from its match, 0 when unmatched
    pub applicant_utility: Vec<f64>,
    /// Utility each reviewer realizes, on its decision basis
    pub reviewer_utility: Vec<f64>,
    /// One record per completed round, in order
    pub rounds: Vec<RoundRecord>,
    pub iterations: u32,
    pub proposals: usize,
}

impl MatchOutcome {
    pub fn matched_count(&self) -> usize {
        self.applicant_match.iter().filter(|m| m.is_some()).count()
    }
}

/// Deferred-acceptance engine.
///
/// Applicants propose in strict descending preference order while reviewers
/// hold at most one tentative partner, trading up whenever a better proposer
/// arrives. Proposals are only ever tentative until the loop reaches its
/// fixed point, which makes the terminal matching stable and best possible
/// for the proposing side among all stable matchings.
///
/// The engine owns the whole run: rankings are materialized up front and the
/// sequential propose/decide loop runs over in-memory state with no I/O.
///
/// # Example
/// ```
/// use dap_match::models::{Agent, Market};
/// use dap_match::core::DeferredAcceptance;
///
/// let market = Market::new(
///     vec![
///         Agent::new(0, vec![1.0, 0.0], vec![1.0]),
///         Agent::new(1, vec![2.0, 0.0], vec![1.0]),
///     ],
///     vec![
///         Agent::new(0, vec![3.0, 0.0], vec![1.0]),
///         Agent::new(1, vec![4.0, 0.0], vec![1.0]),
///     ],
/// );
///
/// let engine = DeferredAcceptance::new(&market, false).unwrap();
/// let outcome = engine.run().unwrap();
/// assert_eq!(outcome.matched_count(), 2);
/// ```
#[derive(Debug)]
pub struct DeferredAcceptance<'m> {
    market: &'m Market,
    rankings: Vec<Vec<usize>>,
    bias_mode: bool,
}

impl<'m> DeferredAcceptance<'m> {
    /// Validate the market and materialize every applicant's ranking.
    ///
    /// Fails fast on invalid input; nothing is mutated before this passes.
    pub fn new(market: &'m Market, bias_mode: bool) -> Result<Self, EngineError> {
        market.validate(bias_mode)?;
        let rankings = build_rankings(&market.applicants, &market.reviewers);
        Ok(Self {
            market,
            rankings,
            bias_mode,
        })
    }

    /// Drive the propose/decide loop to its fixed point.
    ///
    /// Each round every queued applicant proposes to the best reviewer it
    /// has not tried yet, then every reviewer with proposals keeps the
    /// single best candidate and rejects the rest. The loop converges once
    /// no applicant is left waiting; it is bounded by one proposal per
    /// applicant/reviewer pair.
    pub fn run(&self) -> Result<MatchOutcome, EngineError> {
        let size = self.market.size();
        let proposal_bound = size * size;

        let mut state = MatchState::new(size);
        let mut rounds: Vec<RoundRecord> = Vec::new();
        let mut iterations: u32 = 0;
        let mut proposals_total: usize = 0;
        let mut phase = Phase::Proposing;

        loop {
            phase = match phase {
                Phase::Proposing => {
                    state.begin_round();
                    Phase::Deciding(self.collect_proposals(
                        &mut state,
                        &mut proposals_total,
                        proposal_bound,
                        iterations,
                        &rounds,
                    )?)
                }
                Phase::Deciding(proposals) => {
                    self.resolve_proposals(&mut state, proposals);
                    state.assert_symmetry();

                    iterations += 1;
                    let record = state.round_record(iterations);
                    debug!(
                        iterat = record.iterat,
                        matched = record.a_match_count,
                        breakups = record.breakups_count,
                        rejections = record.rejections_count,
                        "round complete"
                    );
                    if iterations % 10 == 0 {
                        info!(
                            "progress: {:.2}% matched after {} rounds",
                            record.a_match_count as f64 / size as f64 * 100.0,
                            iterations
                        );
                    }
                    rounds.push(record);

                    if state.is_terminal() {
                        Phase::Converged
                    } else {
                        Phase::Proposing
                    }
                }
                Phase::Converged => break,
            };
        }

        if state.matched_count() == 0 {
            return Err(EngineError::AllUnmatched { size });
        }

        let (applicant_match, reviewer_match, applicant_utility, reviewer_utility) =
            state.into_parts();

        Ok(MatchOutcome {
            applicant_match,
            reviewer_match,
            applicant_utility,
            reviewer_utility,
            rounds,
            iterations,
            proposals: proposals_total,
        })
    }

    /// Proposing phase: each queued applicant targets the reviewer at its
    /// cursor and the cursor advances, so a rejected reviewer is never
    /// revisited. Returns the proposals grouped per reviewer.
    fn collect_proposals(
        &self,
        state: &mut MatchState,
        proposals_total: &mut usize,
        proposal_bound: usize,
        iterations: u32,
        rounds: &[RoundRecord],
    ) -> Result<Vec<Vec<usize>>, EngineError> {
        let size = state.size();
        let mut proposals: Vec<Vec<usize>> = vec![Vec::new(); size];

        for applicant in state.take_unmatched() {
            let rank = state.cursor(applicant);
            if rank >= size {
                // Proposed to and been rejected by every reviewer; a normal
                // market outcome for this applicant, fatal only if it
                // happens to everyone.
                state.retire(applicant);
                continue;
            }

            *proposals_total += 1;
            if *proposals_total > proposal_bound {
                return Err(EngineError::NonConvergence {
                    iterations,
                    proposals: *proposals_total,
                    last_round: rounds.last().cloned(),
                });
            }

            let reviewer = self.rankings[applicant][rank];
            state.advance_cursor(applicant);
            proposals[reviewer].push(applicant);
        }

        Ok(proposals)
    }

    /// Deciding phase: every reviewer with proposals compares them against
    /// its current partner and keeps the single best candidate. Ties go to
    /// the lower applicant index. Losers re-enter the queue.
    fn resolve_proposals(&self, state: &mut MatchState, proposals: Vec<Vec<usize>>) {
        for (reviewer, mut candidates) in proposals.into_iter().enumerate() {
            if candidates.is_empty() {
                continue;
            }

            let incumbent = state.reviewer_match(reviewer);
            if let Some(current) = incumbent {
                candidates.push(current);
            }
            // Ascending order plus a strict comparison below makes the
            // lower index win every tie.
            candidates.sort_unstable();

            let mut winner = candidates[0];
            let mut winner_utility = self.decision_utility(reviewer, winner);
            for &candidate in &candidates[1..] {
                let candidate_utility = self.decision_utility(reviewer, candidate);
                if candidate_utility > winner_utility {
                    winner = candidate;
                    winner_utility = candidate_utility;
                }
            }

            match incumbent {
                Some(current) if current == winner => {
                    // Holding on; every proposer goes back in the queue
                    for &candidate in &candidates {
                        if candidate != winner {
                            state.record_rejection(candidate);
                        }
                    }
                }
                _ => {
                    if let Some(current) = incumbent {
                        state.record_breakup(reviewer, current);
                    }
                    for &candidate in &candidates {
                        if candidate != winner && Some(candidate) != incumbent {
                            state.record_rejection(candidate);
                        }
                    }
                    let applicant_utility =
                        utility(&self.market.applicants[winner], &self.market.reviewers[reviewer]);
                    state.record_tentative(winner, reviewer, applicant_utility, winner_utility);
                }
            }
        }
    }

    /// Utility basis reviewers decide on: perceived when bias mode is
    /// active, true utility otherwise
    #[inline]
    fn decision_utility(&self, reviewer: usize, applicant: usize) -> f64 {
        let reviewer_agent = &self.market.reviewers[reviewer];
        let applicant_agent = &self.market.applicants[applicant];
        if self.bias_mode {
            perceived_utility(reviewer_agent, applicant_agent)
        } else {
            utility(reviewer_agent, applicant_agent)
        }
    }
}
