use crate::core::engine::MatchOutcome;
use crate::core::utility::{bias_contribution, perceived_utility, utility};
use crate::models::{AllocationFields, BiasFields, Market, MatchRecord};

/// Translate terminal match state into one output record per initial index.
///
/// Each row carries the assigned reviewer, the utilities both sides realize
/// from their assignments, and the observed utility against the same-row
/// counterpart of the input table. The observed value exists purely for
/// comparison with the externally supplied pairing; the engine never uses
/// it. When a biased outcome is supplied its assignment and the
/// apparent/corrected value chain are included, and `include_allocation`
/// adds each side's matched-counterpart characteristics.
pub fn materialize(
    market: &Market,
    outcome: &MatchOutcome,
    biased_outcome: Option<&MatchOutcome>,
    include_allocation: bool,
) -> Vec<MatchRecord> {
    let size = market.size();
    let mut records = Vec::with_capacity(size);

    for index in 0..size {
        let applicant = &market.applicants[index];
        let reviewer = &market.reviewers[index];

        let bias = biased_outcome.map(|shadow| {
            let bidap_jobid = shadow.applicant_match[index];
            let apparent = bidap_jobid.map(|r| {
                perceived_utility(&market.reviewers[r], applicant)
            });
            let corrected = bidap_jobid.map(|r| {
                perceived_utility(&market.reviewers[r], applicant)
                    - bias_contribution(&market.reviewers[r], applicant)
            });
            BiasFields {
                bidap_jobid,
                a_apparent_v: apparent,
                a_bias_corrected_v: corrected,
            }
        });

        let allocation = include_allocation.then(|| AllocationFields {
            a_match_chars: outcome.applicant_match[index]
                .map(|r| market.reviewers[r].characteristics.clone()),
            b_match_chars: outcome.reviewer_match[index]
                .map(|a| market.applicants[a].characteristics.clone()),
        });

        records.push(MatchRecord {
            initial_index: index,
            dap_jobid: outcome.applicant_match[index],
            a_obs_u: utility(applicant, reviewer),
            b_obs_u: utility(reviewer, applicant),
            a_dap_u: outcome.applicant_utility[index],
            b_dap_u: outcome.reviewer_utility[index],
            bias,
            allocation,
        });
    }

    records
}
