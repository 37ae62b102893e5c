use crate::models::Agent;

/// Utility an agent derives from being matched with `counterpart`.
///
/// Linear trade-off model: the counterpart's first characteristic plus each
/// remaining characteristic converted into first-characteristic units by the
/// agent's corresponding MRS weight. With four characteristics this is
/// `c1 + mrs12*c2 + mrs13*c3 + mrs14*c4`.
///
/// Pure function of its inputs. Callers validate the market first, so every
/// value here is finite and the weight count matches the counterpart's
/// secondary characteristic count.
#[inline]
pub fn utility(of: &Agent, counterpart: &Agent) -> f64 {
    debug_assert_eq!(of.mrs_weights.len(), counterpart.characteristics.len() - 1);

    let mut total = counterpart.characteristics[0];
    for (weight, value) in of.mrs_weights.iter().zip(&counterpart.characteristics[1..]) {
        total += weight * value;
    }
    total
}

/// Utility as perceived by a reviewer when bias mode is active.
///
/// Adds `bias_weight * bias_attribute` on top of the true utility. This is a
/// perception distortion only; it shifts how the reviewer ranks applicants
/// without changing the payoff the match actually delivers.
#[inline]
pub fn perceived_utility(reviewer: &Agent, applicant: &Agent) -> f64 {
    let base = utility(reviewer, applicant);
    match reviewer.bias_weight {
        Some(weight) => base + weight * applicant.bias_attribute_or_zero(),
        None => base,
    }
}

/// The bias portion of a reviewer's perceived utility for an applicant.
/// Subtracting this from the apparent value recovers the corrected value.
#[inline]
pub fn bias_contribution(reviewer: &Agent, applicant: &Agent) -> f64 {
    reviewer.bias_weight.unwrap_or(0.0) * applicant.bias_attribute_or_zero()
}
