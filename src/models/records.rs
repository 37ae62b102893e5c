use serde::{Deserialize, Serialize};

/// Aggregate statistics for one completed round of the matching loop.
/// Records are append-only; once emitted they are never touched again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub iterat: u32,
    pub a_match_count: usize,
    pub a_unmatch_count: usize,
    pub b_match_count: usize,
    pub b_unmatch_count: usize,
    /// Mean over the whole population, unmatched agents contributing 0
    pub a_match_utility_mean: f64,
    pub b_match_utility_mean: f64,
    pub breakups_count: usize,
    pub q_reset_count: usize,
    pub rejections_count: usize,
    pub pass_matched_count: usize,
}

/// Bias-mode output fields for one applicant row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasFields {
    /// Reviewer assigned by the run whose decisions used biased perception
    pub bidap_jobid: Option<usize>,
    /// The assigned reviewer's perceived (biased) value of this applicant
    pub a_apparent_v: Option<f64>,
    /// Apparent value with the bias contribution removed
    pub a_bias_corrected_v: Option<f64>,
}

/// Extended match-detail fields for one row: the characteristics of each
/// side's assigned counterpart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationFields {
    pub a_match_chars: Option<Vec<f64>>,
    pub b_match_chars: Option<Vec<f64>>,
}

/// One output row per initial index, read off the terminal match state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub initial_index: usize,
    /// Reviewer assigned to the applicant at this index, if any
    pub dap_jobid: Option<usize>,
    /// Utility against the same-row counterpart of the input table
    pub a_obs_u: f64,
    pub b_obs_u: f64,
    /// Utility realized from the assigned match, 0 when unmatched
    pub a_dap_u: f64,
    pub b_dap_u: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bias: Option<BiasFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<AllocationFields>,
}

/// End-of-run summary written next to the output files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub spec_name: String,
    pub market_size: usize,
    pub iterations: u32,
    pub proposals: usize,
    pub matched_count: usize,
    pub unmatched_count: usize,
    pub bias: bool,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}
