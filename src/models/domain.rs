use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Market side an agent belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Applicants,
    Reviewers,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Applicants => write!(f, "applicants"),
            Side::Reviewers => write!(f, "reviewers"),
        }
    }
}

/// A market participant with its observable characteristics and preference
/// weights. The id is the row index of the input table and never changes.
///
/// Mutable per-run data (current match, realized utility, proposal cursor)
/// lives in the engine's match state, not here, so an `Agent` stays valid
/// across repeated runs over the same market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub characteristics: Vec<f64>,
    #[serde(rename = "mrsWeights")]
    pub mrs_weights: Vec<f64>,
    /// Binary attribute the counterpart side may be biased on (applicants only)
    #[serde(rename = "biasAttribute", default)]
    pub bias_attribute: Option<f64>,
    /// Weight applied to a counterpart's bias attribute (reviewers only)
    #[serde(rename = "biasWeight", default)]
    pub bias_weight: Option<f64>,
}

impl Agent {
    pub fn new(id: usize, characteristics: Vec<f64>, mrs_weights: Vec<f64>) -> Self {
        Self {
            id,
            characteristics,
            mrs_weights,
            bias_attribute: None,
            bias_weight: None,
        }
    }

    /// Helper to read the bias attribute, defaulting to 0 (unflagged)
    pub fn bias_attribute_or_zero(&self) -> f64 {
        self.bias_attribute.unwrap_or(0.0)
    }
}

/// Errors raised while validating market input, before any matching starts
#[derive(Debug, Error, PartialEq)]
pub enum MarketError {
    #[error("population sizes differ: {applicants} applicants vs {reviewers} reviewers")]
    SizeMismatch { applicants: usize, reviewers: usize },

    #[error("market has no agents")]
    Empty,

    #[error("{side} must carry between 2 and 4 characteristics, found {found}")]
    CharacteristicCount { side: Side, found: usize },

    #[error("agent {id} in {side} has {found} characteristics, expected {expected}")]
    CharacteristicArity {
        side: Side,
        id: usize,
        expected: usize,
        found: usize,
    },

    #[error("agent {id} in {side} has {found} MRS weights, expected {expected}")]
    MrsArity {
        side: Side,
        id: usize,
        expected: usize,
        found: usize,
    },

    #[error("agent {id} in {side} has a non-finite {field} value")]
    NonFinite { side: Side, id: usize, field: String },

    #[error("applicant {id} has non-binary bias attribute {value}")]
    NonBinaryBias { id: usize, value: f64 },

    #[error("applicant {id} is missing a bias attribute while bias mode is enabled")]
    MissingBiasAttribute { id: usize },

    #[error("reviewer {id} is missing a bias weight while bias mode is enabled")]
    MissingBiasWeight { id: usize },
}

/// Two equally-sized populations ready for matching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub applicants: Vec<Agent>,
    pub reviewers: Vec<Agent>,
}

impl Market {
    pub fn new(applicants: Vec<Agent>, reviewers: Vec<Agent>) -> Self {
        Self {
            applicants,
            reviewers,
        }
    }

    pub fn size(&self) -> usize {
        self.applicants.len()
    }

    /// Validate the market before the first round.
    ///
    /// Checks equal population sizes, uniform characteristic arity (2 to 4
    /// per side), MRS arity against the counterpart side (each weight
    /// converts one of the counterpart's secondary characteristics), finite
    /// values throughout, and in bias mode a binary applicant attribute plus
    /// a reviewer weight. A NaN that slipped through here would break the
    /// total order the rankings rely on, so nothing non-finite may pass.
    pub fn validate(&self, bias_mode: bool) -> Result<(), MarketError> {
        if self.applicants.is_empty() {
            return Err(MarketError::Empty);
        }
        if self.applicants.len() != self.reviewers.len() {
            return Err(MarketError::SizeMismatch {
                applicants: self.applicants.len(),
                reviewers: self.reviewers.len(),
            });
        }

        let a_chars = self.applicants[0].characteristics.len();
        let b_chars = self.reviewers[0].characteristics.len();
        for (side, chars) in [(Side::Applicants, a_chars), (Side::Reviewers, b_chars)] {
            if !(2..=4).contains(&chars) {
                return Err(MarketError::CharacteristicCount { side, found: chars });
            }
        }

        validate_side(&self.applicants, Side::Applicants, a_chars, b_chars)?;
        validate_side(&self.reviewers, Side::Reviewers, b_chars, a_chars)?;

        if bias_mode {
            for agent in &self.applicants {
                let attr = agent
                    .bias_attribute
                    .ok_or(MarketError::MissingBiasAttribute { id: agent.id })?;
                if attr != 0.0 && attr != 1.0 {
                    return Err(MarketError::NonBinaryBias {
                        id: agent.id,
                        value: attr,
                    });
                }
            }
            for agent in &self.reviewers {
                let weight = agent
                    .bias_weight
                    .ok_or(MarketError::MissingBiasWeight { id: agent.id })?;
                if !weight.is_finite() {
                    return Err(MarketError::NonFinite {
                        side: Side::Reviewers,
                        id: agent.id,
                        field: "bias_weight".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn validate_side(
    agents: &[Agent],
    side: Side,
    own_chars: usize,
    counterpart_chars: usize,
) -> Result<(), MarketError> {
    // MRS weights trade the counterpart's secondary characteristics against
    // its first one, so their count follows the counterpart side.
    let expected_mrs = counterpart_chars - 1;

    for agent in agents {
        if agent.characteristics.len() != own_chars {
            return Err(MarketError::CharacteristicArity {
                side,
                id: agent.id,
                expected: own_chars,
                found: agent.characteristics.len(),
            });
        }
        if agent.mrs_weights.len() != expected_mrs {
            return Err(MarketError::MrsArity {
                side,
                id: agent.id,
                expected: expected_mrs,
                found: agent.mrs_weights.len(),
            });
        }
        for (k, value) in agent.characteristics.iter().enumerate() {
            if !value.is_finite() {
                return Err(MarketError::NonFinite {
                    side,
                    id: agent.id,
                    field: format!("char_{}", k + 1),
                });
            }
        }
        for (k, value) in agent.mrs_weights.iter().enumerate() {
            if !value.is_finite() {
                return Err(MarketError::NonFinite {
                    side,
                    id: agent.id,
                    field: format!("mrs_1{}", k + 2),
                });
            }
        }
    }

    Ok(())
}

/// Concrete column names resolved once at ingestion. Downstream code only
/// ever sees this fixed schema, never the raw configurable names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub a_chars: Vec<String>,
    pub a_mrs: Vec<String>,
    pub b_chars: Vec<String>,
    pub b_mrs: Vec<String>,
    pub a_bias_attribute: Option<String>,
    pub b_bias_weight: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: usize, chars: Vec<f64>, mrs: Vec<f64>) -> Agent {
        Agent::new(id, chars, mrs)
    }

    fn small_market() -> Market {
        Market::new(
            vec![
                agent(0, vec![1.0, 2.0], vec![5.25]),
                agent(1, vec![3.0, 4.0], vec![5.25]),
            ],
            vec![
                agent(0, vec![1.0, 2.0], vec![7.75]),
                agent(1, vec![3.0, 4.0], vec![7.75]),
            ],
        )
    }

    #[test]
    fn test_valid_market_passes() {
        assert!(small_market().validate(false).is_ok());
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let mut market = small_market();
        market.reviewers.pop();
        assert_eq!(
            market.validate(false),
            Err(MarketError::SizeMismatch {
                applicants: 2,
                reviewers: 1
            })
        );
    }

    #[test]
    fn test_nan_characteristic_rejected() {
        let mut market = small_market();
        market.applicants[1].characteristics[0] = f64::NAN;
        assert!(matches!(
            market.validate(false),
            Err(MarketError::NonFinite {
                side: Side::Applicants,
                id: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_mrs_arity_follows_counterpart() {
        let mut market = small_market();
        market.applicants[0].mrs_weights = vec![5.25, 1.0];
        assert!(matches!(
            market.validate(false),
            Err(MarketError::MrsArity {
                side: Side::Applicants,
                id: 0,
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_bias_mode_requires_binary_attribute() {
        let mut market = small_market();
        for a in &mut market.applicants {
            a.bias_attribute = Some(0.5);
        }
        for b in &mut market.reviewers {
            b.bias_weight = Some(-25.0);
        }
        assert!(matches!(
            market.validate(true),
            Err(MarketError::NonBinaryBias { id: 0, value: v }) if v == 0.5
        ));
    }

    #[test]
    fn test_bias_mode_requires_reviewer_weight() {
        let mut market = small_market();
        for a in &mut market.applicants {
            a.bias_attribute = Some(1.0);
        }
        assert_eq!(
            market.validate(true),
            Err(MarketError::MissingBiasWeight { id: 0 })
        );
    }
}
