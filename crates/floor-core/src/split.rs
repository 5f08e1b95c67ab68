//! # Payment Split
//!
//! Partitions a bill among payers with one of three strategies.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  EQUAL       total / n, remainder to the first payer                   │
//! │              100 across 3 → [34, 33, 33]                               │
//! │                                                                         │
//! │  PERCENTAGE  floor(total × pct)  per payer                             │
//! │              percentages need not sum to 100%, flooring loss stays     │
//! │                                                                         │
//! │  CUSTOM      amounts as given, not checked against the total           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::SplitStrategy;

// =============================================================================
// Percentage
// =============================================================================

/// A percentage in basis points (1 bp = 0.01%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    pub const FULL: Percentage = Percentage(10_000);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Whole percent, e.g. `from_percent(25)` is 25%.
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        Percentage(pct * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

// =============================================================================
// Split Plan
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PercentShare {
    pub payer: String,
    pub percentage: Percentage,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomShare {
    pub payer: String,
    pub amount: Money,
}

/// A split request: the strategy together with its participants.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "strategy", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum SplitPlan {
    Equal { payers: Vec<String> },
    Percentage { shares: Vec<PercentShare> },
    Custom { shares: Vec<CustomShare> },
}

/// One payer's computed share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SplitPart {
    pub payer: String,
    pub amount: Money,
}

impl SplitPlan {
    /// Equal split among `n` anonymous payers labelled "Guest 1".."Guest n".
    pub fn equal_among(n: usize) -> Self {
        SplitPlan::Equal {
            payers: (1..=n).map(|i| format!("Guest {i}")).collect(),
        }
    }

    pub fn strategy(&self) -> SplitStrategy {
        match self {
            SplitPlan::Equal { .. } => SplitStrategy::Equal,
            SplitPlan::Percentage { .. } => SplitStrategy::Percentage,
            SplitPlan::Custom { .. } => SplitStrategy::Custom,
        }
    }

    fn participant_count(&self) -> usize {
        match self {
            SplitPlan::Equal { payers } => payers.len(),
            SplitPlan::Percentage { shares } => shares.len(),
            SplitPlan::Custom { shares } => shares.len(),
        }
    }

    /// Checks participant lists and per-share bounds.
    pub fn validate(&self) -> CoreResult<()> {
        if self.participant_count() == 0 {
            return Err(ValidationError::Empty {
                field: "participants".to_string(),
            }
            .into());
        }

        match self {
            SplitPlan::Equal { .. } => {}
            SplitPlan::Percentage { shares } => {
                if shares.iter().any(|s| s.percentage.bps() > Percentage::FULL.bps()) {
                    return Err(ValidationError::OutOfRange {
                        field: "percentage".to_string(),
                        min: 0,
                        max: Percentage::FULL.bps() as i64,
                    }
                    .into());
                }
            }
            SplitPlan::Custom { shares } => {
                if shares.iter().any(|s| s.amount.is_negative()) {
                    return Err(ValidationError::MustBePositive {
                        field: "amount".to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Computes one part per participant, in input order.
    ///
    /// ## Example
    /// ```rust
    /// use floor_core::{Money, SplitPlan};
    ///
    /// let parts = SplitPlan::equal_among(3).allocate(Money::from_cents(100)).unwrap();
    /// let cents: Vec<i64> = parts.iter().map(|p| p.amount.cents()).collect();
    /// assert_eq!(cents, vec![34, 33, 33]);
    /// ```
    pub fn allocate(&self, total: Money) -> CoreResult<Vec<SplitPart>> {
        self.validate()?;

        let parts = match self {
            SplitPlan::Equal { payers } => payers
                .iter()
                .zip(total.split_evenly(payers.len()))
                .map(|(payer, amount)| SplitPart {
                    payer: payer.clone(),
                    amount,
                })
                .collect(),
            SplitPlan::Percentage { shares } => shares
                .iter()
                .map(|s| SplitPart {
                    payer: s.payer.clone(),
                    amount: total.portion_bps(s.percentage.bps()),
                })
                .collect(),
            SplitPlan::Custom { shares } => shares
                .iter()
                .map(|s| SplitPart {
                    payer: s.payer.clone(),
                    amount: s.amount,
                })
                .collect(),
        };

        Ok(parts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn cents(parts: &[SplitPart]) -> Vec<i64> {
        parts.iter().map(|p| p.amount.cents()).collect()
    }

    #[test]
    fn test_equal_split_sums_exactly() {
        let parts = SplitPlan::equal_among(3)
            .allocate(Money::from_cents(100))
            .unwrap();
        assert_eq!(cents(&parts), vec![34, 33, 33]);
        assert_eq!(parts[0].payer, "Guest 1");

        for total in [1_i64, 50, 9999, 10000, 123_457] {
            for n in 1..=9 {
                let parts = SplitPlan::equal_among(n)
                    .allocate(Money::from_cents(total))
                    .unwrap();
                let sum: i64 = cents(&parts).iter().sum();
                assert_eq!(sum, total);
            }
        }
    }

    #[test]
    fn test_percentage_floors_and_does_not_reconcile() {
        let plan = SplitPlan::Percentage {
            shares: vec![
                PercentShare {
                    payer: "Ana".into(),
                    percentage: Percentage::from_bps(3333),
                },
                PercentShare {
                    payer: "Bo".into(),
                    percentage: Percentage::from_bps(3333),
                },
                PercentShare {
                    payer: "Cy".into(),
                    percentage: Percentage::from_bps(3333),
                },
            ],
        };
        let parts = plan.allocate(Money::from_cents(1000)).unwrap();
        assert_eq!(cents(&parts), vec![333, 333, 333]);
    }

    #[test]
    fn test_percentage_need_not_sum_to_hundred() {
        let plan = SplitPlan::Percentage {
            shares: vec![PercentShare {
                payer: "Ana".into(),
                percentage: Percentage::from_percent(40),
            }],
        };
        let parts = plan.allocate(Money::from_cents(5000)).unwrap();
        assert_eq!(cents(&parts), vec![2000]);
    }

    #[test]
    fn test_custom_amounts_taken_verbatim() {
        let plan = SplitPlan::Custom {
            shares: vec![
                CustomShare {
                    payer: "Ana".into(),
                    amount: Money::from_cents(700),
                },
                CustomShare {
                    payer: "Bo".into(),
                    amount: Money::from_cents(100),
                },
            ],
        };
        let parts = plan.allocate(Money::from_cents(1000)).unwrap();
        assert_eq!(cents(&parts), vec![700, 100]);
        assert_eq!(plan.strategy(), SplitStrategy::Custom);
    }

    #[test]
    fn test_rejects_empty_and_out_of_range() {
        let err = SplitPlan::Equal { payers: vec![] }
            .allocate(Money::from_cents(100))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Empty { .. })));

        let plan = SplitPlan::Percentage {
            shares: vec![PercentShare {
                payer: "Ana".into(),
                percentage: Percentage::from_bps(10_001),
            }],
        };
        assert!(plan.validate().is_err());

        let plan = SplitPlan::Custom {
            shares: vec![CustomShare {
                payer: "Ana".into(),
                amount: Money::from_cents(-1),
            }],
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_plan_deserializes_from_tagged_json() {
        let plan: SplitPlan =
            serde_json::from_str(r#"{"strategy":"EQUAL","payers":["A","B"]}"#).unwrap();
        assert_eq!(plan.strategy(), SplitStrategy::Equal);
    }
}
