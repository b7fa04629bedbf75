//! Commission and profit estimates for partners weighing a pricing tier.
//!
//! Everything here is pure arithmetic over [`Decimal`]; handlers and the CLI
//! call into it directly.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalculatorError {
    #[error("commission_rate must be between 0 and 100, got {0}")]
    CommissionRateOutOfRange(Decimal),
    #[error("inputs are too large to calculate")]
    Overflow,
    #[error("break-even deal count exceeds {}", u32::MAX)]
    BreakEvenTooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalculatorInput {
    pub deals_per_month: Decimal,
    pub average_deal_value: Decimal,
    /// Percentage, 0..=100.
    pub commission_rate: Decimal,
    pub monthly_fee: Decimal,
}

impl CalculatorInput {
    /// Negative inputs count as zero, the way the input fields clamp them.
    pub fn clamped(self) -> Self {
        Self {
            deals_per_month: self.deals_per_month.max(Decimal::ZERO),
            average_deal_value: self.average_deal_value.max(Decimal::ZERO),
            commission_rate: self.commission_rate.max(Decimal::ZERO),
            monthly_fee: self.monthly_fee.max(Decimal::ZERO),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub monthly_revenue: Decimal,
    pub monthly_commission: Decimal,
    pub monthly_profit: Decimal,
    pub annual_profit: Decimal,
}

/// revenue = deals × value; commission = revenue × rate / 100;
/// profit = commission − fee; annual = profit × 12.
pub fn estimate(input: CalculatorInput) -> Result<Estimate, CalculatorError> {
    let input = input.clamped();
    if input.commission_rate > HUNDRED {
        return Err(CalculatorError::CommissionRateOutOfRange(input.commission_rate));
    }

    let monthly_revenue = input
        .deals_per_month
        .checked_mul(input.average_deal_value)
        .ok_or(CalculatorError::Overflow)?;
    let monthly_commission = monthly_revenue
        .checked_mul(input.commission_rate)
        .and_then(|v| v.checked_div(HUNDRED))
        .ok_or(CalculatorError::Overflow)?;
    let monthly_profit = monthly_commission
        .checked_sub(input.monthly_fee)
        .ok_or(CalculatorError::Overflow)?;
    let annual_profit = monthly_profit
        .checked_mul(MONTHS_PER_YEAR)
        .ok_or(CalculatorError::Overflow)?;

    Ok(Estimate {
        monthly_revenue: monthly_revenue.round_dp(2),
        monthly_commission: monthly_commission.round_dp(2),
        monthly_profit: monthly_profit.round_dp(2),
        annual_profit: annual_profit.round_dp(2),
    })
}

/// Smallest whole number of monthly deals at which profit is not negative.
/// `Ok(None)` when a deal earns nothing but a fee is still owed.
pub fn break_even_deals(
    average_deal_value: Decimal,
    commission_rate: Decimal,
    monthly_fee: Decimal,
) -> Result<Option<u32>, CalculatorError> {
    let fee = monthly_fee.max(Decimal::ZERO);
    if fee.is_zero() {
        return Ok(Some(0));
    }
    let per_deal = average_deal_value
        .max(Decimal::ZERO)
        .checked_mul(commission_rate.max(Decimal::ZERO))
        .and_then(|v| v.checked_div(HUNDRED))
        .ok_or(CalculatorError::Overflow)?;
    if per_deal.is_zero() {
        return Ok(None);
    }
    let deals = fee.checked_div(per_deal).ok_or(CalculatorError::Overflow)?.ceil();
    deals.to_u32().map(Some).ok_or(CalculatorError::BreakEvenTooLarge)
}

/// A pricing tier as the calculator sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTerms {
    pub tier_id: Uuid,
    pub name: String,
    pub monthly_fee: Decimal,
    pub commission_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierEstimate {
    pub tier_id: Uuid,
    pub name: String,
    pub estimate: Estimate,
    pub break_even_deals: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierComparison {
    pub tiers: Vec<TierEstimate>,
    /// Index into `tiers`; earlier tiers win ties.
    pub best: Option<usize>,
}

pub fn compare_tiers(
    deals_per_month: Decimal,
    average_deal_value: Decimal,
    tiers: &[TierTerms],
) -> Result<TierComparison, CalculatorError> {
    let mut estimates = Vec::with_capacity(tiers.len());
    let mut best: Option<usize> = None;

    for (idx, tier) in tiers.iter().enumerate() {
        let estimate = estimate(CalculatorInput {
            deals_per_month,
            average_deal_value,
            commission_rate: tier.commission_rate,
            monthly_fee: tier.monthly_fee,
        })?;

        let is_better = match best {
            Some(b) => estimate.monthly_profit > estimates_profit(&estimates, b),
            None => true,
        };
        if is_better {
            best = Some(idx);
        }

        estimates.push(TierEstimate {
            tier_id: tier.tier_id,
            name: tier.name.clone(),
            estimate,
            break_even_deals: break_even_deals(average_deal_value, tier.commission_rate, tier.monthly_fee)?,
        });
    }

    Ok(TierComparison { tiers: estimates, best })
}

fn estimates_profit(estimates: &[TierEstimate], idx: usize) -> Decimal {
    estimates[idx].estimate.monthly_profit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn input(deals: i64, value: i64, rate: i64, fee: i64) -> CalculatorInput {
        CalculatorInput {
            deals_per_month: d(deals),
            average_deal_value: d(value),
            commission_rate: d(rate),
            monthly_fee: d(fee),
        }
    }

    #[test]
    fn reference_scenario() {
        let e = estimate(input(5, 1000, 25, 99)).unwrap();
        assert_eq!(e.monthly_revenue, d(5000));
        assert_eq!(e.monthly_commission, d(1250));
        assert_eq!(e.monthly_profit, d(1151));
        assert_eq!(e.annual_profit, d(13812));
    }

    #[test]
    fn negative_inputs_are_treated_as_zero() {
        let e = estimate(input(-3, 1000, 25, -50)).unwrap();
        assert_eq!(e.monthly_revenue, Decimal::ZERO);
        assert_eq!(e.monthly_profit, Decimal::ZERO);
    }

    #[test]
    fn fee_larger_than_commission_gives_a_loss() {
        let e = estimate(input(1, 100, 10, 99)).unwrap();
        assert_eq!(e.monthly_commission, d(10));
        assert_eq!(e.monthly_profit, d(-89));
        assert_eq!(e.annual_profit, d(-1068));
    }

    #[test]
    fn fractional_rates_round_to_cents() {
        let e = estimate(CalculatorInput {
            deals_per_month: d(3),
            average_deal_value: Decimal::new(33333, 2), // 333.33
            commission_rate: Decimal::new(125, 1),      // 12.5
            monthly_fee: Decimal::ZERO,
        })
        .unwrap();
        assert_eq!(e.monthly_revenue, Decimal::new(99999, 2));
        assert_eq!(e.monthly_commission, Decimal::new(12500, 2));
    }

    #[test]
    fn rate_above_hundred_is_rejected() {
        let err = estimate(input(1, 1, 101, 0)).unwrap_err();
        assert_eq!(err, CalculatorError::CommissionRateOutOfRange(d(101)));
    }

    #[test]
    fn break_even_rounds_up_to_whole_deals() {
        // 250 commission per deal against a 99 fee
        assert_eq!(break_even_deals(d(1000), d(25), d(99)), Ok(Some(1)));
        // 10 per deal against 99
        assert_eq!(break_even_deals(d(100), d(10), d(99)), Ok(Some(10)));
        assert_eq!(break_even_deals(d(100), d(10), Decimal::ZERO), Ok(Some(0)));
        assert_eq!(break_even_deals(d(100), Decimal::ZERO, d(99)), Ok(None));
    }

    #[test]
    fn huge_inputs_report_overflow() {
        let err = estimate(CalculatorInput {
            deals_per_month: Decimal::MAX,
            average_deal_value: d(10),
            commission_rate: d(25),
            monthly_fee: Decimal::ZERO,
        })
        .unwrap_err();
        assert_eq!(err, CalculatorError::Overflow);

        // Revenue fits, commission does not
        let err = estimate(CalculatorInput {
            deals_per_month: Decimal::MAX / d(10),
            average_deal_value: d(1),
            commission_rate: d(100),
            monthly_fee: Decimal::ZERO,
        })
        .unwrap_err();
        assert_eq!(err, CalculatorError::Overflow);
    }

    #[test]
    fn break_even_beyond_u32_is_an_error_not_never() {
        // One cent of commission per deal against a 100 million fee
        let deals = break_even_deals(Decimal::new(1, 2), d(100), d(100_000_000));
        assert_eq!(deals, Err(CalculatorError::BreakEvenTooLarge));
        assert_eq!(break_even_deals(Decimal::MAX / d(100), d(100), d(1)), Ok(Some(1)));
    }

    #[test]
    fn best_tier_maximises_monthly_profit() {
        let tiers = vec![
            TierTerms { tier_id: Uuid::new_v4(), name: "Starter".into(), monthly_fee: d(0), commission_rate: d(10) },
            TierTerms { tier_id: Uuid::new_v4(), name: "Pro".into(), monthly_fee: d(99), commission_rate: d(25) },
            TierTerms { tier_id: Uuid::new_v4(), name: "Scale".into(), monthly_fee: d(499), commission_rate: d(30) },
        ];
        let cmp = compare_tiers(d(5), d(1000), &tiers).unwrap();
        // Starter 500, Pro 1151, Scale 1001
        assert_eq!(cmp.best, Some(1));
        assert_eq!(cmp.tiers[2].estimate.monthly_profit, d(1001));
    }

    #[test]
    fn ties_keep_the_first_tier() {
        let tiers = vec![
            TierTerms { tier_id: Uuid::new_v4(), name: "A".into(), monthly_fee: d(0), commission_rate: d(10) },
            TierTerms { tier_id: Uuid::new_v4(), name: "B".into(), monthly_fee: d(0), commission_rate: d(10) },
        ];
        let cmp = compare_tiers(d(1), d(100), &tiers).unwrap();
        assert_eq!(cmp.best, Some(0));
    }

    #[test]
    fn no_tiers_means_no_best() {
        let cmp = compare_tiers(d(1), d(100), &[]).unwrap();
        assert!(cmp.tiers.is_empty());
        assert_eq!(cmp.best, None);
    }
}
