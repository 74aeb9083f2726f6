use crate::calendar::Period;
use serde::Serialize;

/// Cumulative targets: each quarter includes everything planned before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CumulativeTargets {
    pub q1: u64,
    pub q2: u64,
    pub q3: u64,
    pub q4: u64,
}

impl CumulativeTargets {
    pub fn for_period(&self, period: Period) -> u64 {
        match period {
            Period::Q1 => self.q1,
            Period::Q2 => self.q2,
            Period::Q3 => self.q3,
            Period::Q4 | Period::Yearly => self.q4,
        }
    }
}

/// Split an annual plan into cumulative quarterly targets.
///
/// `q4` is always the exact annual figure rather than `4 * base`, so rounding
/// never drifts the year-end target.
pub fn cumulative_quarterly_targets(annual_quantity: u64) -> CumulativeTargets {
    if annual_quantity == 0 {
        return CumulativeTargets::default();
    }
    // round(annual / 4), halves rounding up
    let base = (annual_quantity + 2) / 4;
    CumulativeTargets {
        q1: base,
        q2: base * 2,
        q3: base * 3,
        q4: annual_quantity,
    }
}

/// Planned value for `period` derived from an annual quantity.
pub fn planned_for_period(annual_quantity: u64, period: Period) -> u64 {
    cumulative_quarterly_targets(annual_quantity).for_period(period)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousand_splits_evenly() {
        let t = cumulative_quarterly_targets(1000);
        assert_eq!(
            t,
            CumulativeTargets {
                q1: 250,
                q2: 500,
                q3: 750,
                q4: 1000
            }
        );
    }

    #[test]
    fn zero_plan_is_all_zero() {
        assert_eq!(cumulative_quarterly_targets(0), CumulativeTargets::default());
    }

    #[test]
    fn q4_is_exact_and_quarters_are_monotonic() {
        for annual in 0..500u64 {
            let t = cumulative_quarterly_targets(annual);
            assert_eq!(t.q4, annual);
            assert!(t.q1 <= t.q2 && t.q2 <= t.q3);
            // 3 * base may overshoot the annual figure by rounding only
            assert!(t.q3 <= annual + 2, "annual {} gave q3 {}", annual, t.q3);
        }
    }

    #[test]
    fn halves_round_up() {
        // 6 / 4 = 1.5
        assert_eq!(cumulative_quarterly_targets(6).q1, 2);
        // 5 / 4 = 1.25
        assert_eq!(cumulative_quarterly_targets(5).q1, 1);
        // 7 / 4 = 1.75
        assert_eq!(cumulative_quarterly_targets(7).q1, 2);
    }

    #[test]
    fn selects_period() {
        assert_eq!(planned_for_period(120, Period::Q1), 30);
        assert_eq!(planned_for_period(121, Period::Yearly), 121);
        assert_eq!(planned_for_period(121, Period::Q4), 121);
    }
}
