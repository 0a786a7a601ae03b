use anyhow::{Result, bail};
use tracing::debug;

/// Tiered allowance charge: free within the plan allowance, full price once
/// the allowance is exhausted, and proportional to the overage at the
/// spillover boundary (floored at one cent so spillover is never free).
pub fn charge_against_allowance(full_cents: f64, allowance: f64, used: f64) -> Result<f64> {
    if used < 0.0 {
        bail!(
            "charge_against_allowance called with negative usage: full {full_cents}, allowance {allowance}, used {used}"
        );
    }

    let charge = if allowance >= used {
        0.0
    } else if allowance <= 0.0 {
        full_cents
    } else {
        // 0 < allowance < used: only the fraction that spilled over is billed.
        let fraction = (used - allowance) / used;
        (full_cents * fraction).abs().max(1.0)
    };

    debug!(full_cents, allowance, used, charge, "computed tiered charge");
    Ok(charge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_allowance_is_free() {
        assert_eq!(charge_against_allowance(5000.0, 200.0, 150.0).unwrap(), 0.0);
    }

    #[test]
    fn exactly_at_allowance_is_free() {
        assert_eq!(charge_against_allowance(5000.0, 200.0, 200.0).unwrap(), 0.0);
    }

    #[test]
    fn exhausted_allowance_pays_full_price() {
        assert_eq!(
            charge_against_allowance(5000.0, 0.0, 30.0).unwrap(),
            5000.0
        );
        assert_eq!(
            charge_against_allowance(5000.0, -12.5, 30.0).unwrap(),
            5000.0
        );
    }

    #[test]
    fn spillover_bills_the_overage_fraction() {
        // 216.67 minutes against a 200 minute allowance: ~7.7% spilled over.
        let minutes = 13_000.0 / 60.0;
        let charge = charge_against_allowance(5000.0, 200.0, minutes).unwrap();
        let expected = 5000.0 * (minutes - 200.0) / minutes;
        assert!((charge - expected).abs() < 1e-9);
        assert!(charge >= 1.0);
        assert!(charge < 5000.0);
    }

    #[test]
    fn spillover_charge_is_floored_at_one_cent() {
        // Tiny overage on a tiny price still costs a cent.
        let charge = charge_against_allowance(10.0, 99.9, 100.0).unwrap();
        assert_eq!(charge, 1.0);
    }

    #[test]
    fn never_exceeds_the_full_price() {
        for allowance in [-5.0, 0.0, 1.0, 25.0, 50.0, 99.0, 100.0, 500.0] {
            let charge = charge_against_allowance(5000.0, allowance, 100.0).unwrap();
            assert!(charge <= 5000.0, "allowance {allowance} charged {charge}");
        }
    }

    #[test]
    fn monotone_non_increasing_in_allowance() {
        let mut previous = f64::INFINITY;
        for allowance in [-10.0, 0.0, 10.0, 40.0, 80.0, 99.0, 100.0, 150.0] {
            let charge = charge_against_allowance(5000.0, allowance, 100.0).unwrap();
            assert!(
                charge <= previous,
                "charge grew from {previous} to {charge} at allowance {allowance}"
            );
            previous = charge;
        }
    }

    #[test]
    fn negative_usage_is_rejected() {
        assert!(charge_against_allowance(5000.0, 200.0, -1.0).is_err());
    }
}
