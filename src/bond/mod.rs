use crate::prompt::Prompt;

/// Inputs for the bond pricer. Rates are in percent, as entered.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BondInputs {
    pub(crate) face: f64,
    pub(crate) coupon_pct: f64,
    pub(crate) years: f64,
    pub(crate) payments_per_year: u32,
    pub(crate) discount_pct: f64,
}

impl BondInputs {
    fn valid(&self) -> bool {
        self.face > 0.0
            && self.coupon_pct > 0.0
            && self.years > 0.0
            && self.payments_per_year > 0
            && self.discount_pct >= 0.0
    }
}

/// Price a fixed-coupon bond by discounting each coupon and the principal
/// at the periodic discount rate.
pub(crate) fn price(inputs: &BondInputs) -> f64 {
    let coupon_rate = inputs.coupon_pct / 100.0;
    let discount = inputs.discount_pct / 100.0;
    let periods = (inputs.years * inputs.payments_per_year as f64).round() as i32;
    let coupon = inputs.face * coupon_rate / inputs.payments_per_year as f64;
    let period_rate = discount / inputs.payments_per_year as f64;

    let mut present_value = 0.0;
    for t in 1..=periods {
        present_value += coupon / (1.0 + period_rate).powi(t);
    }
    present_value + inputs.face / (1.0 + period_rate).powi(periods)
}

/// Run the calculator. When all five values come in as CLI flags the
/// prompts are skipped; otherwise the full set is asked for and re-asked
/// until it passes validation.
pub(crate) fn run_bond(
    face: Option<f64>,
    coupon: Option<f64>,
    years: Option<f64>,
    frequency: Option<u32>,
    discount: Option<f64>,
) -> anyhow::Result<()> {
    let inputs = match (face, coupon, years, frequency, discount) {
        (Some(face), Some(coupon_pct), Some(years), Some(payments_per_year), Some(discount_pct)) => {
            let inputs = BondInputs { face, coupon_pct, years, payments_per_year, discount_pct };
            if !inputs.valid() {
                anyhow::bail!("Bond inputs must be positive (discount rate may be zero)");
            }
            inputs
        }
        _ => read_inputs()?,
    };

    println!("Bond price: {:.2}", price(&inputs));
    Ok(())
}

fn read_inputs() -> anyhow::Result<BondInputs> {
    let mut prompt = Prompt::new()?;
    loop {
        let inputs = BondInputs {
            face: prompt.read_f64("Face value: ")?,
            coupon_pct: prompt.read_f64("Coupon rate (%): ")?,
            years: prompt.read_f64("Years to maturity: ")?,
            payments_per_year: prompt.read_u32("Payments per year: ")?,
            discount_pct: prompt.read_f64("Discount rate (%): ")?,
        };
        if inputs.valid() {
            return Ok(inputs);
        }
        println!("Values must be positive (discount rate may be zero). Please try again.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(discount_pct: f64) -> BondInputs {
        BondInputs {
            face: 1000.0,
            coupon_pct: 5.0,
            years: 10.0,
            payments_per_year: 2,
            discount_pct,
        }
    }

    #[test]
    fn test_price_matches_annuity_form() {
        // 20 semi-annual coupons of 25 discounted at 3% per period.
        let r: f64 = 0.03;
        let n = 20;
        let annuity = 25.0 * (1.0 - (1.0 + r).powi(-n)) / r;
        let principal = 1000.0 * (1.0 + r).powi(-n);
        let expected = annuity + principal;

        let priced = price(&sample(6.0));
        assert!((priced - expected).abs() < 1e-9, "priced {} expected {}", priced, expected);
    }

    #[test]
    fn test_price_at_par() {
        // Discounting at the coupon rate prices the bond at face value.
        let priced = price(&sample(5.0));
        assert!((priced - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_decreases_with_discount_rate() {
        let mut last = f64::INFINITY;
        for discount in [1.0, 3.0, 5.0, 7.0, 9.0] {
            let priced = price(&sample(discount));
            assert!(priced < last);
            last = priced;
        }
    }

    #[test]
    fn test_price_is_deterministic() {
        assert_eq!(price(&sample(6.0)), price(&sample(6.0)));
    }

    #[test]
    fn test_zero_discount_sums_cash_flows() {
        let priced = price(&sample(0.0));
        // 20 coupons of 25 plus the principal.
        assert!((priced - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_validation() {
        assert!(sample(6.0).valid());
        assert!(sample(0.0).valid());
        let mut bad = sample(6.0);
        bad.face = -1.0;
        assert!(!bad.valid());
        bad = sample(-0.5);
        assert!(!bad.valid());
    }
}
