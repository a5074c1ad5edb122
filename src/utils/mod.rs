use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::from_default_env().add_directive("ledger_core=info".parse().unwrap());

        fmt().with_env_filter(filter).init();
    });
}

/// Rounds a monetary amount to currency precision (two decimal places).
///
/// Every balance mutation goes through this so that create/delete pairs cancel
/// exactly for two-decimal inputs.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::round_cents;

    #[test]
    fn round_cents_truncates_float_noise() {
        assert_eq!(round_cents(0.1 + 0.2), 0.3);
        assert_eq!(round_cents(-0.1 + 0.2), 0.1);
        assert_eq!(round_cents(33.333333333333336), 33.33);
    }

    #[test]
    fn round_cents_preserves_two_decimal_inputs() {
        assert_eq!(round_cents(1234.56), 1234.56);
        assert_eq!(round_cents(-99.99), -99.99);
        assert_eq!(round_cents(0.0), 0.0);
    }
}
