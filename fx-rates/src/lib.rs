//! Static exchange-rate table.
//!
//! Provides the rate-to-USD for every currency the ledger supports, as exact
//! decimals. Rates are a fixed snapshot suitable for development and for the
//! aggregate reports; live rate sourcing is deliberately out of scope.

use rust_decimal::Decimal;

// ─────────────────────────────────────────────────────────────────────────────
// Rate table
// ─────────────────────────────────────────────────────────────────────────────

/// One (currency code, rate-to-USD) entry.
///
/// The rate is the USD value of one unit of the currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    pub code: &'static str,
    mantissa: i64,
    scale: u32,
}

impl Rate {
    pub fn to_usd(&self) -> Decimal {
        Decimal::new(self.mantissa, self.scale)
    }
}

const RATES: &[Rate] = &[
    Rate { code: "USD", mantissa: 1_0000, scale: 4 },
    Rate { code: "EUR", mantissa: 9342, scale: 4 },
    Rate { code: "AUD", mantissa: 5447, scale: 4 },
    Rate { code: "CAD", mantissa: 6162, scale: 4 },
    Rate { code: "ARS", mantissa: 9, scale: 4 },
    Rate { code: "PLN", mantissa: 2343, scale: 4 },
    Rate { code: "BTC", mantissa: 100_000, scale: 0 },
    Rate { code: "ETH", mantissa: 3557_3476, scale: 4 },
    Rate { code: "DOGE", mantissa: 3627, scale: 4 },
    Rate { code: "USDT", mantissa: 9709, scale: 4 },
];

// ─────────────────────────────────────────────────────────────────────────────
// Lookup and conversion
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the rate-to-USD for a currency code, if known.
pub fn usd_rate(code: &str) -> Option<Decimal> {
    RATES.iter().find(|r| r.code == code).map(Rate::to_usd)
}

/// Converts an amount in the given currency to USD.
///
/// Unknown codes convert 1:1, matching the table's fallback behavior for
/// currencies added to the ledger before a rate is published.
pub fn to_usd(amount: Decimal, code: &str) -> Decimal {
    amount * usd_rate(code).unwrap_or(Decimal::ONE)
}

/// All currency codes with a published rate.
pub fn known_codes() -> impl Iterator<Item = &'static str> {
    RATES.iter().map(|r| r.code)
}
