//! Supported currencies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies the ledger keeps a balance for.
///
/// Every user owns exactly one balance row per variant; adding a variant
/// here extends the set of balances created for new users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    AUD,
    CAD,
    ARS,
    PLN,
    BTC,
    ETH,
    DOGE,
    USDT,
}

impl Currency {
    /// All supported currencies, in balance-listing order.
    pub const ALL: [Currency; 10] = [
        Currency::USD,
        Currency::EUR,
        Currency::AUD,
        Currency::CAD,
        Currency::ARS,
        Currency::PLN,
        Currency::BTC,
        Currency::ETH,
        Currency::DOGE,
        Currency::USDT,
    ];

    /// Returns the ISO-style currency code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::AUD => "AUD",
            Currency::CAD => "CAD",
            Currency::ARS => "ARS",
            Currency::PLN => "PLN",
            Currency::BTC => "BTC",
            Currency::ETH => "ETH",
            Currency::DOGE => "DOGE",
            Currency::USDT => "USDT",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "AUD" => Ok(Currency::AUD),
            "CAD" => Ok(Currency::CAD),
            "ARS" => Ok(Currency::ARS),
            "PLN" => Ok(Currency::PLN),
            "BTC" => Ok(Currency::BTC),
            "ETH" => Ok(Currency::ETH),
            "DOGE" => Ok(Currency::DOGE),
            "USDT" => Ok(Currency::USDT),
            _ => Err(format!("Unknown currency: {}", s)),
        }
    }
}
