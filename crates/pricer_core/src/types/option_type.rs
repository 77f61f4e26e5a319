//! Call/put discriminator used by every pricing formula.

use std::fmt;
use std::str::FromStr;

/// European option type.
///
/// # Examples
/// ```
/// use pricer_core::types::OptionType;
///
/// assert_eq!(OptionType::Call.sign(), 1.0);
/// assert_eq!(OptionType::Put.payoff(100.0, 90.0), 0.0);
/// assert_eq!("P".parse::<OptionType>().unwrap(), OptionType::Put);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OptionType {
    /// Right to buy at the strike
    Call,
    /// Right to sell at the strike
    Put,
}

impl OptionType {
    /// +1 for calls, -1 for puts.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }

    /// Intrinsic value at `spot`.
    #[inline]
    pub fn payoff(self, spot: f64, strike: f64) -> f64 {
        (self.sign() * (spot - strike)).max(0.0)
    }

    /// The out-of-the-money side for a strike relative to a forward.
    ///
    /// Strikes below the forward are quoted as puts, the rest as calls.
    #[inline]
    pub fn out_of_the_money(strike: f64, forward: f64) -> Self {
        if strike < forward {
            OptionType::Put
        } else {
            OptionType::Call
        }
    }

    /// Single-letter code (`C` / `P`).
    pub fn code(self) -> char {
        match self {
            OptionType::Call => 'C',
            OptionType::Put => 'P',
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

impl FromStr for OptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "call" => Ok(OptionType::Call),
            "p" | "put" => Ok(OptionType::Put),
            other => Err(format!("unknown option type '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payoff() {
        assert_eq!(OptionType::Call.payoff(110.0, 100.0), 10.0);
        assert_eq!(OptionType::Call.payoff(90.0, 100.0), 0.0);
        assert_eq!(OptionType::Put.payoff(90.0, 100.0), 10.0);
        assert_eq!(OptionType::Put.payoff(110.0, 100.0), 0.0);
    }

    #[test]
    fn test_out_of_the_money() {
        assert_eq!(OptionType::out_of_the_money(95.0, 100.0), OptionType::Put);
        assert_eq!(OptionType::out_of_the_money(100.0, 100.0), OptionType::Call);
        assert_eq!(OptionType::out_of_the_money(105.0, 100.0), OptionType::Call);
    }

    #[test]
    fn test_parse() {
        assert_eq!("call".parse::<OptionType>(), Ok(OptionType::Call));
        assert_eq!(" C ".parse::<OptionType>(), Ok(OptionType::Call));
        assert_eq!("Put".parse::<OptionType>(), Ok(OptionType::Put));
        assert!("straddle".parse::<OptionType>().is_err());
    }

    #[test]
    fn test_code_and_display() {
        assert_eq!(OptionType::Call.code(), 'C');
        assert_eq!(OptionType::Put.to_string(), "put");
    }
}
