//! Newtypes and parsers for record identifiers and access tokens.
//!
//! Identifiers are opaque strings with a strict charset so they can travel
//! through file names, CLI arguments and JSON keys unchanged.

use crate::errors::CoreError;
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const MAX_ID_LEN: usize = 64;
pub const MAX_TOKEN_LEN: usize = 128;

fn is_id_char(b: u8) -> bool {
    matches!(b,
        b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' |
        b'_' | b'-' | b':' | b'.'
    )
}

/// `[A-Za-z0-9_.:-]`, length `1..=max`.
pub fn is_valid_token(s: &str, max: usize) -> bool {
    (1..=max).contains(&s.len()) && s.bytes().all(is_id_char)
}

macro_rules! def_token {
    ($(#[$doc:meta])* $name:ident, $max:expr, $err:expr) => {
        $(#[$doc])*
        #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl FromStr for $name {
            type Err = CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if is_valid_token(s, $max) { Ok(Self(s.to_string())) } else { Err($err) }
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;
            fn try_from(s: String) -> Result<Self, Self::Error> {
                if is_valid_token(&s, $max) { Ok(Self(s)) } else { Err($err) }
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> String { v.0 }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str { &self.0 }
        }
    };
}

def_token!(SurveyId, MAX_ID_LEN, CoreError::InvalidId);
def_token!(StrategyId, MAX_ID_LEN, CoreError::InvalidId);
def_token!(IndicatorId, MAX_ID_LEN, CoreError::InvalidId);
def_token!(RespondentId, MAX_ID_LEN, CoreError::InvalidId);
def_token!(SessionId, MAX_ID_LEN, CoreError::InvalidId);
def_token!(
    /// Invite/session access token. Longer than an id; same charset.
    AccessToken,
    MAX_TOKEN_LEN,
    CoreError::InvalidToken
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_charset() {
        for ok in ["A", "a", "9", "_", ".", ":", "-", "strat:vector-control.1"] {
            let _s: StrategyId = ok.parse().unwrap();
            let _i: IndicatorId = ok.parse().unwrap();
        }
    }

    #[test]
    fn ids_reject_bad_input() {
        let long = "x".repeat(MAX_ID_LEN + 1);
        for bad in ["", " ", "a b", "é", long.as_str()] {
            assert_eq!(bad.parse::<SessionId>(), Err(CoreError::InvalidId));
        }
    }

    #[test]
    fn token_allows_longer_values() {
        let t = "t".repeat(MAX_TOKEN_LEN);
        assert!(t.parse::<AccessToken>().is_ok());
        let too_long = "t".repeat(MAX_TOKEN_LEN + 1);
        assert_eq!(too_long.parse::<AccessToken>(), Err(CoreError::InvalidToken));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_validates_on_read() {
        let ok: IndicatorId = serde_json::from_str("\"ind-1\"").unwrap();
        assert_eq!(ok.as_str(), "ind-1");
        assert!(serde_json::from_str::<IndicatorId>("\"bad id\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"ind-1\"");
    }
}
