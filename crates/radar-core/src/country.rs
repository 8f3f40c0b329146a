//! Country codes a toilet record may carry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported countries.
///
/// Variant order matches the `countrycode` enum in the database, which is
/// also the order used to break ties during country inference.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[sqlx(type_name = "countrycode")]
pub enum CountryCode {
    /// Switzerland
    CH,
    /// France
    FR,
    /// Germany
    DE,
    /// Italy
    IT,
    /// Austria
    AT,
}

impl CountryCode {
    /// All codes in declaration order.
    pub const ALL: [CountryCode; 5] = [
        CountryCode::CH,
        CountryCode::FR,
        CountryCode::DE,
        CountryCode::IT,
        CountryCode::AT,
    ];

    /// Country used when inference finds no located records.
    pub const FALLBACK: CountryCode = CountryCode::CH;

    pub fn as_str(&self) -> &'static str {
        match self {
            CountryCode::CH => "CH",
            CountryCode::FR => "FR",
            CountryCode::DE => "DE",
            CountryCode::IT => "IT",
            CountryCode::AT => "AT",
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountryCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CountryCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Unknown country code '{}', expected one of CH, FR, DE, IT, AT",
                    s
                ))
            })
    }
}
