use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// iDEAL banks ICEPAY can route a payment to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Issuer {
    AbnAmro,
    AsnBank,
    Bunq,
    Ing,
    Knab,
    Rabobank,
    SnsBank,
    SnsRegioBank,
    TriodosBank,
    VanLanschot,
}

impl Issuer {
    pub const ALL: [Issuer; 10] = [
        Issuer::AbnAmro,
        Issuer::AsnBank,
        Issuer::Bunq,
        Issuer::Ing,
        Issuer::Knab,
        Issuer::Rabobank,
        Issuer::SnsBank,
        Issuer::SnsRegioBank,
        Issuer::TriodosBank,
        Issuer::VanLanschot,
    ];

    /// Code ICEPAY expects in the `Issuer` field
    pub fn code(&self) -> &'static str {
        match self {
            Issuer::AbnAmro => "ABNAMRO",
            Issuer::AsnBank => "ASNBANK",
            Issuer::Bunq => "BUNQ",
            Issuer::Ing => "ING",
            Issuer::Knab => "KNAB",
            Issuer::Rabobank => "RABOBANK",
            Issuer::SnsBank => "SNSBANK",
            Issuer::SnsRegioBank => "SNSREGIOBANK",
            Issuer::TriodosBank => "TRIODOSBANK",
            Issuer::VanLanschot => "VANLANSCHOT",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Issuer::AbnAmro => "ABN AMRO",
            Issuer::AsnBank => "ASN Bank",
            Issuer::Bunq => "Bunq",
            Issuer::Ing => "ING",
            Issuer::Knab => "Knab",
            Issuer::Rabobank => "Rabobank",
            Issuer::SnsBank => "SNS Bank",
            Issuer::SnsRegioBank => "RegioBank",
            Issuer::TriodosBank => "Triodos Bank",
            Issuer::VanLanschot => "Van Lanschot",
        }
    }

    /// `(code, display name)` pairs ordered by display name
    pub fn choices() -> Vec<(&'static str, &'static str)> {
        let mut choices: Vec<_> = Self::ALL
            .iter()
            .map(|issuer| (issuer.code(), issuer.display_name()))
            .collect();
        choices.sort_by_key(|(_, name)| name.to_lowercase());
        choices
    }
}

impl fmt::Display for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Issuer {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|issuer| issuer.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnsupportedIssuer {
                code: wanted.to_string(),
            })
    }
}
