//! Validated value objects: silo names, cereal labels and quantities.

use serde::{Deserialize, Serialize};

use silos_core::{DomainError, DomainResult};

/// Longest accepted silo name, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Longest accepted cereal label, in characters.
pub const MAX_CEREAL_LEN: usize = 20;

/// Largest balance a silo may hold (kilograms).
///
/// Bounded by the signed 64-bit column the Postgres store uses.
pub const MAX_BALANCE: u64 = i64::MAX as u64;

/// Silo display name: trimmed, non-blank, at most [`MAX_NAME_LEN`] characters.
///
/// Uniqueness is exact (case-sensitive) comparison of the trimmed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiloName(String);

impl SiloName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_name("name cannot be empty"));
        }
        if trimmed.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::invalid_name(format!(
                "name cannot exceed {MAX_NAME_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SiloName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SiloName> for String {
    fn from(value: SiloName) -> Self {
        value.0
    }
}

impl core::fmt::Display for SiloName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cereal-type label (e.g. `Soja`, `Maiz`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cereal(String);

impl Cereal {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_cereal("cereal cannot be empty"));
        }
        if trimmed.chars().count() > MAX_CEREAL_LEN {
            return Err(DomainError::invalid_cereal(format!(
                "cereal cannot exceed {MAX_CEREAL_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Cereal {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cereal> for String {
    fn from(value: Cereal) -> Self {
        value.0
    }
}

impl core::fmt::Display for Cereal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Set of cereals a deployment accepts. Empty means "any well-formed label".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CerealCatalog {
    allowed: Vec<Cereal>,
}

impl CerealCatalog {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn restricted(allowed: impl IntoIterator<Item = Cereal>) -> Self {
        let mut allowed: Vec<Cereal> = allowed.into_iter().collect();
        allowed.sort();
        allowed.dedup();
        Self { allowed }
    }

    pub fn allowed(&self) -> &[Cereal] {
        &self.allowed
    }

    /// Parse a raw label and check it against the allow-list.
    pub fn parse(&self, raw: &str) -> DomainResult<Cereal> {
        let cereal = Cereal::parse(raw)?;
        if self.allowed.is_empty() || self.allowed.contains(&cereal) {
            return Ok(cereal);
        }
        let names: Vec<&str> = self.allowed.iter().map(Cereal::as_str).collect();
        Err(DomainError::invalid_cereal(format!(
            "'{cereal}' is not one of: {}",
            names.join(", ")
        )))
    }
}

/// Strictly positive quantity of grain, in kilograms.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct Quantity(u64);

impl Quantity {
    /// Validate a caller-supplied amount. Zero and negatives are rejected, never clamped.
    pub fn new(raw: i64) -> DomainResult<Self> {
        if raw <= 0 {
            return Err(DomainError::invalid_amount(format!(
                "amount must be greater than 0 (got {raw})"
            )));
        }
        Ok(Self(raw as u64))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silo_name_is_trimmed() {
        let name = SiloName::parse("  Silo A ").unwrap();
        assert_eq!(name.as_str(), "Silo A");
    }

    #[test]
    fn blank_silo_name_is_rejected() {
        let err = SiloName::parse("   ").unwrap_err();
        assert!(matches!(err, DomainError::InvalidName(_)));
    }

    #[test]
    fn overlong_silo_name_is_rejected() {
        let raw = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            SiloName::parse(&raw),
            Err(DomainError::InvalidName(_))
        ));
        assert!(SiloName::parse(&"x".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn names_compare_case_sensitively() {
        assert_ne!(
            SiloName::parse("silo a").unwrap(),
            SiloName::parse("Silo A").unwrap()
        );
    }

    #[test]
    fn quantity_rejects_zero_and_negative() {
        assert!(matches!(Quantity::new(0), Err(DomainError::InvalidAmount(_))));
        assert!(matches!(Quantity::new(-5), Err(DomainError::InvalidAmount(_))));
        assert_eq!(Quantity::new(500).unwrap().get(), 500);
    }

    #[test]
    fn open_catalog_accepts_any_label() {
        let catalog = CerealCatalog::any();
        assert_eq!(catalog.parse(" corn ").unwrap().as_str(), "corn");
    }

    #[test]
    fn restricted_catalog_rejects_unknown_label() {
        let catalog = CerealCatalog::restricted(
            ["Soja", "Maiz", "Trigo", "Girasol"]
                .iter()
                .map(|c| Cereal::parse(c).unwrap()),
        );
        assert!(catalog.parse("Maiz").is_ok());
        let err = catalog.parse("Cebada").unwrap_err();
        assert!(matches!(err, DomainError::InvalidCereal(msg) if msg.contains("Girasol")));
    }

    #[test]
    fn cereal_deserialization_validates() {
        let ok: Cereal = serde_json::from_str("\"Trigo\"").unwrap();
        assert_eq!(ok.as_str(), "Trigo");
        assert!(serde_json::from_str::<Cereal>("\"  \"").is_err());
    }
}
