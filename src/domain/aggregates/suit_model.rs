//! Suit Model Registry
//!
//! Exactly three models exist. They are compiled in, never created at runtime.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuitModelId { Classic, Modern, Premium }

impl SuitModelId {
    pub const ALL: [SuitModelId; 3] = [Self::Classic, Self::Modern, Self::Premium];

    pub fn as_str(&self) -> &'static str {
        match self { Self::Classic => "classic", Self::Modern => "modern", Self::Premium => "premium" }
    }
}

impl fmt::Display for SuitModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SuitModelId {
    type Err = UnknownModel;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "modern" => Ok(Self::Modern),
            "premium" => Ok(Self::Premium),
            _ => Err(UnknownModel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownModel(pub String);
impl std::error::Error for UnknownModel {}
impl fmt::Display for UnknownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown suit model '{}'", self.0) }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuitModel {
    pub id: SuitModelId,
    pub name: &'static str,
    pub base_price: Decimal,
    pub features: &'static [&'static str],
}

const CLASSIC_FEATURES: &[&str] = &["Half-canvas construction", "Two-piece suit", "Standard lining", "Horn buttons"];
const MODERN_FEATURES: &[&str] = &["Half-canvas construction", "Two-piece suit", "Bemberg lining", "Slim tailored cut", "Corozo buttons"];
const PREMIUM_FEATURES: &[&str] = &["Full-canvas construction", "Two-piece suit", "Silk-blend lining", "Hand-finished buttonholes", "Working sleeve buttons"];

impl SuitModel {
    pub fn get(id: SuitModelId) -> SuitModel {
        match id {
            SuitModelId::Classic => SuitModel { id, name: "Classic", base_price: Decimal::new(590, 0), features: CLASSIC_FEATURES },
            SuitModelId::Modern => SuitModel { id, name: "Modern", base_price: Decimal::new(790, 0), features: MODERN_FEATURES },
            SuitModelId::Premium => SuitModel { id, name: "Premium", base_price: Decimal::new(1090, 0), features: PREMIUM_FEATURES },
        }
    }

    /// Resolves a raw identifier, failing for anything outside the fixed set.
    pub fn lookup(raw: &str) -> Result<SuitModel, UnknownModel> { raw.parse().map(Self::get) }

    pub fn all() -> Vec<SuitModel> { SuitModelId::ALL.into_iter().map(Self::get).collect() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_three_models() {
        let models = SuitModel::all();
        assert_eq!(models.len(), 3);
        assert!(models.iter().all(|m| m.base_price > Decimal::ZERO && !m.features.is_empty()));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(SuitModel::lookup("classic").unwrap().base_price, Decimal::new(590, 0));
        assert_eq!(SuitModel::lookup(" Premium ").unwrap().id, SuitModelId::Premium);
        assert_eq!(SuitModel::lookup("tuxedo").unwrap_err(), UnknownModel("tuxedo".into()));
    }
}
