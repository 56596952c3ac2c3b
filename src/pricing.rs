//! Suit pricing: the fixed revenue split, the customization fee table and
//! the price calculator built on them.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Customizations, Fabric, SuitConfiguration, SuitModel, SuitModelId};
use crate::domain::value_objects::Money;
use crate::error::{MarketplaceError, Result};

/// Shares may deviate from 1.0 by at most this much.
pub const SHARE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizationFees {
    pub lining: Decimal,
    pub monogram: Decimal,
    pub extra_trousers: Decimal,
}

impl Default for CustomizationFees {
    fn default() -> Self {
        Self { lining: Decimal::new(50, 0), monogram: Decimal::new(30, 0), extra_trousers: Decimal::new(120, 0) }
    }
}

/// Loaded once at startup, validated, then shared read-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfig {
    pub currency: String,
    pub tailor_share: Decimal,
    pub platform_share: Decimal,
    pub risk_buffer_share: Decimal,
    pub fees: CustomizationFees,
    /// Marketplace-wide commission applied at the cart/checkout boundary.
    pub commission_rate: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: "eur".into(),
            tailor_share: Decimal::new(60, 2),
            platform_share: Decimal::new(25, 2),
            risk_buffer_share: Decimal::new(15, 2),
            fees: CustomizationFees::default(),
            commission_rate: Decimal::new(10, 2),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSelfCheck {
    pub ok: bool,
    pub share_sum: Decimal,
    pub issues: Vec<String>,
}

impl PricingConfig {
    pub fn share_sum(&self) -> Decimal { self.tailor_share + self.platform_share + self.risk_buffer_share }

    pub fn self_check(&self) -> PricingSelfCheck {
        let mut issues = Vec::new();
        let share_sum = self.share_sum();
        if (share_sum - Decimal::ONE).abs() > SHARE_TOLERANCE {
            issues.push(format!("revenue shares sum to {share_sum}, expected 1.0"));
        }
        for (name, share) in [("tailor", self.tailor_share), ("platform", self.platform_share), ("risk buffer", self.risk_buffer_share)] {
            if share.is_sign_negative() { issues.push(format!("{name} share is negative")); }
        }
        for (name, fee) in [("lining", self.fees.lining), ("monogram", self.fees.monogram), ("extra trousers", self.fees.extra_trousers)] {
            if fee.is_sign_negative() { issues.push(format!("{name} fee is negative")); }
        }
        if self.commission_rate.is_sign_negative() || self.commission_rate >= Decimal::ONE {
            issues.push(format!("commission rate {} must be in [0, 1)", self.commission_rate));
        }
        if self.currency.trim().is_empty() { issues.push("currency is empty".into()); }
        PricingSelfCheck { ok: issues.is_empty(), share_sum, issues }
    }

    /// Fails fast when the configuration cannot be deployed.
    pub fn validate(&self) -> Result<()> {
        let check = self.self_check();
        if check.ok { Ok(()) } else { Err(MarketplaceError::PricingConfig(check.issues.join("; "))) }
    }

    pub fn customization_add(&self, customizations: &Customizations) -> Decimal {
        let mut add = Decimal::ZERO;
        if customizations.lining { add += self.fees.lining; }
        if customizations.monogram { add += self.fees.monogram; }
        if customizations.extra_trousers { add += self.fees.extra_trousers; }
        add
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub model_id: SuitModelId,
    pub fabric_id: Uuid,
    pub base_price: Money,
    pub fabric_add: Money,
    pub customization_add: Money,
    pub total_price: Money,
    pub tailor_share: Money,
    pub platform_fee: Money,
    pub risk_buffer: Money,
}

/// Read side of the fabric catalog used while pricing.
#[async_trait]
pub trait FabricCatalog: Send + Sync {
    async fn fabric(&self, id: Uuid) -> Result<Option<Fabric>>;
}

pub struct PriceCalculator<'a> {
    config: &'a PricingConfig,
}

impl<'a> PriceCalculator<'a> {
    pub fn new(config: &'a PricingConfig) -> Self { Self { config } }

    /// Prices a model + active fabric + customizations. Pure.
    ///
    /// `total = base + fabric + customizations` exactly. The tailor and platform
    /// shares are rounded to whole units; the risk buffer takes the remainder so
    /// the three shares always add up to the total.
    pub fn calculate(&self, model_id: &str, fabric: &Fabric, customizations: &Customizations) -> Result<PriceBreakdown> {
        let model = SuitModel::lookup(model_id).map_err(|e| MarketplaceError::InvalidModel(e.0))?;
        if !fabric.is_active { return Err(MarketplaceError::FabricInactive(fabric.id)); }
        let currency = self.config.currency.as_str();

        let base_price = Money::new(model.base_price, currency);
        let fabric_add = Money::new(fabric.price_add, currency);
        let customization_add = Money::new(self.config.customization_add(customizations), currency);
        let total_price = base_price.add(&fabric_add)?.add(&customization_add)?;

        let tailor_share = total_price.scale(self.config.tailor_share).round_units();
        let platform_fee = total_price.scale(self.config.platform_share).round_units();
        let risk_buffer = total_price.subtract(&tailor_share)?.subtract(&platform_fee)?;

        Ok(PriceBreakdown {
            model_id: model.id, fabric_id: fabric.id, base_price, fabric_add, customization_add,
            total_price, tailor_share, platform_fee, risk_buffer,
        })
    }

    /// Validates the model first, then performs the single fabric lookup.
    pub async fn quote(&self, catalog: &dyn FabricCatalog, configuration: &SuitConfiguration) -> Result<PriceBreakdown> {
        configuration.check()?;
        SuitModel::lookup(&configuration.model_id).map_err(|e| MarketplaceError::InvalidModel(e.0))?;
        let found = catalog.fabric(configuration.fabric_id).await?;
        let fabric = Fabric::resolve_for_pricing(configuration.fabric_id, found)?;
        self.calculate(&configuration.model_id, &fabric, &configuration.customizations)
    }
}
