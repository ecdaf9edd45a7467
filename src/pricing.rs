use serde::{Deserialize, Serialize};

/// A single volume discount tier. The highest tier whose `min_volume` the
/// job meets or exceeds wins; tiers never stack.
#[derive(Debug, Clone, Copy)]
pub struct DiscountTier {
    /// Minimum cubic yards required to qualify.
    pub min_volume: f64,
    /// Fractional discount (0.10 = 10% off).
    pub discount: f64,
}

/// Flat labor surcharges added after the discount.
#[derive(Debug, Clone, Copy)]
pub struct LaborSurcharges {
    pub stairs: f64,
    pub difficult_access: f64,
    pub heavy_items: f64,
}

/// Pricing table injected into the engine at construction.
///
/// Kept as a plain value (not a module-level constant) so tests and future
/// admin tooling can supply alternate tables.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub base_rate_per_yard: f64,
    pub minimum_charge: f64,
    pub disposal_fee_per_yard: f64,
    pub labor_surcharges: LaborSurcharges,
    /// Must be sorted by ascending `min_volume`.
    pub volume_discounts: Vec<DiscountTier>,
}

impl PricingConfig {
    /// The production pricing table: $25/yd base, $150 minimum, $8/yd
    /// disposal, and 10/15/20% discounts at 50/100/200 cubic yards.
    pub fn standard() -> Self {
        Self {
            base_rate_per_yard: 25.0,
            minimum_charge: 150.0,
            disposal_fee_per_yard: 8.0,
            labor_surcharges: LaborSurcharges {
                stairs: 50.0,
                difficult_access: 75.0,
                heavy_items: 100.0,
            },
            volume_discounts: vec![
                DiscountTier {
                    min_volume: 50.0,
                    discount: 0.10,
                },
                DiscountTier {
                    min_volume: 100.0,
                    discount: 0.15,
                },
                DiscountTier {
                    min_volume: 200.0,
                    discount: 0.20,
                },
            ],
        }
    }
}

/// Caller-selected handling difficulty flags.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurchargeOptions {
    pub stairs: bool,
    pub difficult_access: bool,
    pub heavy_items: bool,
}

/// Customer-facing price band in whole dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: i64,
    pub max: i64,
    pub estimate: i64,
}

/// One surcharge line in a breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct SurchargeLine {
    pub name: String,
    pub amount: f64,
}

/// Itemized decomposition of a single-volume price, for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
    pub base_price: f64,
    pub disposal_fee: f64,
    /// Discount amount in dollars.
    pub discount: f64,
    pub discount_percent: f64,
    pub subtotal: f64,
    pub surcharges: Vec<SurchargeLine>,
    pub surcharge_total: f64,
    pub total: i64,
}

/// Pure tiered-pricing calculator. No I/O, no state beyond the injected table.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Price for a single volume, unrounded.
    ///
    /// `max(volume * base + volume * disposal, minimum)` with the highest
    /// qualifying discount tier applied, then flat surcharges added.
    /// Inputs are expected to be clamped to >= 0 by the caller's validation;
    /// the engine itself has no guard.
    pub fn price_single(&self, cubic_yards: f64, options: &SurchargeOptions) -> f64 {
        let base_price = cubic_yards * self.config.base_rate_per_yard;
        let disposal_fee = cubic_yards * self.config.disposal_fee_per_yard;

        let mut subtotal = (base_price + disposal_fee).max(self.config.minimum_charge);

        let discount = self.discount_for(cubic_yards);
        if discount > 0.0 {
            subtotal *= 1.0 - discount;
        }

        subtotal + self.surcharge_total(options)
    }

    /// Customer-facing price band for an estimated volume range.
    ///
    /// Margins are asymmetric on purpose: -20% on the low-volume price and
    /// +20% on the high-volume price quote a wider band than the raw formula.
    /// `estimate` averages the unrounded pre-margin prices, so its ordering
    /// relative to `min`/`max` depends on the discount table in play.
    pub fn price_range(
        &self,
        cubic_yards_min: f64,
        cubic_yards_max: f64,
        options: &SurchargeOptions,
    ) -> PriceRange {
        let min_price = self.price_single(cubic_yards_min, options);
        let max_price = self.price_single(cubic_yards_max, options);

        PriceRange {
            min: (min_price * 0.8).round() as i64,
            max: (max_price * 1.2).round() as i64,
            estimate: ((min_price + max_price) / 2.0).round() as i64,
        }
    }

    /// Itemized breakdown for a single volume. Same arithmetic as
    /// `price_single`, with the intermediate values exposed for display.
    pub fn breakdown(&self, cubic_yards: f64, options: &SurchargeOptions) -> PricingBreakdown {
        let base_price = cubic_yards * self.config.base_rate_per_yard;
        let disposal_fee = cubic_yards * self.config.disposal_fee_per_yard;

        let subtotal_before_discount = (base_price + disposal_fee).max(self.config.minimum_charge);

        let discount_fraction = self.discount_for(cubic_yards);
        let discount_amount = subtotal_before_discount * discount_fraction;
        let subtotal = subtotal_before_discount - discount_amount;

        let mut surcharges = Vec::new();
        if options.stairs {
            surcharges.push(SurchargeLine {
                name: "Stairs".to_string(),
                amount: self.config.labor_surcharges.stairs,
            });
        }
        if options.difficult_access {
            surcharges.push(SurchargeLine {
                name: "Difficult Access".to_string(),
                amount: self.config.labor_surcharges.difficult_access,
            });
        }
        if options.heavy_items {
            surcharges.push(SurchargeLine {
                name: "Heavy Items".to_string(),
                amount: self.config.labor_surcharges.heavy_items,
            });
        }
        let surcharge_total: f64 = surcharges.iter().map(|s| s.amount).sum();

        PricingBreakdown {
            base_price,
            disposal_fee,
            discount: discount_amount,
            discount_percent: discount_fraction * 100.0,
            subtotal,
            surcharges,
            surcharge_total,
            total: (subtotal + surcharge_total).round() as i64,
        }
    }

    /// Highest qualifying tier, 0 if none match.
    fn discount_for(&self, cubic_yards: f64) -> f64 {
        let mut discount = 0.0;
        for tier in &self.config.volume_discounts {
            if cubic_yards >= tier.min_volume {
                discount = tier.discount;
            }
        }
        discount
    }

    fn surcharge_total(&self, options: &SurchargeOptions) -> f64 {
        let mut surcharges = 0.0;
        if options.stairs {
            surcharges += self.config.labor_surcharges.stairs;
        }
        if options.difficult_access {
            surcharges += self.config.labor_surcharges.difficult_access;
        }
        if options.heavy_items {
            surcharges += self.config.labor_surcharges.heavy_items;
        }
        surcharges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PricingEngine {
        PricingEngine::new(PricingConfig::standard())
    }

    #[test]
    fn minimum_charge_applies_to_small_volumes() {
        let engine = engine();
        assert_eq!(engine.price_single(0.0, &SurchargeOptions::default()), 150.0);
        assert_eq!(engine.price_single(1.0, &SurchargeOptions::default()), 150.0);
        // 5 * 33 = 165 clears the minimum
        assert_eq!(engine.price_single(5.0, &SurchargeOptions::default()), 165.0);
    }

    #[test]
    fn discount_uses_highest_qualifying_tier_only() {
        let engine = engine();
        // 150 yd qualifies for both the 50-yd and 100-yd tiers; only 15% applies
        let price = engine.price_single(150.0, &SurchargeOptions::default());
        assert_eq!(price, 150.0 * 33.0 * 0.85);
        // 200 yd gets 20%, not 10+15+20
        let price = engine.price_single(200.0, &SurchargeOptions::default());
        assert_eq!(price, 200.0 * 33.0 * 0.80);
    }

    #[test]
    fn surcharges_are_flat_and_cumulative() {
        let engine = engine();
        let options = SurchargeOptions {
            stairs: true,
            difficult_access: true,
            heavy_items: true,
        };
        let base = engine.price_single(10.0, &SurchargeOptions::default());
        assert_eq!(engine.price_single(10.0, &options), base + 225.0);
    }

    #[test]
    fn surcharges_added_after_discount() {
        let engine = engine();
        let options = SurchargeOptions {
            stairs: true,
            ..Default::default()
        };
        // 50 yd: 1650 pre-discount, 10% off, then the flat 50
        assert_eq!(engine.price_single(50.0, &options), 1650.0 * 0.9 + 50.0);
    }

    #[test]
    fn tier_boundary_dips_below_pre_tier_price() {
        // Known quirk of threshold discounts: 50 yd is cheaper than 49 yd.
        let engine = engine();
        let just_below = engine.price_single(49.0, &SurchargeOptions::default());
        let at_tier = engine.price_single(50.0, &SurchargeOptions::default());
        assert!(at_tier < just_below);
    }

    #[test]
    fn breakdown_itemizes_the_same_arithmetic() {
        let engine = engine();
        let options = SurchargeOptions {
            stairs: true,
            ..Default::default()
        };
        let breakdown = engine.breakdown(50.0, &options);

        assert_eq!(breakdown.base_price, 1250.0);
        assert_eq!(breakdown.disposal_fee, 400.0);
        assert_eq!(breakdown.discount_percent, 10.0);
        assert_eq!(breakdown.discount, 165.0);
        assert_eq!(breakdown.subtotal, 1485.0);
        assert_eq!(breakdown.surcharges.len(), 1);
        assert_eq!(breakdown.surcharges[0].name, "Stairs");
        assert_eq!(breakdown.surcharge_total, 50.0);
        assert_eq!(breakdown.total, 1535);

        let single = engine.price_single(50.0, &options);
        assert_eq!(breakdown.total, single.round() as i64);
    }

    #[test]
    fn breakdown_below_minimum_reports_minimum_as_subtotal() {
        let engine = engine();
        let breakdown = engine.breakdown(2.0, &SurchargeOptions::default());
        assert_eq!(breakdown.base_price, 50.0);
        assert_eq!(breakdown.disposal_fee, 16.0);
        assert_eq!(breakdown.subtotal, 150.0);
        assert_eq!(breakdown.total, 150);
    }
}
