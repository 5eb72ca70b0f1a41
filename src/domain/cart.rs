use super::catalog::Variant;
use super::checkout::CheckoutId;
use crate::error::StoreError;
use rust_decimal::Decimal;
use std::fmt;

pub const MIN_QUANTITY: u32 = 1;
pub const MAX_QUANTITY: u32 = 10;

/// Inclusive bounds on a single line's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityLimits {
    min: u32,
    max: u32,
}

impl QuantityLimits {
    pub fn new(min: u32, max: u32) -> Result<Self, StoreError> {
        if min == 0 {
            return Err(StoreError::ValidationError(
                "Minimum quantity must be at least 1".to_string(),
            ));
        }
        if min > max {
            return Err(StoreError::ValidationError(format!(
                "Minimum quantity {min} exceeds maximum {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn clamp(&self, quantity: u32) -> u32 {
        quantity.clamp(self.min, self.max)
    }
}

impl Default for QuantityLimits {
    fn default() -> Self {
        Self {
            min: MIN_QUANTITY,
            max: MAX_QUANTITY,
        }
    }
}

/// Names a cart owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CartId(String);

impl CartId {
    pub const DEFAULT: &'static str = "default";
    pub const BUY_NOW: &'static str = "buy-now";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The cart used by one-shot "buy now" checkouts.
    pub fn buy_now() -> Self {
        Self::new(Self::BUY_NOW)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CartId {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for CartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub variant_id: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    lines: Vec<LineItem>,
    current_checkout: Option<CheckoutId>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn line(&self, variant_id: &str) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.variant_id == variant_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of items across all lines.
    pub fn quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(LineItem::line_total).sum()
    }

    pub fn current_checkout(&self) -> Option<&CheckoutId> {
        self.current_checkout.as_ref()
    }

    pub fn set_current_checkout(&mut self, checkout: CheckoutId) {
        self.current_checkout = Some(checkout);
    }

    /// Adds `quantity` of a variant on top of any existing line, keeping the
    /// line inside `limits`. Returns the resulting line quantity.
    pub fn add(&mut self, variant: &Variant, quantity: u32, limits: QuantityLimits) -> u32 {
        match self.lines.iter_mut().find(|l| l.variant_id == variant.id) {
            Some(line) => {
                line.quantity = limits.clamp(line.quantity.saturating_add(quantity));
                line.unit_price = variant.price;
                line.quantity
            }
            None => {
                let quantity = limits.clamp(quantity);
                self.lines.push(LineItem {
                    variant_id: variant.id.clone(),
                    quantity,
                    unit_price: variant.price,
                });
                quantity
            }
        }
    }

    /// Replaces a line's quantity outright.
    pub fn set(&mut self, variant: &Variant, quantity: u32, limits: QuantityLimits) -> u32 {
        self.lines.retain(|l| l.variant_id != variant.id);
        self.add(variant, quantity, limits)
    }

    /// Removes `quantity` items of a variant, or the whole line when
    /// `quantity` is `None` or covers it. Returns what is left on the line.
    pub fn remove(&mut self, variant_id: &str, quantity: Option<u32>) -> u32 {
        let Some(index) = self.lines.iter().position(|l| l.variant_id == variant_id) else {
            return 0;
        };
        match quantity {
            Some(n) if n < self.lines[index].quantity => {
                self.lines[index].quantity -= n;
                self.lines[index].quantity
            }
            _ => {
                self.lines.remove(index);
                0
            }
        }
    }

    pub fn reset(&mut self) {
        self.lines.clear();
        self.current_checkout = None;
    }
}
