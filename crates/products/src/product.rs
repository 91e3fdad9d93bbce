use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Entity, ProductId};

use crate::price::Price;

/// Catalog record for one product.
///
/// `quantity` is a cache of the product's ledger total; the reconciliation
/// engine keeps it in sync. `version` counts catalog writes and is stamped by
/// the store, which uses it for conditional writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    product_id: ProductId,
    product_name: String,
    price: Price,
    quantity: i64,
    sales_count: i64,
    #[serde(default)]
    version: u64,
}

impl Product {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        price: Price,
        quantity: i64,
    ) -> DomainResult<Self> {
        let product_name = validate_name(product_name.into())?;
        ensure_non_negative_quantity(quantity)?;

        Ok(Self {
            product_id,
            product_name,
            price,
            quantity,
            sales_count: 0,
            version: 0,
        })
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn price(&self) -> Price {
        self.price
    }

    /// Cached quantity (see [`Product`]).
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn sales_count(&self) -> i64 {
        self.sales_count
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn rename(&mut self, product_name: impl Into<String>) -> DomainResult<()> {
        self.product_name = validate_name(product_name.into())?;
        Ok(())
    }

    pub fn reprice(&mut self, price: Price) {
        self.price = price;
    }

    /// Overwrite the cached quantity with a ledger-derived total.
    pub fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
    }

    /// Same record with `quantity` replaced, for ledger-authoritative reads.
    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn record_sale(&mut self, units: i64) -> DomainResult<()> {
        if units <= 0 {
            return Err(DomainError::invalid_argument("units sold must be positive"));
        }
        self.sales_count = self
            .sales_count
            .checked_add(units)
            .ok_or_else(|| DomainError::invalid_argument("sales count out of range"))?;
        Ok(())
    }

    /// Set by the catalog store when the record is written.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.product_id
    }
}

fn validate_name(name: String) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_argument("product_name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn ensure_non_negative_quantity(quantity: i64) -> DomainResult<()> {
    if quantity < 0 {
        return Err(DomainError::invalid_argument("quantity cannot be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Product {
        Product::new(
            ProductId::parse("p1").unwrap(),
            "Widget",
            Price::parse("9.99").unwrap(),
            20,
        )
        .unwrap()
    }

    #[test]
    fn new_product_starts_without_sales() {
        let p = widget();
        assert_eq!(p.sales_count(), 0);
        assert_eq!(p.version(), 0);
        assert_eq!(p.id().as_str(), "p1");
    }

    #[test]
    fn rejects_blank_name_and_negative_quantity() {
        let id = ProductId::parse("p1").unwrap();
        let price = Price::parse("1").unwrap();
        assert!(Product::new(id.clone(), "  ", price, 1).is_err());
        assert!(Product::new(id, "Widget", price, -1).is_err());
    }

    #[test]
    fn record_sale_accumulates() {
        let mut p = widget();
        p.record_sale(3).unwrap();
        p.record_sale(2).unwrap();
        assert_eq!(p.sales_count(), 5);
        assert!(p.record_sale(0).is_err());
    }

    #[test]
    fn json_uses_catalog_field_names() {
        let json = serde_json::to_value(widget()).unwrap();
        assert_eq!(json["product_id"], "p1");
        assert_eq!(json["product_name"], "Widget");
        assert_eq!(json["price"], "9.99");
        assert_eq!(json["quantity"], 20);
    }
}
