//! Specialized extremum queries over the catalog.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult};

use crate::product::Product;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecializedQuery {
    MostExpensive,
    LeastExpensive,
    MostStock,
    LeastStock,
    BestSeller,
}

impl SpecializedQuery {
    pub const ALL: [SpecializedQuery; 5] = [
        SpecializedQuery::MostExpensive,
        SpecializedQuery::LeastExpensive,
        SpecializedQuery::MostStock,
        SpecializedQuery::LeastStock,
        SpecializedQuery::BestSeller,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpecializedQuery::MostExpensive => "most_expensive",
            SpecializedQuery::LeastExpensive => "least_expensive",
            SpecializedQuery::MostStock => "most_stock",
            SpecializedQuery::LeastStock => "least_stock",
            SpecializedQuery::BestSeller => "best_seller",
        }
    }

    /// Parse a single query kind. Case-insensitive.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let wanted = raw.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                DomainError::invalid_argument(format!(
                    "invalid query type {wanted:?}; valid types: {}, all",
                    valid.join(", ")
                ))
            })
    }

    /// Parse a kind or `all`. `None` means every kind.
    pub fn parse_scope(raw: &str) -> DomainResult<Option<Self>> {
        if raw.trim().eq_ignore_ascii_case("all") {
            return Ok(None);
        }
        Self::parse(raw).map(Some)
    }

    /// Ordering in which the wanted record compares `Greater`.
    fn rank(self, a: &Product, b: &Product) -> Ordering {
        match self {
            SpecializedQuery::MostExpensive => a.price().cmp(&b.price()),
            SpecializedQuery::LeastExpensive => b.price().cmp(&a.price()),
            SpecializedQuery::MostStock => a.quantity().cmp(&b.quantity()),
            SpecializedQuery::LeastStock => b.quantity().cmp(&a.quantity()),
            SpecializedQuery::BestSeller => a.sales_count().cmp(&b.sales_count()),
        }
    }
}

impl core::fmt::Display for SpecializedQuery {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the extremum for `kind`. Ties go to the record seen first.
pub fn select_extremum(products: &[Product], kind: SpecializedQuery) -> Option<&Product> {
    let mut best: Option<&Product> = None;
    for candidate in products {
        match best {
            Some(current) if kind.rank(candidate, current) != Ordering::Greater => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// All five extrema in one structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extrema {
    pub most_expensive: Product,
    pub least_expensive: Product,
    pub most_stock: Product,
    pub least_stock: Product,
    pub best_seller: Product,
}

impl Extrema {
    /// `None` for an empty catalog.
    pub fn from_products(products: &[Product]) -> Option<Self> {
        let pick = |kind| select_extremum(products, kind).cloned();
        Some(Self {
            most_expensive: pick(SpecializedQuery::MostExpensive)?,
            least_expensive: pick(SpecializedQuery::LeastExpensive)?,
            most_stock: pick(SpecializedQuery::MostStock)?,
            least_stock: pick(SpecializedQuery::LeastStock)?,
            best_seller: pick(SpecializedQuery::BestSeller)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::Price;
    use stockledger_core::ProductId;

    fn product(id: &str, price: &str, quantity: i64, sold: i64) -> Product {
        let mut p = Product::new(
            ProductId::parse(id).unwrap(),
            format!("name-{id}"),
            Price::parse(price).unwrap(),
            quantity,
        )
        .unwrap();
        if sold > 0 {
            p.record_sale(sold).unwrap();
        }
        p
    }

    fn ids(p: Option<&Product>) -> &str {
        p.map(|p| p.product_id().as_str()).unwrap_or("<none>")
    }

    #[test]
    fn price_extrema() {
        let catalog = vec![
            product("A", "10", 1, 0),
            product("B", "50", 1, 0),
            product("C", "5", 1, 0),
        ];
        assert_eq!(ids(select_extremum(&catalog, SpecializedQuery::MostExpensive)), "B");
        assert_eq!(ids(select_extremum(&catalog, SpecializedQuery::LeastExpensive)), "C");
    }

    #[test]
    fn ties_go_to_first_record() {
        let catalog = vec![
            product("A", "1", 7, 2),
            product("B", "1", 7, 2),
        ];
        for kind in SpecializedQuery::ALL {
            assert_eq!(ids(select_extremum(&catalog, kind)), "A", "{kind}");
        }
    }

    #[test]
    fn all_extrema_on_mixed_catalog() {
        let catalog = vec![
            product("A", "3", 40, 1),
            product("B", "8", 2, 9),
            product("C", "1", 15, 0),
        ];
        let all = Extrema::from_products(&catalog).unwrap();
        assert_eq!(all.most_expensive.product_id().as_str(), "B");
        assert_eq!(all.least_expensive.product_id().as_str(), "C");
        assert_eq!(all.most_stock.product_id().as_str(), "A");
        assert_eq!(all.least_stock.product_id().as_str(), "B");
        assert_eq!(all.best_seller.product_id().as_str(), "B");
        assert!(Extrema::from_products(&[]).is_none());
    }

    #[test]
    fn parse_accepts_known_kinds_and_all() {
        assert_eq!(
            SpecializedQuery::parse("Best_Seller").unwrap(),
            SpecializedQuery::BestSeller
        );
        assert_eq!(SpecializedQuery::parse_scope("ALL").unwrap(), None);
        let err = SpecializedQuery::parse_scope("cheapest").unwrap_err();
        assert!(err.to_string().contains("most_expensive"));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the chosen record is never beaten by any other record.
            #[test]
            fn extremum_is_not_beaten(quantities in prop::collection::vec(0i64..100, 1..30)) {
                let catalog: Vec<_> = quantities
                    .iter()
                    .enumerate()
                    .map(|(i, q)| product(&format!("p{i}"), "1", *q, 0))
                    .collect();
                let most = select_extremum(&catalog, SpecializedQuery::MostStock).unwrap();
                let least = select_extremum(&catalog, SpecializedQuery::LeastStock).unwrap();
                prop_assert_eq!(most.quantity(), *quantities.iter().max().unwrap());
                prop_assert_eq!(least.quantity(), *quantities.iter().min().unwrap());
            }
        }
    }
}
