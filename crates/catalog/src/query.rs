use serde::{Deserialize, Serialize};

use crate::{Product, SellerId};

/// Default number of hits returned by a search.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Field a search is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Price,
    Quantity,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Price => "price",
            SortField::Quantity => "quantity",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Builder for keyword searches against the catalog.
///
/// The keyword is matched against title, category and description, in that
/// order of weight. By default only products with stock are returned,
/// highest price first, at most [`DEFAULT_SEARCH_LIMIT`] hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    pub category: Option<String>,
    pub seller_id: Option<SellerId>,
    pub in_stock_only: bool,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub limit: usize,
}

impl SearchQuery {
    /// Creates a search for `keyword` with default filters.
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            category: None,
            seller_id: None,
            in_stock_only: true,
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    /// Restricts hits to one category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Restricts hits to one seller.
    pub fn seller(mut self, seller_id: impl Into<SellerId>) -> Self {
        self.seller_id = Some(seller_id.into());
        self
    }

    /// Includes products that are out of stock.
    pub fn include_out_of_stock(mut self) -> Self {
        self.in_stock_only = false;
        self
    }

    pub fn sort_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_field = field;
        self.sort_order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Returns true if `product` passes every filter and matches the keyword.
    ///
    /// Matching is a case-insensitive substring test of any keyword term
    /// against title, category and description.
    pub fn matches(&self, product: &Product) -> bool {
        if self.in_stock_only && !product.is_in_stock() {
            return false;
        }
        if let Some(ref category) = self.category
            && &product.category != category
        {
            return false;
        }
        if let Some(ref seller_id) = self.seller_id
            && &product.seller_id != seller_id
        {
            return false;
        }

        let haystacks = [
            product.title.to_lowercase(),
            product.category.to_lowercase(),
            product.description.to_lowercase(),
        ];
        self.keyword
            .split_whitespace()
            .map(str::to_lowercase)
            .any(|term| haystacks.iter().any(|h| h.contains(&term)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Money;

    fn lamp() -> Product {
        Product::new("p1", "Brass desk lamp", "s1", Money::from_cents(4500), 3)
            .with_category("lighting")
    }

    #[test]
    fn defaults_follow_catalog_search() {
        let query = SearchQuery::keyword("lamp");
        assert!(query.in_stock_only);
        assert_eq!(query.sort_field, SortField::Price);
        assert_eq!(query.sort_order, SortOrder::Desc);
        assert_eq!(query.limit, DEFAULT_SEARCH_LIMIT);
    }

    #[test]
    fn matches_any_term_case_insensitively() {
        assert!(SearchQuery::keyword("LAMP").matches(&lamp()));
        assert!(SearchQuery::keyword("chair lighting").matches(&lamp()));
        assert!(!SearchQuery::keyword("chair").matches(&lamp()));
    }

    #[test]
    fn filters_apply() {
        let sold_out = Product {
            quantity: 0,
            ..lamp()
        };
        assert!(!SearchQuery::keyword("lamp").matches(&sold_out));
        assert!(
            SearchQuery::keyword("lamp")
                .include_out_of_stock()
                .matches(&sold_out)
        );
        assert!(!SearchQuery::keyword("lamp").seller("s2").matches(&lamp()));
        assert!(!SearchQuery::keyword("lamp").category("garden").matches(&lamp()));
    }
}
