use crate::error::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;

pub const PRODUCT_GID_PREFIX: &str = "gid://shopify/Product/";
pub const VARIANT_GID_PREFIX: &str = "gid://shopify/ProductVariant/";

/// Returns the part of a global id after its last `/`.
///
/// `"gid://shopify/ProductVariant/42"` becomes `"42"`; ids without a slash are
/// returned as-is.
pub fn split_item_id(full_id: &str) -> &str {
    match full_id.rfind('/') {
        Some(index) => &full_id[index + 1..],
        None => full_id,
    }
}

fn product_gid(id: &str) -> String {
    format!("{PRODUCT_GID_PREFIX}{}", split_item_id(id))
}

fn variant_gid(id: &str) -> String {
    format!("{VARIANT_GID_PREFIX}{}", split_item_id(id))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Full global id, e.g. `gid://shopify/ProductVariant/101`.
    pub id: String,
    pub title: String,
    pub price: Decimal,
    #[serde(default = "default_available")]
    pub available_for_sale: bool,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

fn default_available() -> bool {
    true
}

impl Variant {
    pub fn has_option(&self, name: &str, value: &str) -> bool {
        self.selected_options
            .iter()
            .any(|option| option.name == name && option.value == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    /// First variant carrying every requested `(name, value)` option.
    pub fn variant_for_options(&self, options: &HashMap<String, String>) -> Option<&Variant> {
        self.variants.iter().find(|variant| {
            options
                .iter()
                .all(|(name, value)| variant.has_option(name, value))
        })
    }

    /// Option names in the order they first appear across variants.
    pub fn option_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for option in self.variants.iter().flat_map(|v| &v.selected_options) {
            if !names.contains(&option.name.as_str()) {
                names.push(&option.name);
            }
        }
        names
    }
}

/// Products available to the store, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Reads a catalog document of the form `{"products": [...]}`.
    pub fn from_json_reader<R: Read>(source: R) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Accepts either the numeric id or the full global id.
    pub fn product(&self, product_id: &str) -> Option<&Product> {
        let wanted = product_gid(product_id);
        self.products.iter().find(|p| p.id == wanted)
    }

    /// Finds a variant of any product, together with its parent.
    pub fn find_variant(&self, variant_id: &str) -> Option<(&Product, &Variant)> {
        let wanted = variant_gid(variant_id);
        self.products.iter().find_map(|product| {
            product
                .variants
                .iter()
                .find(|v| v.id == wanted)
                .map(|variant| (product, variant))
        })
    }

    pub fn product_variant(&self, product_id: &str, variant_id: &str) -> Option<&Variant> {
        let wanted = variant_gid(variant_id);
        self.product(product_id)?
            .variants
            .iter()
            .find(|v| v.id == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const CATALOG: &str = r#"{
        "products": [
            {
                "id": "gid://shopify/Product/1",
                "title": "Tee",
                "variants": [
                    {
                        "id": "gid://shopify/ProductVariant/101",
                        "title": "Small / Red",
                        "price": "19.99",
                        "selected_options": [
                            {"name": "Size", "value": "Small"},
                            {"name": "Color", "value": "Red"}
                        ]
                    },
                    {
                        "id": "gid://shopify/ProductVariant/102",
                        "title": "Large / Red",
                        "price": "21.50",
                        "available_for_sale": false,
                        "selected_options": [
                            {"name": "Size", "value": "Large"},
                            {"name": "Color", "value": "Red"}
                        ]
                    }
                ]
            },
            {
                "id": "gid://shopify/Product/2",
                "title": "Mug",
                "variants": [
                    {"id": "gid://shopify/ProductVariant/201", "title": "Default Title", "price": 8}
                ]
            }
        ]
    }"#;

    fn catalog() -> Catalog {
        Catalog::from_json_reader(CATALOG.as_bytes()).unwrap()
    }

    #[test]
    fn test_split_item_id() {
        assert_eq!(split_item_id("gid://shopify/ProductVariant/42"), "42");
        assert_eq!(split_item_id("42"), "42");
    }

    #[test]
    fn test_catalog_parses_defaults() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 2);
        let (_, mug) = catalog.find_variant("201").unwrap();
        assert_eq!(mug.price, dec!(8));
        assert!(mug.available_for_sale);
        assert!(mug.selected_options.is_empty());
    }

    #[test]
    fn test_lookup_by_short_and_full_id() {
        let catalog = catalog();
        assert_eq!(catalog.product("1").unwrap().title, "Tee");
        assert_eq!(
            catalog.product("gid://shopify/Product/2").unwrap().title,
            "Mug"
        );
        assert!(catalog.product("3").is_none());

        let (parent, variant) = catalog.find_variant("102").unwrap();
        assert_eq!(parent.title, "Tee");
        assert!(!variant.available_for_sale);

        assert!(catalog.product_variant("1", "201").is_none());
        assert_eq!(catalog.product_variant("2", "201").unwrap().title, "Default Title");
    }

    #[test]
    fn test_variant_for_options() {
        let catalog = catalog();
        let tee = catalog.product("1").unwrap();

        let mut options = HashMap::new();
        options.insert("Size".to_string(), "Large".to_string());
        options.insert("Color".to_string(), "Red".to_string());
        assert_eq!(
            tee.variant_for_options(&options).unwrap().id,
            "gid://shopify/ProductVariant/102"
        );

        options.insert("Size".to_string(), "Medium".to_string());
        assert!(tee.variant_for_options(&options).is_none());

        // An empty selection matches the first variant.
        assert_eq!(
            tee.variant_for_options(&HashMap::new()).unwrap().id,
            "gid://shopify/ProductVariant/101"
        );
    }

    #[test]
    fn test_option_names_are_ordered_and_unique() {
        let catalog = catalog();
        assert_eq!(catalog.product("1").unwrap().option_names(), vec!["Size", "Color"]);
    }
}
