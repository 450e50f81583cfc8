use pseo_core::LinkCandidate;
use serde::{Deserialize, Serialize};

pub const PRODUCTS_ROUTE: &str = "/products";

/// A storefront product that articles may link to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub name: String,
    pub slug: String,
    /// Alternative spellings and common misspellings, linked to the same page
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl CatalogProduct {
    pub fn new(name: &str, slug: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            slug: slug.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn url(&self) -> String {
        format!("{}/{}", PRODUCTS_ROUTE, self.slug)
    }

    pub fn matches(&self, subject: &str) -> bool {
        let subject = subject.trim();
        self.name.eq_ignore_ascii_case(subject)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(subject))
    }

    fn candidates(&self) -> impl Iterator<Item = LinkCandidate> + '_ {
        let url = self.url();
        std::iter::once(self.name.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .map(move |text| LinkCandidate::new(text, url.clone()))
    }
}

/// The set of linkable entities: products with their aliases plus a few
/// fixed navigation targets.
#[derive(Debug, Clone, Default)]
pub struct LinkCatalog {
    products: Vec<CatalogProduct>,
    navigation: Vec<LinkCandidate>,
}

impl LinkCatalog {
    pub fn new(products: Vec<CatalogProduct>, navigation: Vec<LinkCandidate>) -> Self {
        Self {
            products,
            navigation,
        }
    }

    pub fn products(&self) -> &[CatalogProduct] {
        &self.products
    }

    pub fn navigation(&self) -> &[LinkCandidate] {
        &self.navigation
    }

    pub fn product(&self, subject: &str) -> Option<&CatalogProduct> {
        self.products.iter().find(|p| p.matches(subject))
    }

    /// Product candidates for an item about `subject`: the subject's own name
    /// and aliases come first, then every other product.
    pub fn candidates_for(&self, subject: &str) -> Vec<LinkCandidate> {
        let (own, others): (Vec<&CatalogProduct>, Vec<&CatalogProduct>) =
            self.products.iter().partition(|p| p.matches(subject));

        own.into_iter()
            .chain(others)
            .flat_map(|p| p.candidates())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> LinkCatalog {
        LinkCatalog::new(
            vec![
                CatalogProduct::new("BPC-157", "bpc-157", &["BPC 157", "Body Protection Compound"]),
                CatalogProduct::new("TB-500", "tb-500", &["TB500"]),
            ],
            vec![
                LinkCandidate::new("product catalog", "/products"),
                LinkCandidate::new("about us", "/about"),
            ],
        )
    }

    #[test]
    fn test_subject_candidates_come_first() {
        let candidates = catalog().candidates_for("tb500");
        assert_eq!(
            candidates,
            vec![
                LinkCandidate::new("TB-500", "/products/tb-500"),
                LinkCandidate::new("TB500", "/products/tb-500"),
                LinkCandidate::new("BPC-157", "/products/bpc-157"),
                LinkCandidate::new("BPC 157", "/products/bpc-157"),
                LinkCandidate::new("Body Protection Compound", "/products/bpc-157"),
            ]
        );
    }

    #[test]
    fn test_unknown_subject_keeps_catalog_order() {
        let candidates = catalog().candidates_for("Semaglutide");
        assert_eq!(candidates.len(), 5);
        assert_eq!(candidates[0].text, "BPC-157");
    }

    #[test]
    fn test_lookup_and_navigation() {
        let catalog = catalog();
        assert_eq!(catalog.product("body protection compound").unwrap().slug, "bpc-157");
        assert!(catalog.product("nothing").is_none());
        assert_eq!(catalog.navigation()[1].url, "/about");
    }
}
