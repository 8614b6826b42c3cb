//! Read-only views derived from mirrored collections.
//!
//! Computed on demand from whatever is currently loaded; nothing here is
//! stored. References are not checked against the server: a missing user,
//! product or category is rendered with [`UNKNOWN_LABEL`].

use crate::types::{CartEntry, Category, EntityId, Product, User};

/// Placeholder for a reference that is not in the loaded collection.
pub const UNKNOWN_LABEL: &str = "unknown";

pub fn products_in_category(products: &[Product], category_id: EntityId) -> Vec<&Product> {
    products.iter().filter(|p| p.category_id == category_id).collect()
}

pub fn entries_for_user(entries: &[CartEntry], user_id: EntityId) -> Vec<&CartEntry> {
    entries.iter().filter(|e| e.user_id == user_id).collect()
}

pub fn category_name(categories: &[Category], id: EntityId) -> &str {
    categories
        .iter()
        .find(|c| c.id == id)
        .map_or(UNKNOWN_LABEL, |c| c.name.as_str())
}

/// A cart entry joined with its user and product for display.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub entry_id: EntityId,
    pub user_id: EntityId,
    pub product_id: EntityId,
    pub user_name: String,
    pub user_document: String,
    pub product_name: String,
    pub product_price: f64,
    /// Server-relative; resolve with `ApiClient::resolve_image_url`.
    pub product_image: Option<String>,
}

/// Join entries against the loaded users and products.
///
/// When a reference is not loaded, the names the server joined into the entry
/// are used if present, then the placeholder.
pub fn cart_lines(entries: &[CartEntry], users: &[User], products: &[Product]) -> Vec<CartLine> {
    entries
        .iter()
        .map(|entry| {
            let user = users.iter().find(|u| u.id == entry.user_id);
            let product = products.iter().find(|p| p.id == entry.product_id);

            let user_name = match (user, &entry.user_first_name) {
                (Some(user), _) => user.full_name(),
                (None, Some(first)) => match &entry.user_last_name {
                    Some(last) => format!("{first} {last}"),
                    None => first.clone(),
                },
                (None, None) => UNKNOWN_LABEL.to_string(),
            };
            let product_name = product
                .map(|p| p.description.clone())
                .or_else(|| entry.product_description.clone())
                .unwrap_or_else(|| UNKNOWN_LABEL.to_string());

            CartLine {
                entry_id: entry.id,
                user_id: entry.user_id,
                product_id: entry.product_id,
                user_name,
                user_document: user.map(|u| u.document.clone()).unwrap_or_default(),
                product_name,
                product_price: product.map(|p| p.price).or(entry.product_price).unwrap_or(0.0),
                product_image: product.and_then(|p| p.image_url.clone()),
            }
        })
        .collect()
}

pub fn cart_total(lines: &[CartLine]) -> f64 {
    lines.iter().map(|line| line.product_price).sum()
}

/// Case-insensitive match on first or last name, or substring match on the
/// document. A blank term matches everyone.
pub fn search_users<'a>(users: &'a [User], term: &str) -> Vec<&'a User> {
    let term = term.trim();
    if term.is_empty() {
        return users.iter().collect();
    }
    let needle = term.to_lowercase();
    users
        .iter()
        .filter(|u| {
            u.first_name.to_lowercase().contains(&needle)
                || u.last_name.to_lowercase().contains(&needle)
                || u.document.contains(term)
        })
        .collect()
}

/// Optional category filter, then case-insensitive description search.
pub fn filter_products<'a>(products: &'a [Product], category_id: Option<EntityId>, term: &str) -> Vec<&'a Product> {
    let needle = term.trim().to_lowercase();
    products
        .iter()
        .filter(|p| category_id.map_or(true, |id| p.category_id == id))
        .filter(|p| needle.is_empty() || p.description.to_lowercase().contains(&needle))
        .collect()
}
