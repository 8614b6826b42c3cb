//! Domain entities and form payloads.
//!
//! # Design
//! Rust field names are English; serde renames map them to the remote API's
//! wire keys. Ids are assigned by the server. `0` only ever appears in form
//! state, meaning "nothing selected".

use serde::{Deserialize, Deserializer, Serialize};

use crate::multipart::ImageFile;

/// Server-assigned identifier.
pub type EntityId = u64;

/// Anything kept in a mirrored collection.
pub trait Entity: Clone + std::fmt::Debug + Send + Sync + 'static {
    fn id(&self) -> EntityId;
}

/// The server sends `""` for "no image"; normalize that to `None`.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    #[serde(rename = "idCategoria")]
    pub id: EntityId,
    #[serde(rename = "nombreCategoria")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(rename = "idProducto")]
    pub id: EntityId,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "precio")]
    pub price: f64,
    #[serde(rename = "cantidad")]
    pub quantity: i64,
    #[serde(rename = "unidad")]
    pub unit: String,
    #[serde(rename = "idCategoria")]
    pub category_id: EntityId,
    #[serde(
        rename = "urlImagen",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    /// Present when the server joins the category into the listing.
    #[serde(rename = "nombreCategoria", default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "idUsuario")]
    pub id: EntityId,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "documento")]
    pub document: String,
    /// Stored and returned in plain text by the remote API.
    #[serde(rename = "contrasena")]
    pub password: String,
    #[serde(
        rename = "urlImagen",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("document", &self.document)
            .field("password", &"[REDACTED]")
            .field("image_url", &self.image_url)
            .finish()
    }
}

/// One product assigned to one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartEntry {
    #[serde(rename = "idCompra")]
    pub id: EntityId,
    #[serde(rename = "idUsuario")]
    pub user_id: EntityId,
    #[serde(rename = "idProducto")]
    pub product_id: EntityId,
    #[serde(rename = "nombreUsuario", default, skip_serializing_if = "Option::is_none")]
    pub user_first_name: Option<String>,
    #[serde(rename = "apellidoUsuario", default, skip_serializing_if = "Option::is_none")]
    pub user_last_name: Option<String>,
    #[serde(rename = "descripcionProducto", default, skip_serializing_if = "Option::is_none")]
    pub product_description: Option<String>,
    #[serde(rename = "precioProducto", default, skip_serializing_if = "Option::is_none")]
    pub product_price: Option<f64>,
}

impl Entity for Category {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Entity for Product {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Entity for User {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Entity for CartEntry {
    fn id(&self) -> EntityId {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CategoryForm {
    #[serde(rename = "nombreCategoria")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductForm {
    pub description: String,
    pub price: f64,
    pub quantity: i64,
    pub unit: String,
    pub category_id: EntityId,
    pub image: Option<ImageFile>,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct UserForm {
    pub first_name: String,
    pub last_name: String,
    pub document: String,
    pub password: String,
    pub image: Option<ImageFile>,
}

impl std::fmt::Debug for UserForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserForm")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("document", &self.document)
            .field("password", &"[REDACTED]")
            .field("image", &self.image)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CartForm {
    #[serde(rename = "idUsuario")]
    pub user_id: EntityId,
    #[serde(rename = "idProducto")]
    pub product_id: EntityId,
}

impl From<&Category> for CategoryForm {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
        }
    }
}

/// Prefill an edit form. The image is left empty: not re-uploading keeps the
/// stored one.
impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        Self {
            description: product.description.clone(),
            price: product.price,
            quantity: product.quantity,
            unit: product.unit.clone(),
            category_id: product.category_id,
            image: None,
        }
    }
}

impl From<&User> for UserForm {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            document: user.document.clone(),
            password: user.password.clone(),
            image: None,
        }
    }
}

impl From<&CartEntry> for CartForm {
    fn from(entry: &CartEntry) -> Self {
        Self {
            user_id: entry.user_id,
            product_id: entry.product_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_reads_wire_keys() {
        let json = r#"{"idProducto":5,"descripcion":"Leche","precio":3.5,"cantidad":12,
            "unidad":"litro","idCategoria":2,"urlImagen":"uploads/leche.png"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, 5);
        assert_eq!(product.price, 3.5);
        assert_eq!(product.image_url.as_deref(), Some("uploads/leche.png"));
        assert!(product.category_name.is_none());
    }

    #[test]
    fn empty_image_url_reads_as_none() {
        let json = r#"{"idUsuario":1,"nombre":"Ana","apellido":"Ruiz","documento":"123456",
            "contrasena":"secreto","urlImagen":""}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.image_url.is_none());

        let json = r#"{"idUsuario":1,"nombre":"Ana","apellido":"Ruiz","documento":"123456",
            "contrasena":"secreto","urlImagen":null}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.image_url.is_none());
    }

    #[test]
    fn user_debug_redacts_password() {
        let user = User {
            id: 1,
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            document: "123456".to_string(),
            password: "secreto".to_string(),
            image_url: None,
        };
        assert!(!format!("{user:?}").contains("secreto"));
        assert_eq!(user.full_name(), "Ana Ruiz");
    }

    #[test]
    fn cart_entry_accepts_joined_fields() {
        let json = r#"{"idCompra":42,"idUsuario":1,"idProducto":5,"nombreUsuario":"Ana","precioProducto":3.5}"#;
        let entry: CartEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.user_first_name.as_deref(), Some("Ana"));
        assert_eq!(entry.product_price, Some(3.5));
        assert!(entry.product_description.is_none());
    }

    #[test]
    fn cart_form_serializes_to_wire_keys() {
        let form = CartForm {
            user_id: 1,
            product_id: 5,
        };
        let json = serde_json::to_value(form).unwrap();
        assert_eq!(json, serde_json::json!({"idUsuario": 1, "idProducto": 5}));
    }
}
