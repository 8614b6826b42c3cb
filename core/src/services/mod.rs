//! Entity services: one per remote resource.
//!
//! # Design
//! Each service maps list/create/update/delete onto `ApiClient` calls against
//! a single collection path. The wire contract is the same for all four
//! resources: every verb hits the collection path, and the entity id travels
//! in the request body under the resource's id key, never in the URL.
//! Services do not recover errors; whatever the client returns is propagated.

mod cart;
mod category;
mod product;
mod user;

pub use cart::CartService;
pub use category::CategoryService;
pub use product::ProductService;
pub use user::UserService;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::{Entity, EntityId};
use crate::validation::Validated;

/// Multipart field name for uploaded images.
pub const IMAGE_FIELD: &str = "imagen";

#[async_trait]
pub trait EntityService: Send + Sync {
    type Entity: Entity;
    type Form: Send + Sync;

    /// Collection path, shared by every verb.
    const PATH: &'static str;
    /// Body key identifying an entity on update and delete.
    const ID_KEY: &'static str;

    /// Every entity; an envelope without `data` yields an empty list.
    async fn list(&self) -> Result<Vec<Self::Entity>, ApiError>;

    async fn create(&self, form: &Validated<Self::Form>) -> Result<Self::Entity, ApiError>;

    async fn update(&self, id: EntityId, form: &Validated<Self::Form>) -> Result<Self::Entity, ApiError>;

    async fn delete(&self, id: EntityId) -> Result<(), ApiError>;
}

pub(crate) async fn list_all<E: DeserializeOwned>(client: &ApiClient, path: &str) -> Result<Vec<E>, ApiError> {
    Ok(client.get::<Vec<E>>(path).await?.into_list())
}

/// `{ "<id_key>": id }`
pub(crate) fn id_body(id_key: &str, id: EntityId) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    body.insert(id_key.to_string(), id.into());
    serde_json::Value::Object(body)
}

/// JSON form fields with the id merged in under `id_key`.
pub(crate) fn json_with_id<F: Serialize>(form: &F, id_key: &str, id: EntityId) -> Result<serde_json::Value, ApiError> {
    let mut value = serde_json::to_value(form).map_err(|e| ApiError::Serialization(e.to_string()))?;
    match value.as_object_mut() {
        Some(fields) => {
            fields.insert(id_key.to_string(), id.into());
            Ok(value)
        }
        None => Err(ApiError::Serialization("form did not serialize to an object".to_string())),
    }
}

pub(crate) async fn delete_by_id(client: &ApiClient, path: &str, id_key: &str, id: EntityId) -> Result<(), ApiError> {
    client
        .delete::<serde_json::Value>(path, Some(&id_body(id_key, id)))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CategoryForm;

    #[test]
    fn id_body_uses_given_key() {
        assert_eq!(id_body("idCompra", 42), serde_json::json!({"idCompra": 42}));
    }

    #[test]
    fn json_with_id_merges_into_form_fields() {
        let form = CategoryForm {
            name: "Hogar".to_string(),
        };
        let value = json_with_id(&form, "idCategoria", 3).unwrap();
        assert_eq!(value, serde_json::json!({"idCategoria": 3, "nombreCategoria": "Hogar"}));
    }
}
