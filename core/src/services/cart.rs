use async_trait::async_trait;
use tracing::instrument;

use super::{delete_by_id, json_with_id, list_all, EntityService};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::{CartEntry, CartForm, EntityId};
use crate::validation::Validated;

/// `/carrito`, JSON payloads.
#[derive(Debug, Clone)]
pub struct CartService {
    client: ApiClient,
}

impl CartService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EntityService for CartService {
    type Entity = CartEntry;
    type Form = CartForm;

    const PATH: &'static str = "/carrito";
    const ID_KEY: &'static str = "idCompra";

    async fn list(&self) -> Result<Vec<CartEntry>, ApiError> {
        list_all(&self.client, Self::PATH).await
    }

    #[instrument(skip_all, fields(user_id = form.user_id, product_id = form.product_id))]
    async fn create(&self, form: &Validated<CartForm>) -> Result<CartEntry, ApiError> {
        let form: &CartForm = form;
        self.client
            .post::<CartEntry, _>(Self::PATH, form)
            .await?
            .into_entity()
    }

    #[instrument(skip(self, form))]
    async fn update(&self, id: EntityId, form: &Validated<CartForm>) -> Result<CartEntry, ApiError> {
        let body = json_with_id(&**form, Self::ID_KEY, id)?;
        self.client
            .put::<CartEntry, _>(Self::PATH, &body)
            .await?
            .into_entity()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: EntityId) -> Result<(), ApiError> {
        delete_by_id(&self.client, Self::PATH, Self::ID_KEY, id).await
    }
}
