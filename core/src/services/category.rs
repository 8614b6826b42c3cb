use async_trait::async_trait;
use tracing::instrument;

use super::{delete_by_id, json_with_id, list_all, EntityService};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::{Category, CategoryForm, EntityId};
use crate::validation::Validated;

/// `/categoria`, JSON payloads.
#[derive(Debug, Clone)]
pub struct CategoryService {
    client: ApiClient,
}

impl CategoryService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EntityService for CategoryService {
    type Entity = Category;
    type Form = CategoryForm;

    const PATH: &'static str = "/categoria";
    const ID_KEY: &'static str = "idCategoria";

    async fn list(&self) -> Result<Vec<Category>, ApiError> {
        list_all(&self.client, Self::PATH).await
    }

    #[instrument(skip_all, fields(name = %form.name))]
    async fn create(&self, form: &Validated<CategoryForm>) -> Result<Category, ApiError> {
        let form: &CategoryForm = form;
        self.client
            .post::<Category, _>(Self::PATH, form)
            .await?
            .into_entity()
    }

    #[instrument(skip(self, form))]
    async fn update(&self, id: EntityId, form: &Validated<CategoryForm>) -> Result<Category, ApiError> {
        let body = json_with_id(&**form, Self::ID_KEY, id)?;
        self.client
            .put::<Category, _>(Self::PATH, &body)
            .await?
            .into_entity()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: EntityId) -> Result<(), ApiError> {
        delete_by_id(&self.client, Self::PATH, Self::ID_KEY, id).await
    }
}
