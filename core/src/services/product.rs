use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{delete_by_id, list_all, EntityService, IMAGE_FIELD};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::multipart::MultipartForm;
use crate::types::{EntityId, Product, ProductForm};
use crate::validation::Validated;

/// `/productos`, multipart payloads so an image can ride along.
#[derive(Debug, Clone)]
pub struct ProductService {
    client: ApiClient,
}

impl ProductService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Multipart body for create (`id == None`) or update.
    ///
    /// Scalars are stringified; the image part is omitted entirely when no new
    /// image was chosen so the server keeps the stored one.
    pub fn multipart(form: &ProductForm, id: Option<EntityId>) -> MultipartForm {
        let mut multipart = MultipartForm::new();
        if let Some(id) = id {
            multipart = multipart.text(Self::ID_KEY, id);
        }
        multipart
            .text("cantidad", form.quantity)
            .text("descripcion", &form.description)
            .text("precio", form.price)
            .text("unidad", &form.unit)
            .text("idCategoria", form.category_id)
            .optional_file(IMAGE_FIELD, form.image.as_ref())
    }
}

#[async_trait]
impl EntityService for ProductService {
    type Entity = Product;
    type Form = ProductForm;

    const PATH: &'static str = "/productos";
    const ID_KEY: &'static str = "idProducto";

    async fn list(&self) -> Result<Vec<Product>, ApiError> {
        list_all(&self.client, Self::PATH).await
    }

    #[instrument(skip_all, fields(description = %form.description))]
    async fn create(&self, form: &Validated<ProductForm>) -> Result<Product, ApiError> {
        debug!(image = ?form.image, "creating product");
        let multipart = Self::multipart(form, None);
        self.client
            .post_form::<Product>(Self::PATH, &multipart)
            .await?
            .into_entity()
    }

    #[instrument(skip(self, form))]
    async fn update(&self, id: EntityId, form: &Validated<ProductForm>) -> Result<Product, ApiError> {
        debug!(image = ?form.image, "updating product");
        let multipart = Self::multipart(form, Some(id));
        self.client
            .put_form::<Product>(Self::PATH, &multipart)
            .await?
            .into_entity()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: EntityId) -> Result<(), ApiError> {
        delete_by_id(&self.client, Self::PATH, Self::ID_KEY, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::ImageFile;

    fn form() -> ProductForm {
        ProductForm {
            description: "Arroz".to_string(),
            price: 10.5,
            quantity: 3,
            unit: "kg".to_string(),
            category_id: 2,
            image: None,
        }
    }

    #[test]
    fn create_form_stringifies_scalars() {
        let multipart = ProductService::multipart(&form(), None);
        assert_eq!(multipart.text_value("precio"), Some("10.5"));
        assert_eq!(multipart.text_value("cantidad"), Some("3"));
        assert_eq!(multipart.text_value("idCategoria"), Some("2"));
        assert!(!multipart.has_part("idProducto"));
        assert!(!multipart.has_part("imagen"));
    }

    #[test]
    fn whole_prices_have_no_decimal_point() {
        let multipart = ProductService::multipart(&ProductForm { price: 10.0, ..form() }, None);
        assert_eq!(multipart.text_value("precio"), Some("10"));
    }

    #[test]
    fn update_form_leads_with_id_and_attaches_image() {
        let with_image = ProductForm {
            image: Some(ImageFile::new("a.png", "image/png", vec![1])),
            ..form()
        };
        let multipart = ProductService::multipart(&with_image, Some(9));
        assert_eq!(multipart.parts()[0].name(), "idProducto");
        assert_eq!(multipart.text_value("idProducto"), Some("9"));
        assert!(multipart.has_part("imagen"));
    }
}
