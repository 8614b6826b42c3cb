use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{delete_by_id, list_all, EntityService, IMAGE_FIELD};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::multipart::MultipartForm;
use crate::types::{EntityId, User, UserForm};
use crate::validation::Validated;

/// `/usuarios`, multipart payloads so a profile image can ride along.
#[derive(Debug, Clone)]
pub struct UserService {
    client: ApiClient,
}

impl UserService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Multipart body for create (`id == None`) or update. No image part is
    /// written unless a new image was chosen.
    pub fn multipart(form: &UserForm, id: Option<EntityId>) -> MultipartForm {
        let mut multipart = MultipartForm::new();
        if let Some(id) = id {
            multipart = multipart.text(Self::ID_KEY, id);
        }
        multipart
            .text("nombre", &form.first_name)
            .text("apellido", &form.last_name)
            .text("documento", &form.document)
            .text("contrasena", &form.password)
            .optional_file(IMAGE_FIELD, form.image.as_ref())
    }
}

#[async_trait]
impl EntityService for UserService {
    type Entity = User;
    type Form = UserForm;

    const PATH: &'static str = "/usuarios";
    const ID_KEY: &'static str = "idUsuario";

    async fn list(&self) -> Result<Vec<User>, ApiError> {
        list_all(&self.client, Self::PATH).await
    }

    #[instrument(skip_all, fields(document = %form.document))]
    async fn create(&self, form: &Validated<UserForm>) -> Result<User, ApiError> {
        debug!(image = ?form.image, "creating user");
        let multipart = Self::multipart(form, None);
        self.client
            .post_form::<User>(Self::PATH, &multipart)
            .await?
            .into_entity()
    }

    #[instrument(skip(self, form))]
    async fn update(&self, id: EntityId, form: &Validated<UserForm>) -> Result<User, ApiError> {
        debug!(image = ?form.image, "updating user");
        let multipart = Self::multipart(form, Some(id));
        self.client
            .put_form::<User>(Self::PATH, &multipart)
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

    #[test]
    fn multipart_uses_wire_field_names() {
        let form = UserForm {
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            document: "1234567".to_string(),
            password: "secreto".to_string(),
            image: None,
        };
        let multipart = UserService::multipart(&form, Some(4));
        let names: Vec<&str> = multipart.parts().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["idUsuario", "nombre", "apellido", "documento", "contrasena"]);
    }
}
