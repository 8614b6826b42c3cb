//! In-memory mirrors of the server collections.
//!
//! # Design
//! `Collection` is a plain state container with one method per transition
//! (fetch started / succeeded / failed, mutation applied); it does no I/O and
//! is tested on its own. `EntityStore` drives those transitions around an
//! `EntityService`:
//!
//! - Fetch errors are absorbed into the collection (`LoadState::Error` plus a
//!   message) and the previous items are kept.
//! - Mutations patch local state only after the server confirmed them. Their
//!   errors go back to the caller and leave the collection untouched.
//! - Every call races the store's cancellation token. Once the owning view
//!   cancels it (or the store is dropped) results are discarded instead of
//!   applied, and callers get `ApiError::Cancelled`.
//!
//! Mutations take `&mut self`, so one store never has two in flight.

use std::future::Future;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::services::{CartService, CategoryService, EntityService, ProductService, UserService};
use crate::types::{CartEntry, Entity, EntityId, Product};
use crate::validation::{FieldErrors, Validate, Validated};
use crate::views;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// A confirmed server-side change to replay locally.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<E> {
    Created(E),
    Updated { id: EntityId, entity: E },
    Deleted(EntityId),
}

/// Items plus load state and the last fetch error.
#[derive(Debug, Clone)]
pub struct Collection<E> {
    items: Vec<E>,
    state: LoadState,
    error: Option<String>,
}

impl<E> Default for Collection<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            state: LoadState::Idle,
            error: None,
        }
    }
}

impl<E: Entity> Collection<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, id: EntityId) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn fetch_started(&mut self) {
        self.state = LoadState::Loading;
        self.error = None;
    }

    /// Replace the items wholesale.
    pub fn fetch_succeeded(&mut self, items: Vec<E>) {
        self.items = items;
        self.state = LoadState::Ready;
        self.error = None;
    }

    /// Record the failure; the previous items stay.
    pub fn fetch_failed(&mut self, message: String) {
        self.state = LoadState::Error;
        self.error = Some(message);
    }

    /// State and error as they were before `fetch_started`.
    pub fn snapshot(&self) -> (LoadState, Option<String>) {
        (self.state, self.error.clone())
    }

    /// Undo `fetch_started` for a fetch whose result was discarded.
    pub fn fetch_abandoned(&mut self, (state, error): (LoadState, Option<String>)) {
        self.state = state;
        self.error = error;
    }

    /// Replay a confirmed mutation. Returns whether a local entry matched;
    /// `Created` always applies.
    ///
    /// `Updated` replaces the entry with the matching id in place. `Deleted`
    /// removes it. An id that is not mirrored locally leaves the items
    /// unchanged.
    pub fn apply(&mut self, mutation: Mutation<E>) -> bool {
        match mutation {
            Mutation::Created(entity) => {
                self.items.push(entity);
                true
            }
            Mutation::Updated { id, entity } => match self.items.iter_mut().find(|item| item.id() == id) {
                Some(slot) => {
                    *slot = entity;
                    true
                }
                None => false,
            },
            Mutation::Deleted(id) => {
                let before = self.items.len();
                self.items.retain(|item| item.id() != id);
                self.items.len() != before
            }
        }
    }
}

/// Failure of a validate-then-send submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Blocked locally; nothing was sent.
    #[error("form has invalid fields: {0}")]
    Invalid(#[from] FieldErrors),

    #[error(transparent)]
    Api(#[from] ApiError),
}

async fn until_cancelled<T, F>(token: &CancellationToken, operation: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(ApiError::Cancelled),
        result = operation => result,
    }
}

/// Mirror of one remote collection, owned by a view.
pub struct EntityStore<S: EntityService> {
    service: S,
    collection: Collection<S::Entity>,
    cancel: CancellationToken,
}

pub type CategoryStore = EntityStore<CategoryService>;
pub type ProductStore = EntityStore<ProductService>;
pub type UserStore = EntityStore<UserService>;
pub type CartStore = EntityStore<CartService>;

impl<S: EntityService> std::fmt::Debug for EntityStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("path", &S::PATH)
            .field("collection", &self.collection)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<S: EntityService> EntityStore<S> {
    /// Idle store. Its token is a child of `view`, so cancelling the view
    /// cancels the store.
    pub fn new(service: S, view: &CancellationToken) -> Self {
        Self {
            service,
            collection: Collection::new(),
            cancel: view.child_token(),
        }
    }

    /// Build the store and run the initial fetch.
    pub async fn mount(service: S, view: &CancellationToken) -> Self {
        let mut store = Self::new(service, view);
        store.refetch().await;
        store
    }

    pub fn collection(&self) -> &Collection<S::Entity> {
        &self.collection
    }

    pub fn items(&self) -> &[S::Entity] {
        self.collection.items()
    }

    pub fn state(&self) -> LoadState {
        self.collection.state()
    }

    pub fn error(&self) -> Option<&str> {
        self.collection.error()
    }

    pub fn is_loading(&self) -> bool {
        self.collection.is_loading()
    }

    pub fn find(&self, id: EntityId) -> Option<&S::Entity> {
        self.collection.find(id)
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Discard every result that arrives from now on.
    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    /// Reload the whole collection. Errors are kept in the collection state,
    /// not returned.
    pub async fn refetch(&mut self) -> LoadState {
        if self.cancel.is_cancelled() {
            return self.collection.state();
        }
        let previous = self.collection.snapshot();
        self.collection.fetch_started();

        let result = until_cancelled(&self.cancel, self.service.list()).await;
        match result {
            Ok(items) => {
                debug!(path = S::PATH, count = items.len(), "collection loaded");
                self.collection.fetch_succeeded(items);
            }
            Err(ApiError::Cancelled) => {
                debug!(path = S::PATH, "fetch discarded after unmount");
                self.collection.fetch_abandoned(previous);
            }
            Err(err) => {
                warn!(path = S::PATH, error = %err.message(), "failed to load collection");
                self.collection.fetch_failed(err.message());
            }
        }
        self.collection.state()
    }

    /// Create on the server, then append the returned entity.
    pub async fn create(&mut self, form: &Validated<S::Form>) -> Result<S::Entity, ApiError> {
        let result = until_cancelled(&self.cancel, self.service.create(form)).await;
        let entity = result.inspect_err(|err| log_mutation_error("create", S::PATH, err))?;
        self.collection.apply(Mutation::Created(entity.clone()));
        Ok(entity)
    }

    /// Update on the server, then replace the local entry with the same id.
    pub async fn update(&mut self, id: EntityId, form: &Validated<S::Form>) -> Result<S::Entity, ApiError> {
        let result = until_cancelled(&self.cancel, self.service.update(id, form)).await;
        let entity = result.inspect_err(|err| log_mutation_error("update", S::PATH, err))?;
        let matched = self.collection.apply(Mutation::Updated {
            id,
            entity: entity.clone(),
        });
        if !matched {
            warn!(path = S::PATH, id, "updated entity is not in the local collection");
        }
        Ok(entity)
    }

    /// Delete on the server, then drop the local entry.
    ///
    /// Returns whether a local entry was removed; a server-confirmed delete of
    /// an id that was never mirrored leaves the collection as it was.
    pub async fn delete(&mut self, id: EntityId) -> Result<bool, ApiError> {
        let result = until_cancelled(&self.cancel, self.service.delete(id)).await;
        result.inspect_err(|err| log_mutation_error("delete", S::PATH, err))?;
        let removed = self.collection.apply(Mutation::Deleted(id));
        if !removed {
            warn!(path = S::PATH, id, "deleted entity was not in the local collection");
        }
        Ok(removed)
    }
}

impl<S> EntityStore<S>
where
    S: EntityService,
    S::Form: Validate,
{
    /// Validate `form`, then create. Invalid forms never reach the network.
    pub async fn submit_create(&mut self, form: S::Form) -> Result<S::Entity, SubmitError> {
        let form = form.validate()?;
        Ok(self.create(&form).await?)
    }

    /// Validate `form`, then update `id`.
    pub async fn submit_update(&mut self, id: EntityId, form: S::Form) -> Result<S::Entity, SubmitError> {
        let form = form.validate()?;
        Ok(self.update(id, &form).await?)
    }
}

fn log_mutation_error(action: &str, path: &str, err: &ApiError) {
    if !err.is_cancelled() {
        warn!(action, path, error = %err.message(), "mutation failed");
    }
}

impl<S: EntityService> Drop for EntityStore<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl EntityStore<ProductService> {
    pub fn by_category(&self, category_id: EntityId) -> Vec<&Product> {
        views::products_in_category(self.items(), category_id)
    }
}

impl EntityStore<CartService> {
    pub fn for_user(&self, user_id: EntityId) -> Vec<&CartEntry> {
        views::entries_for_user(self.items(), user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    fn category(id: EntityId, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
        }
    }

    fn loaded() -> Collection<Category> {
        let mut collection = Collection::new();
        collection.fetch_started();
        collection.fetch_succeeded(vec![category(1, "Hogar"), category(2, "Electro"), category(3, "Ropa")]);
        collection
    }

    fn ids(collection: &Collection<Category>) -> Vec<EntityId> {
        collection.items().iter().map(|c| c.id).collect()
    }

    #[test]
    fn fetch_transitions() {
        let mut collection = Collection::<Category>::new();
        assert_eq!(collection.state(), LoadState::Idle);
        collection.fetch_started();
        assert!(collection.is_loading());
        collection.fetch_succeeded(vec![category(1, "Hogar")]);
        assert_eq!(collection.state(), LoadState::Ready);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn fetch_failure_keeps_previous_items() {
        let mut collection = loaded();
        collection.fetch_started();
        collection.fetch_failed("offline".to_string());
        assert_eq!(collection.state(), LoadState::Error);
        assert_eq!(collection.error(), Some("offline"));
        assert_eq!(collection.len(), 3);

        collection.fetch_started();
        assert!(collection.error().is_none());
    }

    #[test]
    fn created_appends() {
        let mut collection = loaded();
        assert!(collection.apply(Mutation::Created(category(9, "Juguetes"))));
        assert_eq!(ids(&collection), vec![1, 2, 3, 9]);
    }

    #[test]
    fn updated_replaces_in_place() {
        let mut collection = loaded();
        assert!(collection.apply(Mutation::Updated {
            id: 2,
            entity: category(2, "Electrónica"),
        }));
        assert_eq!(ids(&collection), vec![1, 2, 3]);
        assert_eq!(collection.find(2).unwrap().name, "Electrónica");
        assert_eq!(collection.find(1).unwrap().name, "Hogar");
    }

    #[test]
    fn updated_unknown_id_changes_nothing() {
        let mut collection = loaded();
        assert!(!collection.apply(Mutation::Updated {
            id: 77,
            entity: category(77, "Nada"),
        }));
        assert_eq!(ids(&collection), vec![1, 2, 3]);
    }

    #[test]
    fn deleted_removes_and_preserves_order() {
        let mut collection = loaded();
        assert!(collection.apply(Mutation::Deleted(2)));
        assert_eq!(ids(&collection), vec![1, 3]);
    }

    #[test]
    fn deleted_unknown_id_changes_nothing() {
        let mut collection = loaded();
        assert!(!collection.apply(Mutation::Deleted(99)));
        assert_eq!(ids(&collection), vec![1, 2, 3]);
    }

    #[test]
    fn abandoned_fetch_restores_state() {
        let mut collection = loaded();
        let before = collection.snapshot();
        collection.fetch_started();
        collection.fetch_abandoned(before);
        assert_eq!(collection.state(), LoadState::Ready);
        assert!(collection.error().is_none());
    }

    #[test]
    fn abandoned_fetch_restores_previous_error() {
        let mut collection = loaded();
        collection.fetch_started();
        collection.fetch_failed("offline".to_string());

        let before = collection.snapshot();
        collection.fetch_started();
        assert!(collection.error().is_none());
        collection.fetch_abandoned(before);

        assert_eq!(collection.state(), LoadState::Error);
        assert_eq!(collection.error(), Some("offline"));
        assert_eq!(collection.len(), 3);
    }
}
