//! Client core for the Tienda retail admin API.
//!
//! # Overview
//! Mirrors the server's categories, products, users and cart entries in
//! memory and keeps those mirrors in step with the remote API after every
//! create, update and delete.
//!
//! # Design
//! - `ApiClient` builds requests and parses envelopes as plain data; the
//!   network round-trip goes through an injected `Transport`.
//! - One `EntityService` per resource maps domain verbs to the wire contract.
//! - `EntityStore` owns the mirrored `Collection` and patches it only after the
//!   server confirms a change.
//! - Forms must pass local validation (`Validated<T>`) before a service will
//!   send them.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod multipart;
pub mod services;
pub mod store;
pub mod transport;
pub mod types;
pub mod validation;
pub mod views;

pub use client::{resolve_image_url, ApiClient};
pub use config::ClientConfig;
pub use envelope::{Envelope, Payload};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use multipart::{ImageFile, MultipartForm};
pub use services::{CartService, CategoryService, EntityService, ProductService, UserService};
pub use store::{
    CartStore, CategoryStore, Collection, EntityStore, LoadState, Mutation, ProductStore, SubmitError, UserStore,
};
#[cfg(any(test, feature = "test-util"))]
pub use transport::ScriptedTransport;
pub use transport::{Transport, UreqTransport};
pub use types::{CartEntry, CartForm, Category, CategoryForm, Entity, EntityId, Product, ProductForm, User, UserForm};
pub use validation::{FieldErrors, Validate, Validated};
