//! Local form validation.
//!
//! # Design
//! Validation runs before any request is built. It never produces an
//! `ApiError`: failures are collected per field into `FieldErrors` for inline
//! display. A successful run yields `Validated<T>` holding the normalized
//! (trimmed) form; services only accept `Validated` payloads, so an
//! unchecked form cannot reach the network.

use std::collections::BTreeMap;
use std::ops::Deref;

use thiserror::Error;

use crate::multipart::ImageFile;
use crate::types::{CartForm, CategoryForm, ProductForm, UserForm};

/// Largest accepted image upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const ALLOWED_IMAGE_TYPES: [&str; 5] = ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"];

/// Field name to message. Empty means the form may be submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{count} invalid field(s)", count = .0.len())]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field`, keeping the first message per field.
    pub fn add(&mut self, field: &'static str, message: &str) {
        self.0.entry(field).or_insert_with(|| message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    fn finish<T>(self, value: T) -> Result<Validated<T>, FieldErrors> {
        if self.is_empty() {
            Ok(Validated(value))
        } else {
            Err(self)
        }
    }
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T>(T);

impl<T> Validated<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Validated<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

pub trait Validate: Sized {
    fn validate(self) -> Result<Validated<Self>, FieldErrors>;
}

fn check_text(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    min_chars: usize,
    required_msg: &str,
    length_msg: &str,
) {
    let len = value.chars().count();
    if len == 0 {
        errors.add(field, required_msg);
    } else if len < min_chars {
        errors.add(field, length_msg);
    }
}

/// Type and size checks for an optional upload.
pub fn check_image(errors: &mut FieldErrors, image: Option<&ImageFile>) {
    let Some(image) = image else {
        return;
    };
    if !ALLOWED_IMAGE_TYPES.contains(&image.content_type.as_str()) {
        errors.add("image", "only image files are allowed (JPG, PNG, GIF, WEBP)");
    } else if image.size() > MAX_IMAGE_BYTES {
        errors.add("image", "image cannot exceed 5MB");
    }
}

impl Validate for CategoryForm {
    fn validate(self) -> Result<Validated<Self>, FieldErrors> {
        let name = self.name.trim().to_string();
        let mut errors = FieldErrors::new();
        check_text(
            &mut errors,
            "name",
            &name,
            2,
            "category name is required",
            "name must be at least 2 characters",
        );
        errors.finish(CategoryForm { name })
    }
}

impl Validate for ProductForm {
    fn validate(self) -> Result<Validated<Self>, FieldErrors> {
        let form = ProductForm {
            description: self.description.trim().to_string(),
            unit: self.unit.trim().to_string(),
            ..self
        };
        let mut errors = FieldErrors::new();
        if form.description.is_empty() {
            errors.add("description", "description is required");
        }
        if form.price.is_nan() || form.price <= 0.0 {
            errors.add("price", "price must be greater than 0");
        }
        if form.unit.is_empty() {
            errors.add("unit", "unit is required");
        }
        if form.category_id == 0 {
            errors.add("category_id", "a category must be selected");
        }
        if form.quantity < 0 {
            errors.add("quantity", "quantity cannot be negative");
        }
        check_image(&mut errors, form.image.as_ref());
        errors.finish(form)
    }
}

impl Validate for UserForm {
    fn validate(self) -> Result<Validated<Self>, FieldErrors> {
        let form = UserForm {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            document: self.document.trim().to_string(),
            password: self.password.trim().to_string(),
            image: self.image,
        };
        let mut errors = FieldErrors::new();
        check_text(
            &mut errors,
            "first_name",
            &form.first_name,
            2,
            "first name is required",
            "first name must be at least 2 characters",
        );
        check_text(
            &mut errors,
            "last_name",
            &form.last_name,
            2,
            "last name is required",
            "last name must be at least 2 characters",
        );
        check_text(
            &mut errors,
            "document",
            &form.document,
            6,
            "document is required",
            "document must be at least 6 characters",
        );
        check_text(
            &mut errors,
            "password",
            &form.password,
            6,
            "password is required",
            "password must be at least 6 characters",
        );
        check_image(&mut errors, form.image.as_ref());
        errors.finish(form)
    }
}

impl Validate for CartForm {
    fn validate(self) -> Result<Validated<Self>, FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.user_id == 0 {
            errors.add("user_id", "a user must be selected");
        }
        if self.product_id == 0 {
            errors.add("product_id", "a product must be selected");
        }
        errors.finish(self)
    }
}
