//! Form Validation
//!
//! Pre-flight checks for every form the storefront accepts. Failures are
//! reported per field and never reach the identity provider or the store.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::application::config::StorefrontConfig;
use crate::domain::entity::{
    Address, CategoryDraft, CategoryPatch, ProductDraft, ProductImage, ProductPatch,
};
use crate::domain::value_object::email::Email;

/// One invalid field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All invalid fields of one form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Message for `field`, if it failed
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

fn check_email(errors: &mut ValidationErrors, field: &'static str, raw: &str) -> Option<Email> {
    if raw.trim().is_empty() {
        errors.add(field, "Email is required");
        return None;
    }
    match Email::new(raw) {
        Ok(email) => Some(email),
        Err(err) => {
            errors.add(field, err.message().to_string());
            None
        }
    }
}

/// Validated email and password
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self, config: &StorefrontConfig) -> Result<Credentials, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = check_email(&mut errors, "email", &self.email);

        if self.password.is_empty() {
            errors.add("password", "Password is required");
        } else if self.password.chars().count() < config.min_password_length {
            errors.add(
                "password",
                format!(
                    "Password must be at least {} characters",
                    config.min_password_length
                ),
            );
        }

        match email {
            Some(email) if errors.is_empty() => Ok(Credentials {
                email,
                password: self.password.clone(),
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn validate(&self, config: &StorefrontConfig) -> Result<Credentials, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = check_email(&mut errors, "email", &self.email);

        if self.password.is_empty() {
            errors.add("password", "Password is required");
        } else if self.password.chars().count() < config.min_password_length {
            errors.add(
                "password",
                format!(
                    "Password must be at least {} characters long",
                    config.min_password_length
                ),
            );
        }

        if self.confirm_password.is_empty() {
            errors.add("confirmPassword", "Please confirm your password");
        } else if self.confirm_password != self.password {
            errors.add("confirmPassword", "Passwords do not match");
        }

        match email {
            Some(email) if errors.is_empty() => Ok(Credentials {
                email,
                password: self.password.clone(),
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetForm {
    pub email: String,
}

impl ResetForm {
    pub fn validate(&self) -> Result<Email, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match check_email(&mut errors, "email", &self.email) {
            Some(email) => Ok(email),
            None => Err(errors),
        }
    }
}

pub fn validate_address(address: &Address) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if address.full_name.trim().is_empty() {
        errors.add("fullName", "Full name is required");
    }

    let digits: String = address.phone.chars().filter(char::is_ascii_digit).collect();
    if address.phone.trim().is_empty() {
        errors.add("phone", "Phone number is required");
    } else if digits.len() != 10 {
        errors.add("phone", "Please enter a valid 10-digit phone number");
    }

    if address.street_address.trim().is_empty() {
        errors.add("address", "Address is required");
    }
    if address.city.trim().is_empty() {
        errors.add("city", "City is required");
    }
    if address.state.trim().is_empty() {
        errors.add("state", "State is required");
    }

    let pincode = address.postal_code.trim();
    if pincode.is_empty() {
        errors.add("pincode", "Pincode is required");
    } else if pincode.len() != 6 || !pincode.chars().all(|c| c.is_ascii_digit()) {
        errors.add("pincode", "Please enter a valid 6-digit pincode");
    }

    errors.into_result(())
}

fn check_price(errors: &mut ValidationErrors, price: f64) {
    if !price.is_finite() || price < 0.0 {
        errors.add("price", "Price must be a non-negative number");
    }
}

fn check_stock(errors: &mut ValidationErrors, stock: i64) -> Option<u32> {
    let checked = u32::try_from(stock).ok();
    if checked.is_none() {
        errors.add("stock", "Stock must be a non-negative whole number");
    }
    checked
}

fn check_images(errors: &mut ValidationErrors, images: &[ProductImage], max: usize) {
    if images.len() > max {
        errors.add("images", format!("A product can have at most {max} images"));
    }
    if images.iter().any(|image| image.url.trim().is_empty()) {
        errors.add("images", "Every image needs a URL");
    }
}

/// Checks a new product; yields its stock as stored
pub fn validate_product_draft(
    draft: &ProductDraft,
    config: &StorefrontConfig,
) -> Result<u32, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if draft.name.trim().is_empty() {
        errors.add("name", "Product name is required");
    }
    check_price(&mut errors, draft.price);
    let stock = check_stock(&mut errors, draft.stock);
    if draft.category.trim().is_empty() {
        errors.add("category", "Category is required");
    }
    check_images(&mut errors, &draft.images, config.max_product_images);

    match stock {
        Some(stock) => errors.into_result(stock),
        None => Err(errors),
    }
}

/// Checks a product patch; yields the new stock, if the patch sets one
pub fn validate_product_patch(
    patch: &ProductPatch,
    config: &StorefrontConfig,
) -> Result<Option<u32>, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        errors.add("name", "Product name is required");
    }
    if let Some(price) = patch.price {
        check_price(&mut errors, price);
    }
    let stock = patch.stock.map(|stock| check_stock(&mut errors, stock));
    if patch
        .category
        .as_deref()
        .is_some_and(|category| category.trim().is_empty())
    {
        errors.add("category", "Category is required");
    }
    if let Some(images) = &patch.images {
        check_images(&mut errors, images, config.max_product_images);
    }

    errors.into_result(stock.flatten())
}

pub fn validate_category_draft(draft: &CategoryDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if draft.name.trim().is_empty() {
        errors.add("name", "Category name is required");
    }
    errors.into_result(())
}

pub fn validate_category_patch(patch: &CategoryPatch) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        errors.add("name", "Category name is required");
    }
    errors.into_result(())
}
