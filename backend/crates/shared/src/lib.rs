//! Shared Kernel
//!
//! Vocabulary every storefront crate agrees on:
//! - The unified error type ([`error::app_error::AppError`]) and its classification
//! - Typed document identifiers ([`id::Id`])
//! - Page/cursor primitives for ordered collection reads ([`page`])
//!
//! Only things whose meaning is identical across all bounded contexts belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
pub mod page;
