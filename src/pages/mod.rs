//! Storefront page objects. Each one knows its routes, form selectors and
//! reload targets, and hands the actual work to a `FormSubmitter`.

pub mod base;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod login;
pub mod product;
pub mod register;
pub mod search;
