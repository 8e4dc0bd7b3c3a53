//! Account domain module.
//!
//! Payloads for the unauthenticated account endpoints (login, registration,
//! password reset) and the per-field validation errors they can return.

mod model;

pub use model::{
    CurrentUser, LoginRequest, RegisterRequest, ResetPasswordRequest, ResetPasswordResponse,
    ValidationErrors,
};
