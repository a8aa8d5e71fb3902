//! Router groups, split by who may call them. Access control is attached per group in
//! `create_router`, so a handler's group decides its gate.

/// Anonymous reads plus sign-up and sign-in. Handlers that can show hidden rows take an
/// optional `AuthUser` and decide per request.
pub mod public;

/// Any caller with a valid session token.
pub mod authenticated;

/// Admins and hospital managers.
pub mod staff;

/// Admins only.
pub mod admin;
