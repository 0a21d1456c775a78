pub mod auth;
pub mod helix;
pub mod tokens;
