pub mod admin;
pub mod health;
pub mod host;
pub mod sse;
pub mod validation;
