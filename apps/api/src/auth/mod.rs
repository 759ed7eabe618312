// Authentication (password login, Redis sessions) and role-based gating.

pub mod extractor;
pub mod handlers;
pub mod password;
pub mod roles;
pub mod session;

pub use roles::{CurrentUser, Permission, Role};
