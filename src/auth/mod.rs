//! Identity primitives shared by every service: password hashing, the
//! per-request [`Principal`] and the self-or-admin authorization rules.

pub mod password;
pub mod policy;
pub mod principal;

pub use password::CredentialHasher;
pub use policy::AccessDenied;
pub use principal::Principal;
