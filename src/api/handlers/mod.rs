pub mod form;
pub mod hepatitis;

pub use form::*;
pub use hepatitis::*;
