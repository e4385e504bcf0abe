pub mod errors;
pub mod models;
pub mod password;
pub mod store;
pub mod time;
pub mod tokens;

pub use errors::*;
pub use models::*;
pub use store::JsonStore;
pub use tokens::{AuthClaims, IssuedToken, TokenService, VerifyClaims};
