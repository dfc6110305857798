pub mod api_key;
pub mod jwt;
pub mod password;

pub use api_key::*;
pub use jwt::*;
pub use password::*;
