pub mod api_key;
pub mod auth;
pub mod plan;
pub mod review;
pub mod usage;
pub mod user;
pub mod word;

pub use api_key::*;
pub use auth::*;
pub use plan::*;
pub use review::*;
pub use usage::*;
pub use user::*;
pub use word::*;
