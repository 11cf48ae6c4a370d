pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::{require_auth, CurrentUser};
pub use token::TokenService;
