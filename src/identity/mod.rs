//! Account registration, login and bearer-token validation.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod token;
mod provider;
mod request_context;

pub use principal::{Claims, Principal};
pub use token::TokenService;
pub use provider::AuthService;
pub use request_context::RequestContext;
