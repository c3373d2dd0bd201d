pub mod principal;
pub mod resolve;
pub mod store;
pub mod token;

pub use principal::{generate_api_key, Principal};
pub use resolve::{AuthenticatedPrincipal, Authenticator, API_KEY_HEADER, LEGACY_ADMIN_ID};
pub use store::PrincipalStore;
pub use token::{TokenError, TokenService};
