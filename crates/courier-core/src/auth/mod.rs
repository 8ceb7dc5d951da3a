//! Authentication token lifecycle
//!
//! - `cache`: where the token and the logged-in identity live
//! - `decoder`: how claims and expiry are read from a token
//! - `session`: the derived authenticated/unauthenticated state

pub mod cache;
pub mod claims;
pub mod decoder;
pub mod session;

pub use cache::{MemoryTokenCache, TokenCache};
pub use claims::Claims;
pub use decoder::{JwtDecoder, TokenDecoder};
pub use session::{AuthSessionManager, Session};
