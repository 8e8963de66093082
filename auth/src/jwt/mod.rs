pub mod claims;
pub mod codec;
pub mod errors;
pub mod keys;

pub use claims::AccessClaims;
pub use codec::JwtCodec;
pub use errors::JwtError;
pub use keys::KeyRing;
