pub mod booking;
pub mod memory;
pub mod opaque_token;
pub mod refresh_token;
pub mod user;
