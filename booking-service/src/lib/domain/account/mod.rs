pub mod email_verification;
pub mod errors;
pub mod password_reset;
pub mod ports;
