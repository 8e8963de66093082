pub mod account;
pub mod booking;
pub mod notification;
pub mod session;
pub mod token;
pub mod user;
