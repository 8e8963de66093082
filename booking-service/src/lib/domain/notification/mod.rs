pub mod errors;
pub mod events;
pub mod links;
pub mod ports;
