pub mod messages;
pub mod producer;
