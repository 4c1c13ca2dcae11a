pub mod decoder;
pub mod dump;
pub mod layout;
pub mod request;

pub use decoder::{decode_all, StopReason};
pub use request::Request;
