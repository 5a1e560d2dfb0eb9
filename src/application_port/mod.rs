mod conversation_service;
mod error;
mod invite_service;
mod message_service;

pub use conversation_service::*;
pub use error::*;
pub use invite_service::*;
pub use message_service::*;
