mod conversation_service_impl;
mod identity_client_fake;
mod invite_service_impl;
mod message_service_impl;
mod object_storage_client_fake;

pub use conversation_service_impl::*;
pub use identity_client_fake::*;
pub use invite_service_impl::*;
pub use message_service_impl::*;
pub use object_storage_client_fake::*;
