mod conversation;
mod cursor;
mod event;
mod invite;
mod member;
mod message;
mod unit;
mod upload;
mod user;

pub use conversation::*;
pub use cursor::*;
pub use event::*;
pub use invite::*;
pub use member::*;
pub use message::*;
pub use unit::*;
pub use upload::*;
pub use user::*;
