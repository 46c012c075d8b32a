pub mod general;
pub mod like;
pub mod like_channel;

pub use general::{help, ping};
pub use like::like;
pub use like_channel::set_like_channel;
