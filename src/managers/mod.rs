pub mod cooldown;
pub mod like_client;
pub mod like_service;

pub use cooldown::{Clock, CooldownTracker, SystemClock};
pub use like_client::LikeClient;
pub use like_service::{create_shared_like_service, LikeService, SharedLikeService};
