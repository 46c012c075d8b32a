pub mod settings;

pub use settings::{BotSettings, LikeApiSettings, PresentationSettings};
