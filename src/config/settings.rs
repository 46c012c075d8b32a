use std::str::FromStr;

use crate::error::{BotError, Result};

pub const DEFAULT_API_HOST: &str = "https://likes.ffgarena.cloud/api/v2";
pub const DEFAULT_CHANNELS_PATH: &str = "like_channels.json";

/// Settings for the upstream likes API
#[derive(Debug, Clone)]
pub struct LikeApiSettings {
    /// Base URL; requests go to `{api_host}/likes`
    pub api_host: String,
    pub auth: String,
    pub amount_of_likes: u32,
    pub primary_region: String,
    pub fallback_region: String,
    /// RapidAPI key; no key headers are sent when absent
    pub api_key: Option<String>,
    /// Value for `x-rapidapi-host`, defaults to the host part of `api_host`
    pub api_key_host: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LikeApiSettings {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            auth: "vortex".to_string(),
            amount_of_likes: 100,
            primary_region: "br".to_string(),
            fallback_region: "ind".to_string(),
            api_key: None,
            api_key_host: host_of(DEFAULT_API_HOST),
            timeout_secs: 15,
        }
    }
}

/// How replies are decorated
#[derive(Debug, Clone)]
pub struct PresentationSettings {
    pub footer_text: String,
    /// Offset used for the footer clock
    pub footer_utc_offset_hours: i32,
    /// Optional invite link rendered as a link button
    pub invite_url: Option<String>,
}

impl Default for PresentationSettings {
    fn default() -> Self {
        Self {
            footer_text: "VorteX System".to_string(),
            footer_utc_offset_hours: -3,
            invite_url: None,
        }
    }
}

/// Everything the bot reads from the environment at startup
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub discord_token: String,
    pub channels_path: String,
    pub cooldown_secs: u64,
    pub api: LikeApiSettings,
    pub presentation: PresentationSettings,
}

impl BotSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN").ok_or_else(|| BotError::ConfigValidation {
            message: "Missing DISCORD_TOKEN environment variable".to_string(),
        })?;

        let api_defaults = LikeApiSettings::default();
        let api_host = get("LIKE_API_HOST")
            .map(|h| h.trim_end_matches('/').to_string())
            .unwrap_or(api_defaults.api_host);
        let api_key_host = get("RAPIDAPI_HOST").or_else(|| host_of(&api_host));

        let api = LikeApiSettings {
            auth: get("LIKE_API_AUTH").unwrap_or(api_defaults.auth),
            amount_of_likes: parse_or("LIKE_AMOUNT", get("LIKE_AMOUNT"), api_defaults.amount_of_likes)?,
            primary_region: get("LIKE_PRIMARY_REGION").unwrap_or(api_defaults.primary_region),
            fallback_region: get("LIKE_FALLBACK_REGION").unwrap_or(api_defaults.fallback_region),
            api_key: get("RAPIDAPI_KEY"),
            api_key_host,
            timeout_secs: parse_or("LIKE_TIMEOUT_SECS", get("LIKE_TIMEOUT_SECS"), api_defaults.timeout_secs)?,
            api_host,
        };

        let presentation_defaults = PresentationSettings::default();
        let presentation = PresentationSettings {
            footer_text: get("LIKE_FOOTER_TEXT").unwrap_or(presentation_defaults.footer_text),
            footer_utc_offset_hours: parse_or(
                "LIKE_FOOTER_UTC_OFFSET_HOURS",
                get("LIKE_FOOTER_UTC_OFFSET_HOURS"),
                presentation_defaults.footer_utc_offset_hours,
            )?,
            invite_url: get("LIKE_INVITE_URL"),
        };

        if !(-23..=23).contains(&presentation.footer_utc_offset_hours) {
            return Err(BotError::ConfigValidation {
                message: format!(
                    "LIKE_FOOTER_UTC_OFFSET_HOURS must be between -23 and 23, got {}",
                    presentation.footer_utc_offset_hours
                ),
            });
        }

        Ok(Self {
            discord_token,
            channels_path: get("LIKE_CHANNELS_PATH").unwrap_or_else(|| DEFAULT_CHANNELS_PATH.to_string()),
            cooldown_secs: parse_or("LIKE_COOLDOWN_SECS", get("LIKE_COOLDOWN_SECS"), 30)?,
            api,
            presentation,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| BotError::ConfigValidation {
            message: format!("{} has an invalid value: '{}'", key, raw),
        }),
    }
}

fn host_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
}
