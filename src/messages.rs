// src/messages.rs

use chrono::{DateTime, FixedOffset, Utc};

use crate::models::{LikeLookupResult, LikeSuccess};

pub const COLOR_SUCCESS: u32 = 0x2ECC71;
pub const COLOR_ERROR: u32 = 0xE74C3C;
pub const COLOR_WARNING: u32 = 0xF1C40F;
pub const COLOR_UNAVAILABLE: u32 = 0xF39C12;

/// Platform-neutral reply for a `/like` outcome
#[derive(Debug, Clone, PartialEq)]
pub enum LikeReply {
    Text(String),
    Embed(EmbedReply),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedReply {
    pub title: String,
    pub description: String,
    pub color: u32,
    /// Extra (name, value) field shown under the description
    pub tip: Option<(String, String)>,
    /// Show the footer clock and the invite button
    pub branded: bool,
    /// Plain footer for unbranded embeds
    pub footer_note: Option<String>,
}

const ERROR_FOOTER: &str = "An error occurred.";

fn error_embed(title: &str, description: &str) -> LikeReply {
    LikeReply::Embed(EmbedReply {
        title: format!("❌ {}", title),
        description: description.to_string(),
        color: COLOR_ERROR,
        tip: None,
        branded: false,
        footer_note: Some(ERROR_FOOTER.to_string()),
    })
}

pub fn render_like_result(result: &LikeLookupResult, invite_url: Option<&str>) -> LikeReply {
    match result {
        LikeLookupResult::Forbidden => {
            LikeReply::Text("COMANDO NÃO ESTA DISPONÍVEL NESSE CANAL.".to_string())
        }
        LikeLookupResult::CooldownActive { remaining_seconds } => LikeReply::Text(format!(
            "aguarde {} segundos antes de tentar novamente.",
            remaining_seconds
        )),
        LikeLookupResult::InvalidInput { .. } => LikeReply::Text("id inválido".to_string()),
        LikeLookupResult::Success(success) => LikeReply::Embed(EmbedReply {
            title: "VorteX Likes".to_string(),
            description: with_invite(success_description(success), invite_url),
            color: COLOR_SUCCESS,
            tip: None,
            branded: true,
            footer_note: None,
        }),
        LikeLookupResult::AlreadyMaxedToday { .. } => LikeReply::Embed(EmbedReply {
            title: "VorteX Likes".to_string(),
            description: with_invite(
                "\n┌ERRO\n└─Este usuário já recebeu o máximo de likes hoje.\n".to_string(),
                invite_url,
            ),
            color: COLOR_ERROR,
            tip: None,
            branded: true,
            footer_note: None,
        }),
        LikeLookupResult::PlayerNotFound { uid } => LikeReply::Embed(EmbedReply {
            title: "❌ Usuário não encontrado".to_string(),
            description: format!("O ID {} NÃO EXISTE OU ESTÁ INACESSÍVEL.", uid),
            color: COLOR_ERROR,
            tip: Some((
                "Tip".to_string(),
                "TENHA CERTEZA DE:\n- O ID ESTÁ CORRETO\n- O JOGADOR NÃO ESTÁ PRIVADO".to_string(),
            )),
            branded: false,
            footer_note: None,
        }),
        LikeLookupResult::RateLimited => LikeReply::Embed(EmbedReply {
            title: "⚠️ API Rate Limit Reached".to_string(),
            description: "You have reached the maximum number of requests allowed by the API."
                .to_string(),
            color: COLOR_WARNING,
            tip: Some((
                "Tip".to_string(),
                "- Wait a few minutes before trying again\n\
                 - Consider upgrading your API plan if this happens often\n\
                 - Avoid sending too many requests in a short time"
                    .to_string(),
            )),
            branded: false,
            footer_note: None,
        }),
        // Transport or parse failure with no HTTP status to report
        LikeLookupResult::UpstreamError { status_code: None } => error_embed(
            "⚡ Critical Error",
            "An unexpected error occurred. Please try again later.",
        ),
        LikeLookupResult::UpstreamError { .. } => LikeReply::Embed(EmbedReply {
            title: "⚠️ Service Unavailable".to_string(),
            description: "The Free Fire API is not responding at the moment.".to_string(),
            color: COLOR_UNAVAILABLE,
            tip: Some(("Solution".to_string(), "Try again in a few minutes.".to_string())),
            branded: false,
            footer_note: None,
        }),
        LikeLookupResult::Timeout => error_embed("Timeout", "The server took too long to respond."),
    }
}

fn success_description(success: &LikeSuccess) -> String {
    format!(
        "\n\
        ┌  SUCESSO\n\
        ├─ USUÁRIO: {}\n\
        ├─ UID: {}\n\
        ├─ SERVIDOR: {}\n\
        ├─ NÍVEL: {}\n\
        ├─ EXP: {}\n\
        └─ RESULTADO:\n\
        \u{20}  ├─ ADICIONADO: +{}\n\
        \u{20}  ├─ ANTES: {}\n\
        \u{20}  └─ DEPOIS: {}\n",
        success.nickname,
        success.uid,
        success.region,
        success.level,
        success.exp,
        success.sent_count,
        success.likes_before,
        success.likes_after,
    )
}

fn with_invite(description: String, invite_url: Option<&str>) -> String {
    match invite_url {
        Some(url) => format!("{}\n🔗 ENTRE : {}", description, url),
        None => description,
    }
}

/// Footer text with the local time of the configured offset
pub fn footer_line(text: &str, utc_offset_hours: i32, now: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(utc_offset_hours * 3600) {
        Some(offset) => format!("{} • {}", text, now.with_timezone(&offset).format("%H:%M")),
        None => text.to_string(),
    }
}

/// Reply for the admin toggle
pub fn toggle_message(channel_mention: &str, added: bool) -> String {
    if added {
        format!(
            "✅ Channel {} is now **allowed** for /like commands. \
            The command will **only** work in specified channels if any are set.",
            channel_mention
        )
    } else {
        format!(
            "✅ Channel {} has been **removed** from allowed channels for /like commands. \
            The command is now **disallowed** there.",
            channel_mention
        )
    }
}
