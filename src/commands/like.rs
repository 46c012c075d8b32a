use poise::serenity_prelude as serenity;
use tracing::debug;

use crate::config::PresentationSettings;
use crate::messages::{footer_line, render_like_result, LikeReply};
use crate::models::LikeInvocation;
use crate::{Context, Error};

/// Sends likes to a Free Fire player
#[poise::command(prefix_command, slash_command)]
pub async fn like(
    ctx: Context<'_>,
    #[description = "Player UID (numbers only, minimum 6 characters)"] uid: String,
) -> Result<(), Error> {
    // The upstream call can take longer than the interaction window
    if let poise::Context::Application(_) = ctx {
        ctx.defer_ephemeral().await?;
    } else if let Err(e) = ctx.channel_id().broadcast_typing(ctx.http()).await {
        debug!("Could not broadcast typing in {}: {}", ctx.channel_id(), e);
    }

    let invocation = LikeInvocation {
        user_id: ctx.author().id.get(),
        guild_id: ctx.guild_id().map(|g| g.get()),
        channel_id: ctx.channel_id().get(),
        raw_uid: uid,
    };

    let data = ctx.data();
    let result = data.like_service.handle_like_command(&invocation).await;

    let presentation = &data.settings.presentation;
    let reply = render_like_result(&result, presentation.invite_url.as_deref());
    ctx.send(build_reply(reply, presentation)).await?;

    Ok(())
}

fn build_reply(reply: LikeReply, presentation: &PresentationSettings) -> poise::CreateReply {
    match reply {
        LikeReply::Text(text) => poise::CreateReply::default().content(text).ephemeral(true),
        LikeReply::Embed(rendered) => {
            let mut embed = serenity::CreateEmbed::new()
                .title(rendered.title)
                .description(rendered.description)
                .color(rendered.color)
                .timestamp(serenity::Timestamp::now());

            if let Some((name, value)) = rendered.tip {
                embed = embed.field(name, value, false);
            }

            let mut reply = poise::CreateReply::default().ephemeral(true);

            if rendered.branded {
                embed = embed.footer(serenity::CreateEmbedFooter::new(footer_line(
                    &presentation.footer_text,
                    presentation.footer_utc_offset_hours,
                    chrono::Utc::now(),
                )));

                if let Some(url) = &presentation.invite_url {
                    let button = serenity::CreateButton::new_link(url).label("Entrar");
                    reply = reply.components(vec![serenity::CreateActionRow::Buttons(vec![button])]);
                }
            } else if let Some(note) = rendered.footer_note {
                embed = embed.footer(serenity::CreateEmbedFooter::new(note));
            }

            reply.embed(embed)
        }
    }
}
