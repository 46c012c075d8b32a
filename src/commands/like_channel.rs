use poise::serenity_prelude as serenity;
use tracing::info;

use crate::messages::toggle_message;
use crate::state::ToggleOutcome;
use crate::{Context, Error};

/// Sets the channels where the /like command is allowed.
///
/// Running it again on an allowed channel removes it.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "setlikechannel",
    required_permissions = "ADMINISTRATOR",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn set_like_channel(
    ctx: Context<'_>,
    #[description = "The channel to allow/disallow the /like command in."]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command can only be used in a server.")?;

    let allow_list = &ctx.data().allow_list;
    let outcome = allow_list
        .toggle_channel(guild_id.get(), channel.id.get())
        .await?;

    info!(
        "{} toggled like channel {} in guild {}: {:?}",
        ctx.author().name,
        channel.id,
        guild_id,
        outcome
    );

    let mut msg = toggle_message(
        &format!("<#{}>", channel.id),
        outcome == ToggleOutcome::Added,
    );

    let remaining = allow_list.channels_for(guild_id.get()).await;
    if remaining.is_empty() {
        msg.push_str("\n\nNo channels are restricted, /like works everywhere in this server.");
    } else {
        let mentions: Vec<String> = remaining.iter().map(|id| format!("<#{}>", id)).collect();
        msg.push_str(&format!("\n\nAllowed channels: {}", mentions.join(", ")));
    }

    ctx.send(poise::CreateReply::default().content(msg).ephemeral(true))
        .await?;
    Ok(())
}
