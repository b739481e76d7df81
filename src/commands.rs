use crate::{handler::Handler, validate::AllowList};
use std::sync::Arc;
use teloxide::{prelude::*, utils::command::BotCommands};

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Start the bot.
    Start,
    /// Display this text.
    #[command(aliases = ["h", "?"])]
    Help,
}

/// Static greeting listing the supported sites.
#[must_use]
pub fn greeting(allow_list: &AllowList) -> String {
    let sites = allow_list
        .domains()
        .iter()
        .map(|d| format!("• {d}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Hello! Send me a link to a video from one of these sites and I'll download it:\n{sites}"
    )
}

/// Handle a command from the user.
///
/// # Errors
///
/// Returns a Teloxide error if the message fails to send.
pub async fn answer(
    bot: Bot,
    msg: Message,
    cmd: Command,
    handler: Arc<Handler>,
) -> ResponseResult<()> {
    let text = match cmd {
        Command::Start => greeting(handler.allow_list()),
        Command::Help => format!(
            "{}\n\n{}",
            greeting(handler.allow_list()),
            Command::descriptions()
        ),
    };
    bot.send_message(msg.chat.id, text).await?;

    Ok(())
}
