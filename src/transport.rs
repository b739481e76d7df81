use crate::error::Result;
use std::path::Path;
use teloxide::{
    Bot,
    payloads::SendVideoSetters,
    prelude::Requester,
    types::{ChatAction, ChatId, InputFile},
};

/// Outbound operations the conversation handler needs from a chat platform.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    async fn reply_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// Best-effort activity hint such as "uploading video".
    async fn reply_activity(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;

    /// Upload the file at `path` as a video message.
    async fn reply_video(&self, chat_id: ChatId, path: &Path) -> Result<()>;
}

#[async_trait::async_trait]
impl ChatTransport for Bot {
    async fn reply_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.send_message(chat_id, text).await?;
        Ok(())
    }

    async fn reply_activity(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        self.send_chat_action(chat_id, action).await?;
        Ok(())
    }

    async fn reply_video(&self, chat_id: ChatId, path: &Path) -> Result<()> {
        let video = InputFile::file(path);
        self.send_video(chat_id, video)
            .supports_streaming(true)
            .await?;
        Ok(())
    }
}
