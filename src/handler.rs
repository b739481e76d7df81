use crate::{
    download::{Download, Downloader},
    error::{Error, ErrorKind, INVALID_URL_MESSAGE, Result},
    gate::{ConcurrencyGate, Permit},
    transport::ChatTransport,
    validate::{AllowList, Validate},
};
use std::time::Duration;
use teloxide::types::{ChatAction, ChatId};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

pub const ACKNOWLEDGEMENT: &str = "Downloading video...";

/// Telegram clears a chat action after about five seconds.
const ACTIVITY_INTERVAL: Duration = Duration::from_secs(4);

/// Terminal state of one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rejected,
    Delivered,
    Failed(ErrorKind),
}

/// Drives one message from validation to delivery.
#[derive(Clone)]
pub struct Handler {
    allow_list: AllowList,
    gate: ConcurrencyGate,
    downloader: Downloader,
}

impl Handler {
    #[must_use]
    pub const fn new(
        allow_list: AllowList,
        gate: ConcurrencyGate,
        downloader: Downloader,
    ) -> Self {
        Self {
            allow_list,
            gate,
            downloader,
        }
    }

    #[inline]
    #[must_use]
    pub const fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    #[inline]
    #[must_use]
    pub const fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Reply for messages without a supported link.
    #[must_use]
    pub fn guidance(&self) -> String {
        format!(
            "{INVALID_URL_MESSAGE} Please send a link from one of: {}.",
            self.allow_list
        )
    }

    /// Handle one text message. Never fails; every error ends in a reply.
    pub async fn handle<T>(&self, transport: &T, chat_id: ChatId, text: &str) -> Outcome
    where
        T: ChatTransport + ?Sized,
    {
        let url = match self.allow_list.validate(text) {
            Ok(url) => url,
            Err(err) => {
                report(&err, chat_id, text);
                notify(transport.reply_text(chat_id, &self.guidance()).await, "guidance");
                return Outcome::Rejected;
            }
        };

        info!(chat = %chat_id, url = %url, "handling url");
        notify(transport.reply_text(chat_id, ACKNOWLEDGEMENT).await, "acknowledgement");

        match self.download_and_deliver(transport, chat_id, &url).await {
            Ok(()) => {
                info!(chat = %chat_id, url = %url, "video delivered");
                Outcome::Delivered
            }
            Err(err) => {
                report(&err, chat_id, &url);
                notify(
                    transport.reply_text(chat_id, &err.user_message()).await,
                    "error reply",
                );
                Outcome::Failed(err.kind())
            }
        }
    }

    async fn download_and_deliver<T>(
        &self,
        transport: &T,
        chat_id: ChatId,
        url: &str,
    ) -> Result<()>
    where
        T: ChatTransport + ?Sized,
    {
        let download = {
            let permit = self.gate.acquire().await?;
            debug!(available = self.gate.available(), "download slot acquired");
            self.download_with_activity(transport, chat_id, url, &permit)
                .await?
        };

        let sent = transport.reply_video(chat_id, download.file()).await;
        let scratch = download.scratch_dir().to_path_buf();
        if let Err(err) = download.cleanup() {
            warn!(dir = %scratch.display(), error = %err, "failed to remove scratch workspace");
        }
        sent
    }

    /// Await the download, refreshing the chat action until it resolves.
    async fn download_with_activity<T>(
        &self,
        transport: &T,
        chat_id: ChatId,
        url: &str,
        permit: &Permit,
    ) -> Result<Download>
    where
        T: ChatTransport + ?Sized,
    {
        let download = self.downloader.fetch_video(url, permit);
        tokio::pin!(download);

        let mut ticker = interval(ACTIVITY_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                result = &mut download => return result,
                _ = ticker.tick() => {
                    let sent = transport.reply_activity(chat_id, ChatAction::UploadVideo).await;
                    if let Err(err) = sent {
                        debug!(error = %err, "failed to send chat action");
                    }
                }
            }
        }
    }
}

fn notify(result: Result<()>, what: &str) {
    if let Err(err) = result {
        warn!(error = %err, "failed to send {what}");
    }
}

/// Log a failure at the severity its class calls for.
fn report(err: &Error, chat_id: ChatId, url: &str) {
    match err.kind() {
        ErrorKind::InvalidUrl => info!(chat = %chat_id, "no supported link in message"),
        ErrorKind::UnsupportedOrRestrictedMedia => {
            warn!(chat = %chat_id, url = %url, error = %err, "extractor rejected url");
        }
        ErrorKind::ProducedFileMissing => {
            error!(chat = %chat_id, url = %url, error = %err, "extractor produced no file");
        }
        ErrorKind::Unexpected => {
            let category = err.category();
            error!(chat = %chat_id, url = %url, error = %err, category, "download failed");
        }
    }
}
