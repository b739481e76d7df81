use dotenv::dotenv;
use std::sync::Arc;
use teloxide::{dptree, net::default_reqwest_settings, prelude::*};
use tg_video_dl::{
    commands::{Command, answer},
    config::Config,
    download::Downloader,
    extractor::Extractor,
    gate::ConcurrencyGate,
    handler::Handler,
    telemetry::setup_logger,
    ytdlp::YtDlp,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenv().ok();
    color_eyre::install()?;
    if let Err(err) = setup_logger() {
        eprintln!("failed to set up logging: {err}");
    }

    let config = Config::from_env()?;
    info!(?config, "configuration loaded");

    let client = default_reqwest_settings()
        .connect_timeout(config.transport.connect_timeout)
        .timeout(config.transport.request_timeout())
        .build()?;
    let bot = Bot::with_client(config.bot_token.clone(), client);

    let extractor: Arc<dyn Extractor> = Arc::new(
        YtDlp::new(config.ytdlp.binary.clone())
            .with_cookies(config.ytdlp.cookies_path.clone())
            .with_extra_args(config.ytdlp.extra_args.clone()),
    );
    let downloader = Downloader::new(extractor, config.ytdlp.extract_options())
        .with_scratch_root(config.scratch_dir.clone());
    let handler = Arc::new(Handler::new(
        config.allow_list.clone(),
        ConcurrencyGate::new(config.max_concurrent_downloads),
        downloader,
    ));

    info!(
        max_concurrent_downloads = config.max_concurrent_downloads,
        allow_list = %config.allow_list,
        "bot starting"
    );

    let schema = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(answer),
        )
        .branch(
            dptree::filter_map(|msg: Message| msg.text().map(ToOwned::to_owned))
                .endpoint(on_text),
        );

    Dispatcher::builder(bot, schema)
        .dependencies(dptree::deps![handler])
        .default_handler(|update| async move {
            warn!(update_id = ?update.id, "unhandled update");
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Run each download on its own task so the dispatcher keeps serving other updates.
async fn on_text(
    bot: Bot,
    msg: Message,
    text: String,
    handler: Arc<Handler>,
) -> ResponseResult<()> {
    let chat = msg.chat.id;
    tokio::spawn(async move {
        let outcome = handler.handle(&bot, chat, &text).await;
        info!(chat = %chat, ?outcome, "message handled");
    });
    Ok(())
}
