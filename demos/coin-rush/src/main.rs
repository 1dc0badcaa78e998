use coinrush::prelude::*;

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

const USAGE: &str = "\
usage:
  coin-rush serve [config.json]   run the authority
  coin-rush bot <url> <name>      join as a player that grabs every coin";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    coinrush::logging::init(coinrush::logging::DEFAULT_FILTER);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("serve") => serve(args.get(1).map(String::as_str)).await?,
        Some("bot") => match (args.get(1), args.get(2)) {
            (Some(url), Some(name)) => {
                if let Some(text) = bot(url, name).await? {
                    tracing::info!(%text, "session over");
                }
            }
            _ => eprintln!("{USAGE}"),
        },
        _ => eprintln!("{USAGE}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

async fn serve(config_path: Option<&str>) -> Result<(), CoinrushError> {
    let config = match config_path {
        Some(path) => ServerConfig::from_json_file(path)?,
        None => ServerConfig::default(),
    };
    tracing::info!(
        addr = %config.bind_addr,
        duration_secs = config.session.duration_secs,
        "starting coin-rush server"
    );

    let server = CoinrushServer::builder().config(config).build().await?;
    server.run().await
}

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

/// Plays one session: starts it when hosting (or once hosting is handed
/// over) and requests every coin the moment it spawns. Returns the winner
/// text.
async fn bot(url: &str, name: &str) -> Result<Option<String>, CoinrushError> {
    let mut client = CoinrushClient::connect(url, name, TracingSink).await?;
    play(&mut client).await
}

async fn play<P: PresentationSink>(
    client: &mut CoinrushClient<P>,
) -> Result<Option<String>, CoinrushError> {
    while let Some(event) = client.next_event().await? {
        match event {
            ServerEvent::Welcome { host: true, .. } => client.start_session().await?,
            ServerEvent::HostChanged { player_id } if client.player_id() == Some(player_id) => {
                client.start_session().await?;
            }
            ServerEvent::CollectibleSpawned { entity_id, .. } => {
                client.request_pickup(entity_id).await?;
            }
            ServerEvent::WinnerAnnounced { text, .. } => return Ok(Some(text)),
            _ => {}
        }
    }
    Ok(None)
}
