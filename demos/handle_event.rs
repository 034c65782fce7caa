use openhab_alexa::{Bridge, HubClientBuilder, HubConfig, MessageLogMode};
use std::env;
use std::io::{self, Read};

/// Reads an Alexa event as JSON from stdin (or the file given as first
/// argument) and prints the reply. Hub settings come from the
/// `hostname`/`port`/`user`/`password` environment variables.
#[tokio::main]
async fn main() -> openhab_alexa::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let log = args.iter().any(|a| a == "--log");
    let input = match args.iter().skip(1).find(|a| !a.starts_with("--")) {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut builder = HubClientBuilder::from_config(HubConfig::from_env()?);
    if log {
        let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = format!("logs/hub_{ts}.ndjson");
        std::fs::create_dir_all("logs").ok();
        eprintln!("Logging hub traffic to {path}");
        builder = builder.message_log(MessageLogMode::Full, path);
    }

    let bridge = Bridge::new(builder.build()?);
    let event = serde_json::from_str(&input)?;
    let reply = bridge.handle_json(event).await;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}
