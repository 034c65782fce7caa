use openhab_alexa::{Hub, HubClient, discovery};
use std::env;

#[tokio::main]
async fn main() -> openhab_alexa::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let host = args.get(1).expect("usage: discover <host> [--port <port>]");
    let port: u16 = args
        .iter()
        .position(|a| a == "--port")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);

    let client = HubClient::builder(host).port(port).build()?;
    println!("Fetching items from {}...", client.base_url());

    let items = client.items().await?;
    let devices = discovery::discover(&items)?;

    for device in &devices {
        println!(
            "[{}] {} ({}) -> {:?}{}",
            device.model_name,
            device.friendly_name,
            device.appliance_id,
            device.actions,
            match device.additional_appliance_details.temperature_format {
                Some(format) => format!(" | {format:?}"),
                None => String::new(),
            },
        );
    }
    println!("{} items, {} appliances", items.len(), devices.len());
    Ok(())
}
