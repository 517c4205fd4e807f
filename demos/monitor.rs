use std::env;
use std::time::Duration;

use coolmaster_net::CoolMasterClient;

#[tokio::main]
async fn main() -> coolmaster_net::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let addr = args
        .get(1)
        .expect("usage: monitor <host:port> <name=uid>...");

    let mut builder = CoolMasterClient::builder(addr).on_event(|event| {
        println!("{event:?}");
    });
    for pair in &args[2..] {
        let (name, uid) = pair.split_once('=').expect("zone must be <name>=<uid>");
        builder = builder.zone(name, uid);
    }
    let client = builder.build()?;

    println!("Connecting to {addr}...");
    loop {
        tokio::time::sleep(Duration::from_secs(30)).await;
        for zone in client.zones().await? {
            println!(
                "[{}] {} | set {} | temp {} | fan {} | mode {}{}",
                zone.name,
                if zone.on { "ON" } else { "OFF" },
                zone.setpoint_raw,
                zone.temperature_raw,
                zone.fan_speed,
                zone.system_mode,
                if zone.demand { " | DEMAND" } else { "" },
            );
        }
    }
}
