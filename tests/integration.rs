use std::time::Duration;

use coolmaster_net::{CoolMasterClient, Event};

/// Run with: cargo test --test integration -- --ignored
/// Requires a CoolMaster NET bridge (or a simulator of one) reachable at
/// $COOLMASTER_ADDR (e.g. 192.168.1.50:10102) with zones L1.100 and L1.102.
#[tokio::test]
#[ignore]
async fn connect_poll_snapshot() {
    let addr = std::env::var("COOLMASTER_ADDR")
        .expect("set COOLMASTER_ADDR, e.g. 192.168.1.50:10102");

    let (tx, mut events) = tokio::sync::mpsc::unbounded_channel();
    let client = CoolMasterClient::builder(&addr)
        .zone("Zone 1", "L1.100")
        .zone("Zone 2", "L1.102")
        .on_event(move |event| {
            let _ = tx.send(event.clone());
        })
        .build()
        .expect("build failed");

    // Wait for the first full poll round-trip to land.
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("no events within 10s")
            .expect("event stream closed");
        println!("{event:?}");
        if matches!(event, Event::ZoneTemperatureChanged { .. }) {
            break;
        }
    }

    let zones = client.zones().await.expect("zones query failed");
    assert!(!zones.is_empty(), "should have at least one zone");
    for zone in &zones {
        println!(
            "[{}] {} | set {} | temp {} | fan {} | mode {} | demand {}",
            zone.name,
            if zone.on { "ON" } else { "OFF" },
            zone.setpoint_raw,
            zone.temperature_raw,
            zone.fan_speed,
            zone.system_mode,
            zone.demand,
        );
    }

    client.shutdown().await.expect("shutdown failed");
}
