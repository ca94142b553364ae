//! Search the network over SSDP and print every recognized device.
//!
//! This example demonstrates:
//! - Using the built-in SSDP transport on its own
//! - Classifying raw discovery responses into bridge and plug data
//!
//! Run with: cargo run --example discover_devices

use std::sync::Arc;
use std::time::Duration;
use smarthome_manager::{
    DiscoveryConfig, DiscoveryResponse, DiscoveryTransport, SEARCH_ALL, SsdpClient, classify,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Searching for smart-home devices on the network...");

    let mut client = SsdpClient::new(DiscoveryConfig::default());
    client.on_response(Arc::new(|response: &DiscoveryResponse| {
        let classified = classify(response);
        if let Some(bridge) = classified.bridge {
            println!(
                "  Bridge {} at {}",
                bridge.bridge_id.unwrap_or_default(),
                response.remote.address
            );
        }
        if let Some(plug) = classified.plug {
            println!("  Plug at {} ({})", plug.address, plug.setup_location);
        }
    }));
    client.search(SEARCH_ALL)?;

    // Collect responses for 5 seconds
    tokio::time::sleep(Duration::from_secs(5)).await;
    client.stop();

    println!("\nDone!");
    Ok(())
}
