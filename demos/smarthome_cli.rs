//! CLI application for finding and preparing smart-home controllers.
//!
//! Run with: cargo run --example smarthome_cli -- --help

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use serde_json::Map;
use smarthome_manager::{
    Controller, DeviceDeclaration, DeviceFamily, HueController, HueLightState, ManagerOptions,
    SmartHomeManager,
};

#[derive(Parser)]
#[command(name = "smarthome-cli")]
#[command(about = "Discover smart-home devices and build their controllers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the given device families and wait until all of them are ready
    Discover {
        /// Families to look for (philipsHue, magicHome, wemo)
        #[arg(required = true)]
        families: Vec<String>,

        /// Give up after this many seconds (default: 10)
        #[arg(short, long, default_value = "10")]
        timeout: u64,
    },

    /// Build controllers from a JSON file of `{"type": ..., "options": {...}}` declarations
    Load {
        /// Path to the declarations file
        path: PathBuf,
    },

    /// Print the bridge request that sets a light's state
    HueState {
        /// IP address of the bridge
        #[arg(long)]
        ip: String,

        /// Paired bridge user
        #[arg(long)]
        user: String,

        /// Light number on the bridge
        #[arg(long, default_value = "1")]
        light: u32,

        /// Turn the light off instead of on
        #[arg(long)]
        off: bool,

        /// Brightness (0-254)
        #[arg(long, default_value = "254")]
        bri: u8,

        /// Saturation (0-254)
        #[arg(long, default_value = "254")]
        sat: u8,

        /// Hue (0-65535)
        #[arg(long, default_value = "0")]
        hue: u16,
    },
}

fn print_controllers<'a>(controllers: impl Iterator<Item = (DeviceFamily, &'a Controller)>) {
    for (family, controller) in controllers {
        match controller {
            Controller::BridgeLight(hue) => println!("  {family}: bridge API at {}", hue.endpoint()),
            Controller::MeshLight(light) => println!("  {family}: light at {}", light.addr()),
            Controller::UpnpPlug(plug) => println!("  {family}: plug setup at {}", plug.setup_url()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Discover { families, timeout } => {
            let devices: Vec<DeviceDeclaration> = families
                .iter()
                .map(|family| DeviceDeclaration::new(family, Map::new()))
                .collect();
            let options = ManagerOptions::new()
                .auto_discovery(true)
                .ssdp()
                .on_ready(|snapshot, _| {
                    println!("Discovery finished:");
                    println!("{}", serde_json::to_string_pretty(snapshot).unwrap_or_default());
                });

            let manager = SmartHomeManager::new(devices, options)?;
            println!(
                "Searching for {:?} (timeout: {}s)...",
                manager.requested_families(),
                timeout
            );

            match tokio::time::timeout(Duration::from_secs(timeout), manager.ready()).await {
                Ok(Ok(controllers)) => {
                    println!("\n{} controller(s) ready:", controllers.len());
                    print_controllers(controllers.iter());
                }
                Ok(Err(e)) => eprintln!("Error: {}", e),
                Err(_) => {
                    eprintln!("Timed out, still {}. Found so far:", manager.phase());
                    println!("{}", serde_json::to_string_pretty(manager.snapshot().as_ref())?);
                }
            }
        }

        Commands::Load { path } => {
            let devices: Vec<DeviceDeclaration> =
                serde_json::from_str(&std::fs::read_to_string(&path)?)?;
            let manager = SmartHomeManager::new(devices, ManagerOptions::new())?;

            match manager.ready().await {
                Ok(controllers) => {
                    println!("{} controller(s) ready:", controllers.len());
                    print_controllers(controllers.iter());
                }
                Err(e) => eprintln!("Error: {}", e),
            }
        }

        Commands::HueState {
            ip,
            user,
            light,
            off,
            bri,
            sat,
            hue,
        } => {
            let mut controller = HueController::new(&smarthome_manager::BridgeLightOptions {
                ip: Some(ip),
                user_name: None,
            })?;
            controller.set_user_name(&user);

            let state = HueLightState {
                on: !off,
                sat,
                bri,
                hue,
            };
            if let Some(url) = controller.light_state_url(light) {
                println!("PUT {}", url);
                println!("{}", serde_json::to_string_pretty(&controller.light_state_body(&state))?);
            }
        }
    }

    Ok(())
}
