use log::{error, info};
use std::path::Path;
use std::sync::Arc;

use pird::{EventCallback, GpioController, PirOptions, SensorDriver, SensorEvent};

#[cfg(feature = "hardware-gpio")]
use pird::LibgpiodController;
#[cfg(not(feature = "hardware-gpio"))]
use pird::MockGpio;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PIR_CONFIG").ok())
        .unwrap_or_else(|| "config.json".to_string());
    let options = if Path::new(&config_path).exists() {
        PirOptions::load_from_file(&config_path)
            .unwrap_or_else(|e| panic!("Failed to load config: {e}"))
    } else {
        info!("{config_path} not found, using defaults");
        PirOptions::default()
    };

    let gpio: Arc<dyn GpioController> = {
        #[cfg(feature = "hardware-gpio")]
        {
            Arc::new(LibgpiodController::new())
        }
        #[cfg(not(feature = "hardware-gpio"))]
        {
            Arc::new(MockGpio::new().with_chip(0, "pinctrl-mock"))
        }
    };

    let callback: EventCallback = Arc::new(|event: SensorEvent| {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => error!("Failed to encode event: {e}"),
        }
    });

    let driver = SensorDriver::new(options, gpio, callback);
    driver.start();

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    driver.stop();

    Ok(())
}
