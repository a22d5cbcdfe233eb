use tracing::{error, info};

use picvault::{Config, ImageService, LocalImageStore};

fn main() {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = picvault::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        picvault::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    info!("picvault - personal image hosting");

    let store = match LocalImageStore::from_config(&config) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open image store: {e}");
            std::process::exit(1);
        }
    };

    let service = ImageService::from_config(store, &config);
    info!(
        "Storage at {} ({} images, {:?} tenancy)",
        config.storage.path,
        service.store().len(),
        service.store().tenancy()
    );
    if service.store().tenancy() == picvault::TenancyMode::Single {
        service.usage("");
    }
}
