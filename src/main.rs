//! # microserver - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor HTTP/1.1.
//!
//! Lee la configuración (CLI + variables de entorno), monta las rutas
//! básicas y las de los controladores, y bloquea hasta que el servidor se
//! detenga. Ctrl-C (o SIGTERM) dispara el apagado ordenado.

use anyhow::Context;
use log::{error, info};
use microserver::config::Config;
use microserver::controllers::{self, builtin};
use microserver::registry;
use microserver::router::Router;
use microserver::server::{stop_on_signal, ServerController};
use std::fs;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = Config::new();
    config.validate()?;
    config.log_summary();

    if !config.static_dir.exists() {
        fs::create_dir_all(&config.static_dir).with_context(|| {
            format!("Failed to create static dir {}", config.static_dir.display())
        })?;
    }

    let mut router = Router::new();
    builtin::mount_builtin(&mut router);
    let mounted = registry::mount(&mut router, controllers::discover());
    router.static_files(config.static_dir.clone());
    info!("Total routes registered: {} ({} from controllers)", router.route_count(), mounted);

    let server = Arc::new(ServerController::new(router, config.server_config()));
    server
        .start(config.port)
        .with_context(|| format!("Failed to start server on {}", config.address()))?;

    let (signal_tx, signal_rx) = crossbeam::channel::bounded(1);
    ctrlc::set_handler(move || {
        // Una segunda señal con la primera pendiente se descarta
        let _ = signal_tx.try_send(());
    })
    .context("Failed to install signal handler")?;
    let watcher = stop_on_signal(Arc::clone(&server), signal_rx)
        .context("Failed to spawn shutdown thread")?;

    server.wait();
    if watcher.join().is_err() {
        error!("Shutdown thread panicked");
    }
    Ok(())
}
