//! # Apagado por Señal
//! src/server/shutdown.rs
//!
//! Conecta una fuente de señales (Ctrl-C en el binario, un canal cualquiera
//! en los tests) con `ServerController::stop`.

use crate::server::controller::ServerController;
use crossbeam::channel::Receiver;
use log::{debug, info};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Lanza un thread que detiene `server` al recibir la primera señal
///
/// Si todos los emisores se cierran sin enviar nada, el thread termina sin
/// tocar el servidor.
pub fn stop_on_signal(server: Arc<ServerController>, signals: Receiver<()>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("http-shutdown".to_string())
        .spawn(move || match signals.recv() {
            Ok(()) => {
                info!("Shutdown signal received");
                server.stop();
            }
            Err(_) => debug!("Signal source closed without a shutdown request"),
        })
}
