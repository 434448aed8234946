//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto (`controller`)
//! 2. Acepta conexiones en un thread dedicado
//! 3. Reparte cada conexión a un pool acotado de workers (`pool`)
//! 4. Lee el request, lo despacha al router y envía la respuesta (`connection`)
//! 5. Se detiene al recibir una señal de apagado (`shutdown`)
//!
//! Cuando el pool está saturado decide la `SaturationPolicy`: por defecto
//! el propio thread del accept atiende la conexión, lo que frena el ritmo
//! de aceptación hasta que haya lugar.

pub mod connection;
pub mod controller;
pub mod pool;
pub mod shutdown;

// Re-exportar para facilitar el uso
pub use connection::{handle_connection, ConnectionJob};
pub use controller::{ServerConfig, ServerController, ServerState};
pub use shutdown::stop_on_signal;
pub use pool::{Backpressure, CallerRuns, Job, RejectWithUnavailable, SaturationPolicy, WorkerPool};
