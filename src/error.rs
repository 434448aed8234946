//! # Errores del servidor
//! src/error.rs
//!
//! Errores que cruzan módulos: los que devuelven los handlers y los del
//! ciclo de vida del servidor. Los errores de parsing viven en
//! `http::request::ParseError`.

use std::io;
use thiserror::Error;

/// Error devuelto por un handler
///
/// El router lo convierte en `500 Internal Server Error` si la respuesta
/// todavía no se envió.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Falta un query parameter obligatorio
    #[error("Missing required query parameter: {0}")]
    MissingParameter(String),

    /// Falla genérica con mensaje
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }
}

/// Errores del ciclo de vida del servidor
#[derive(Debug, Error)]
pub enum ServerError {
    /// `start` llamado cuando el servidor no está detenido
    #[error("Server is already running")]
    AlreadyRunning,

    /// No se pudo abrir el socket de escucha
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Configuración inválida
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
