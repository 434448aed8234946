//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servidor HTTP con soporte completo
//! para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./microserver --port 8080 \
//!   --static-dir ./public \
//!   --workers 8 \
//!   --queue-capacity 200 \
//!   --backpressure reject
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 STATIC_DIR=./public ./microserver
//! ```

use crate::error::ServerError;
use crate::server::{Backpressure, ServerConfig};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

/// Configuración del servidor HTTP/1.1
#[derive(Debug, Clone, Parser)]
#[command(name = "microserver")]
#[command(about = "Servidor HTTP/1.1 minimalista con router y archivos estáticos")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor (0 = elegido por el sistema)
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Directorio de archivos estáticos
    #[arg(long = "static-dir", default_value = "./public", env = "STATIC_DIR")]
    pub static_dir: PathBuf,

    /// Timeout de lectura por conexión en milisegundos
    #[arg(long = "read-timeout-ms", default_value = "5000", env = "READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    // === Workers ===

    /// Workers permanentes (por defecto max(2, 2 × CPUs))
    #[arg(short, long, env = "WORKERS")]
    pub workers: Option<usize>,

    /// Tope de workers (por defecto 2 × workers)
    #[arg(long = "max-workers", env = "MAX_WORKERS")]
    pub max_workers: Option<usize>,

    /// Capacidad de la cola de conexiones pendientes
    #[arg(long = "queue-capacity", default_value = "200", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Segundos ociosos tras los que termina un worker extra
    #[arg(long = "keep-alive-secs", default_value = "60", env = "KEEP_ALIVE_SECS")]
    pub keep_alive_secs: u64,

    // === Backpressure ===

    /// Qué hacer con el pool saturado
    #[arg(long, value_enum, default_value = "caller-runs", env = "BACKPRESSURE")]
    pub backpressure: Backpressure,

    // === Shutdown ===

    /// Tiempo para que el pool termine lo pendiente, en milisegundos
    #[arg(long = "shutdown-grace-ms", default_value = "5000", env = "SHUTDOWN_GRACE_MS")]
    pub shutdown_grace_ms: u64,

    /// Espera máxima por el thread de accept, en milisegundos
    #[arg(long = "accept-join-ms", default_value = "2000", env = "ACCEPT_JOIN_MS")]
    pub accept_join_ms: u64,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use microserver::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Workers core efectivos
    pub fn core_workers(&self) -> usize {
        self.workers.unwrap_or_else(ServerConfig::default_core_workers)
    }

    /// Tope de workers efectivo
    pub fn max_workers(&self) -> usize {
        self.max_workers.unwrap_or_else(|| self.core_workers() * 2)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ServerError> {
        let invalid = |message: &str| Err(ServerError::InvalidConfig(message.to_string()));

        if self.core_workers() == 0 {
            return invalid("workers must be >= 1");
        }
        if self.max_workers() < self.core_workers() {
            return invalid("max workers must be >= workers");
        }
        if self.queue_capacity == 0 {
            return invalid("queue capacity must be >= 1");
        }
        if self.read_timeout_ms == 0 {
            return invalid("read timeout must be > 0");
        }
        if self.keep_alive_secs == 0 {
            return invalid("keep-alive must be > 0");
        }
        if self.accept_join_ms == 0 {
            return invalid("accept join timeout must be > 0");
        }

        Ok(())
    }

    /// Configuración del núcleo del servidor
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            core_workers: self.core_workers(),
            max_workers: self.max_workers(),
            queue_capacity: self.queue_capacity,
            keep_alive: Duration::from_secs(self.keep_alive_secs),
            backpressure: self.backpressure,
            accept_join_timeout: Duration::from_millis(self.accept_join_ms),
            shutdown_grace: Duration::from_millis(self.shutdown_grace_ms),
        }
    }

    /// Registra un resumen de la configuración
    pub fn log_summary(&self) {
        info!("Address:        {}", self.address());
        info!("Static dir:     {}", self.static_dir.display());
        info!("Read timeout:   {} ms", self.read_timeout_ms);
        info!(
            "Workers:        {} core / {} max, queue {}",
            self.core_workers(),
            self.max_workers(),
            self.queue_capacity
        );
        info!("Keep-alive:     {} s", self.keep_alive_secs);
        info!("Backpressure:   {:?}", self.backpressure);
        info!(
            "Shutdown:       grace {} ms, accept join {} ms",
            self.shutdown_grace_ms, self.accept_join_ms
        );
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            static_dir: PathBuf::from("./public"),
            read_timeout_ms: 5_000,
            workers: None,
            max_workers: None,
            queue_capacity: 200,
            keep_alive_secs: 60,
            backpressure: Backpressure::CallerRuns,
            shutdown_grace_ms: 5_000,
            accept_join_ms: 2_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.static_dir, PathBuf::from("./public"));
        assert_eq!(config.queue_capacity, 200);
        assert_eq!(config.backpressure, Backpressure::CallerRuns);
    }

    #[test]
    fn test_address() {
        let config = Config::default();
        assert_eq!(config.address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_address_custom() {
        let mut config = Config::default();
        config.host = "0.0.0.0".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_validate_success() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    // ==================== Parsing ====================

    #[test]
    fn test_parse_flags() {
        let config = Config::try_parse_from([
            "microserver",
            "--port",
            "9090",
            "--static-dir",
            "/srv/www",
            "--workers",
            "3",
            "--backpressure",
            "reject",
        ])
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.static_dir, PathBuf::from("/srv/www"));
        assert_eq!(config.core_workers(), 3);
        assert_eq!(config.max_workers(), 6);
        assert_eq!(config.backpressure, Backpressure::Reject);
    }

    #[test]
    fn test_parse_rejects_unknown_backpressure() {
        let result = Config::try_parse_from(["microserver", "--backpressure", "drop"]);
        assert!(result.is_err());
    }

    // ==================== Workers ====================

    #[test]
    fn test_default_workers_follow_cpus() {
        let config = Config::default();
        assert_eq!(config.core_workers(), ServerConfig::default_core_workers());
        assert_eq!(config.max_workers(), config.core_workers() * 2);
    }

    #[test]
    fn test_validate_zero_workers() {
        let mut config = Config::default();
        config.workers = Some(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("workers must be >= 1"));
    }

    #[test]
    fn test_validate_max_below_core() {
        let mut config = Config::default();
        config.workers = Some(4);
        config.max_workers = Some(2);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max workers"));
    }

    #[test]
    fn test_validate_zero_queue() {
        let mut config = Config::default();
        config.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    // ==================== Timeouts ====================

    #[test]
    fn test_validate_zero_read_timeout() {
        let mut config = Config::default();
        config.read_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("read timeout"));
    }

    #[test]
    fn test_zero_grace_is_allowed() {
        let mut config = Config::default();
        config.shutdown_grace_ms = 0;
        assert!(config.validate().is_ok());
    }

    // ==================== Server config ====================

    #[test]
    fn test_server_config_conversion() {
        let mut config = Config::default();
        config.host = "0.0.0.0".to_string();
        config.workers = Some(2);
        config.read_timeout_ms = 250;
        config.backpressure = Backpressure::Reject;

        let server = config.server_config();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.core_workers, 2);
        assert_eq!(server.max_workers, 4);
        assert_eq!(server.read_timeout, Duration::from_millis(250));
        assert_eq!(server.keep_alive, Duration::from_secs(60));
        assert_eq!(server.backpressure, Backpressure::Reject);
        assert_eq!(server.accept_join_timeout, Duration::from_secs(2));
        assert_eq!(server.shutdown_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_log_summary() {
        // No debe hacer panic sin logger inicializado
        Config::default().log_summary();
    }
}
