//! # microserver
//! src/lib.rs
//!
//! Servidor HTTP/1.1 minimalista implementado directamente sobre sockets
//! TCP: parsing de requests byte a byte, respuestas de un solo envío, router
//! con fallback de archivos estáticos y un pool acotado de workers con
//! backpressure explícito.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: Parsing de requests y construcción de responses
//! - `router`: Enrutamiento por (método, path) y archivos estáticos
//! - `server`: Thread de accept, pool de workers, ciclo de vida y apagado por señal
//! - `registry`: Montaje de rutas descritas por descriptores
//! - `controllers`: Controladores y rutas de ejemplo
//! - `config`: Configuración por CLI y variables de entorno
//! - `error`: Errores de handlers y del servidor
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use microserver::router::Router;
//! use microserver::server::{ServerConfig, ServerController};
//!
//! let mut router = Router::new();
//! router.get("/hello", |req, _res| {
//!     Ok(Some(format!("Hello {}", req.query_param_or("name", "world")).into()))
//! });
//! router.static_files("./public");
//!
//! let server = ServerController::new(router, ServerConfig::default());
//! let addr = server.start(8080).expect("Error al iniciar servidor");
//! println!("Escuchando en {}", addr);
//! server.wait();
//! ```

pub mod config;
pub mod controllers;
pub mod error;
pub mod http;
pub mod registry;
pub mod router;
pub mod server;
