//! # Módulo HTTP
//!
//! Este módulo implementa el protocolo HTTP/1.1 desde cero, sin usar
//! librerías de alto nivel. Incluye:
//!
//! - Parsing de requests leyendo directamente del socket
//! - Construcción de responses de un solo envío
//! - Manejo de status codes
//! - Decodificación de query parameters y paths
//!
//! ## Subconjunto soportado
//!
//! - Sin chunked transfer encoding: el body se lee solo con `Content-Length`
//! - Sin conexiones persistentes: toda respuesta lleva `Connection: close`
//! - Sin pipelining: un request por conexión

pub mod request;   // Parsing de HTTP requests
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado HTTP
pub mod url;       // Percent-decoding

pub use request::{ParseError, Request};
pub use response::{Body, Response};
pub use status::StatusCode;
