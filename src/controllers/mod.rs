//! # Controladores
//! src/controllers/mod.rs
//!
//! Controladores de ejemplo que publican sus rutas como descriptores
//! (`registry::HandlerDescriptor`) y rutas sueltas registradas directo en el
//! router (`builtin`).
//!
//! - `/greeting?name=` - saludo con contador (`greeting`)
//! - `/saludo`, `/otra` - páginas HTML fijas (`hello`)
//! - `/hello`, `/api/echo`, `/api/time` - rutas básicas (`builtin`)

pub mod builtin;
pub mod greeting;
pub mod hello;

use crate::registry::{HandlerDescriptor, RouteSource};

pub use greeting::GreetingController;
pub use hello::HelloController;

/// Descriptores de todos los controladores incluidos
pub fn discover() -> Vec<HandlerDescriptor> {
    let greeting = GreetingController::new();
    let sources: [&dyn RouteSource; 2] = [&greeting, &HelloController];
    sources.iter().flat_map(|source| source.routes()).collect()
}
