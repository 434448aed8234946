//! # HelloController
//! src/controllers/hello.rs

use crate::registry::{HandlerDescriptor, RouteSource};
use log::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct HelloController;

impl RouteSource for HelloController {
    fn routes(&self) -> Vec<HandlerDescriptor> {
        vec![
            HandlerDescriptor::new("GET", "/saludo", |_| {
                debug!("Handling /saludo");
                Ok("<h1>¡Hola desde el controlador!</h1>".to_string())
            }),
            HandlerDescriptor::new("GET", "/otra", |_| Ok("<p>Otra ruta anotada :)</p>".to_string())),
        ]
    }
}
