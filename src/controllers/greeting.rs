//! # GreetingController
//! src/controllers/greeting.rs
//!
//! `GET /greeting?name=Ada` → `Hello, Ada! (id=1)`
//!
//! El id crece con cada llamada y es propio de cada instancia.

use crate::registry::{HandlerDescriptor, ParamSpec, RouteSource};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
pub struct GreetingController {
    counter: Arc<AtomicU64>,
}

impl GreetingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arma el saludo e incrementa el contador
    pub fn greeting(&self, name: &str) -> String {
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("Hello, {}! (id={})", name, id)
    }
}

impl RouteSource for GreetingController {
    fn routes(&self) -> Vec<HandlerDescriptor> {
        let controller = self.clone();

        vec![HandlerDescriptor::new("GET", "/greeting", move |args| {
            let name = args.first().and_then(|arg| arg.as_deref()).unwrap_or("World");
            Ok(controller.greeting(name))
        })
        .param(ParamSpec::optional("name").with_default("World"))]
    }
}
