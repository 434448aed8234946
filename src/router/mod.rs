//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Este módulo implementa el router que mapea `(método, path)` a handlers.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router → Handler ──────────→ Response
//!                  ↘ StaticFiles (fallback) ↗
//! ```
//!
//! - Los paths se normalizan igual al registrar y al buscar: vacío → `/`,
//!   siempre empiezan con `/`, sin `/` final (salvo la raíz).
//! - La búsqueda es exacta: sin comodines ni parámetros de path.
//! - Si ningún handler coincide se intenta servir un archivo estático; sin
//!   directorio estático configurado se responde 404.
//!
//! La tabla se arma una sola vez con `&mut Router` antes de arrancar el
//! servidor y después se comparte como `Arc<Router>` de solo lectura.

pub mod static_files;

use crate::error::HandlerError;
use crate::http::{Body, Request, Response, StatusCode};
use log::{debug, error, warn};
use static_files::StaticFiles;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

/// Resultado de un handler
///
/// - `Ok(Some(body))` - body a enviar si el handler no envió nada
/// - `Ok(None)` - el handler ya envió, o se responde 204 sin contenido
/// - `Err(_)` - 500 si la respuesta todavía no se envió
pub type HandlerResult = Result<Option<Body>, HandlerError>;

/// Tipo de función handler
///
/// Un handler recibe el Request y la Response; puede enviar directamente
/// o devolver un body.
pub type Handler = Box<dyn Fn(&Request, &mut Response<'_>) -> HandlerResult + Send + Sync>;

/// Router que mapea (método, path) a handlers
pub struct Router {
    /// (MÉTODO, path normalizado) → handler
    routes: HashMap<(String, String), Handler>,

    /// Fallback de archivos estáticos
    static_files: Option<StaticFiles>,
}

impl Router {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            static_files: None,
        }
    }

    /// Registra una ruta con su handler
    ///
    /// Registrar dos veces el mismo (método, path) reemplaza el handler.
    ///
    /// # Ejemplo
    /// ```
    /// use microserver::router::Router;
    ///
    /// let mut router = Router::new();
    /// router.register("get", "/hello/", |req, _res| {
    ///     Ok(Some(format!("Hello {}", req.query_param_or("name", "world")).into()))
    /// });
    /// assert!(router.has_route("GET", "/hello"));
    /// ```
    pub fn register<F>(&mut self, method: &str, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let key = (method.to_uppercase(), normalize(path));
        debug!("Registered route: {} {}", key.0, key.1);
        self.routes.insert(key, Box::new(handler));
    }

    /// Registra un handler para GET
    pub fn get<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register("GET", path, handler);
    }

    /// Registra un handler para POST
    pub fn post<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register("POST", path, handler);
    }

    /// Registra un handler para PUT
    pub fn put<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register("PUT", path, handler);
    }

    /// Registra un handler para DELETE
    pub fn delete<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register("DELETE", path, handler);
    }

    /// Configura el directorio de archivos estáticos
    pub fn static_files(&mut self, directory: impl Into<PathBuf>) {
        self.static_files = Some(StaticFiles::new(directory));
    }

    /// Indica si existe un handler para (método, path)
    pub fn has_route(&self, method: &str, path: &str) -> bool {
        self.routes
            .contains_key(&(method.to_uppercase(), normalize(path)))
    }

    /// Número de rutas registradas
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Despacha un request
    ///
    /// Retorna el body producido por el handler (si lo hubo) para que el
    /// llamador lo envíe cuando la respuesta siga sin enviarse.
    pub fn handle(&self, request: &Request, response: &mut Response<'_>) -> Option<Body> {
        let method = request.method().to_uppercase();
        let path = normalize(request.path());

        if let Some(handler) = self.routes.get(&(method, path.clone())) {
            return Self::invoke(handler, request, response);
        }

        match &self.static_files {
            Some(files) => files.serve(&path, response),
            None => send_or_log(response, StatusCode::NotFound, "Not Found"),
        }

        None
    }

    /// Ejecuta el handler convirtiendo errores y panics en 500
    fn invoke(handler: &Handler, request: &Request, response: &mut Response<'_>) -> Option<Body> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(request, &mut *response)));

        let failure = match outcome {
            Ok(Ok(body)) => return body,
            Ok(Err(e)) => e.to_string(),
            Err(_) => "handler panicked".to_string(),
        };

        error!("Handler for {} {} failed: {}", request.method(), request.path(), failure);

        if !response.is_sent() {
            send_or_log(response, StatusCode::InternalServerError, "Internal Server Error");
        }

        None
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Normaliza un path de ruta
///
/// # Ejemplo
/// ```
/// use microserver::router::normalize;
///
/// assert_eq!(normalize(""), "/");
/// assert_eq!(normalize("a/"), "/a");
/// assert_eq!(normalize("/"), "/");
/// ```
pub fn normalize(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    normalized
}

fn send_or_log(response: &mut Response<'_>, status: StatusCode, message: &str) {
    if let Err(e) = response.send_error(status, message) {
        warn!("Failed to send {}: {}", status, e);
    }
}
