//! # Registro de Rutas
//! src/registry.rs
//!
//! Convierte descriptores de handlers (método, path, parámetros y una
//! función) en rutas del router. Quien produce los descriptores (por
//! ejemplo, los controladores de `controllers`) no necesita conocer
//! `Request` ni `Response`.
//!
//! ## Binding de parámetros
//!
//! Cada `ParamSpec` se resuelve en orden de declaración contra el query
//! string:
//!
//! | Situación                          | Valor pasado           |
//! |------------------------------------|------------------------|
//! | Presente                           | `Some(valor)`          |
//! | Ausente, default no vacío          | `Some(default)`        |
//! | Ausente, opcional sin default      | `None`                 |
//! | Ausente, obligatorio sin default   | 400 Bad Request        |

use crate::error::HandlerError;
use crate::http::{Body, Request, Response, StatusCode};
use crate::router::{HandlerResult, Router};
use log::{info, warn};
use std::fmt;
use std::sync::Arc;

/// Content-Type de las respuestas producidas por descriptores
pub const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Función invocable de un descriptor
pub type HandlerFn = Arc<dyn Fn(&[Option<String>]) -> Result<String, HandlerError> + Send + Sync>;

/// Declaración de un query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub default_value: String,
    pub required: bool,
}

impl ParamSpec {
    /// Parámetro obligatorio sin default
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default_value: String::new(),
            required: true,
        }
    }

    /// Parámetro opcional sin default
    pub fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default_value: String::new(),
            required: false,
        }
    }

    /// Valor usado cuando el parámetro no viene en el request
    pub fn with_default(mut self, value: &str) -> Self {
        self.default_value = value.to_string();
        self
    }

    /// Resuelve el valor del parámetro para un request
    fn bind(&self, request: &Request) -> Result<Option<String>, HandlerError> {
        if let Some(value) = request.query_param(&self.name) {
            return Ok(Some(value.to_string()));
        }
        if !self.default_value.is_empty() {
            return Ok(Some(self.default_value.clone()));
        }
        if self.required {
            return Err(HandlerError::MissingParameter(self.name.clone()));
        }
        Ok(None)
    }
}

/// Descripción de una ruta lista para montar
#[derive(Clone)]
pub struct HandlerDescriptor {
    pub method: String,
    pub path: String,
    pub params: Vec<ParamSpec>,
    pub function: HandlerFn,
}

impl HandlerDescriptor {
    pub fn new<F>(method: &str, path: &str, function: F) -> Self
    where
        F: Fn(&[Option<String>]) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        Self {
            method: method.to_uppercase(),
            path: path.to_string(),
            params: Vec::new(),
            function: Arc::new(function),
        }
    }

    /// Agrega un parámetro (se pasan a la función en este orden)
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Resuelve todos los parámetros y llama a la función
    fn invoke(&self, request: &Request, response: &mut Response<'_>) -> HandlerResult {
        let mut args = Vec::with_capacity(self.params.len());
        for spec in &self.params {
            match spec.bind(request) {
                Ok(value) => args.push(value),
                Err(e) => {
                    warn!("{} {}: {}", self.method, self.path, e);
                    response.send_error(StatusCode::BadRequest, &e.to_string())?;
                    return Ok(None);
                }
            }
        }

        match (self.function)(&args) {
            Ok(text) => {
                response.set_content_type(TEXT_HTML);
                Ok(Some(Body::Text(text)))
            }
            Err(e) => {
                warn!("{} {} failed: {}", self.method, self.path, e);
                response.send_error(StatusCode::InternalServerError, "Unexpected Error")?;
                Ok(None)
            }
        }
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Fuente de descriptores (un controlador, una lista fija, etc.)
pub trait RouteSource {
    fn routes(&self) -> Vec<HandlerDescriptor>;
}

/// Monta los descriptores en el router
///
/// Retorna la cantidad de rutas montadas.
pub fn mount<I>(router: &mut Router, descriptors: I) -> usize
where
    I: IntoIterator<Item = HandlerDescriptor>,
{
    let mut mounted = 0;

    for descriptor in descriptors {
        let method = descriptor.method.clone();
        let path = descriptor.path.clone();

        router.register(&method, &path, move |req, res| descriptor.invoke(req, res));
        info!("Mounted route {} {}", method, path);
        mounted += 1;
    }

    mounted
}

/// Monta las rutas de varias fuentes
pub fn mount_sources(router: &mut Router, sources: &[&dyn RouteSource]) -> usize {
    sources
        .iter()
        .map(|source| mount(router, source.routes()))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(router: &Router, request: &Request) -> String {
        let mut out = Vec::new();
        let mut response = Response::new(&mut out);
        if let Some(body) = router.handle(request, &mut response) {
            response.send(body).unwrap();
        }
        drop(response);
        String::from_utf8_lossy(&out).into_owned()
    }

    fn greet() -> HandlerDescriptor {
        HandlerDescriptor::new("get", "/greet", |args| {
            let name = args[0].as_deref().unwrap_or("nobody");
            let title = args[1].as_deref().unwrap_or("");
            Ok(format!("<p>{}{}</p>", title, name))
        })
        .param(ParamSpec::required("name"))
        .param(ParamSpec::optional("title"))
    }

    // ==================== ParamSpec ====================

    #[test]
    fn test_param_builders() {
        let spec = ParamSpec::optional("name").with_default("World");
        assert_eq!(spec.name, "name");
        assert_eq!(spec.default_value, "World");
        assert!(!spec.required);

        assert!(ParamSpec::required("id").required);
    }

    #[test]
    fn test_bind_order_of_precedence() {
        let request = Request::new("GET", "/x?a=1");

        assert_eq!(ParamSpec::required("a").bind(&request).unwrap(), Some("1".into()));
        assert_eq!(
            ParamSpec::required("b").with_default("d").bind(&request).unwrap(),
            Some("d".into())
        );
        assert_eq!(ParamSpec::optional("b").bind(&request).unwrap(), None);
        assert!(matches!(
            ParamSpec::required("b").bind(&request),
            Err(HandlerError::MissingParameter(name)) if name == "b"
        ));
    }

    #[test]
    fn test_present_empty_value_wins_over_default() {
        let request = Request::new("GET", "/x?a=");
        assert_eq!(
            ParamSpec::optional("a").with_default("d").bind(&request).unwrap(),
            Some(String::new())
        );
    }

    // ==================== Mounting ====================

    #[test]
    fn test_mount_counts_routes() {
        let mut router = Router::new();
        let count = mount(
            &mut router,
            vec![greet(), HandlerDescriptor::new("POST", "/other", |_| Ok(String::new()))],
        );

        assert_eq!(count, 2);
        assert!(router.has_route("GET", "/greet"));
        assert!(router.has_route("POST", "/other"));
    }

    #[test]
    fn test_params_bound_in_order() {
        let mut router = Router::new();
        mount(&mut router, vec![greet()]);

        let text = render(&router, &Request::new("GET", "/greet?title=Dr.%20&name=Ada"));

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(text.ends_with("<p>Dr. Ada</p>"));
    }

    #[test]
    fn test_missing_required_param_is_400() {
        let mut router = Router::new();
        mount(&mut router, vec![greet()]);

        let text = render(&router, &Request::new("GET", "/greet"));

        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(text.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(text.ends_with("Missing required query parameter: name"));
    }

    #[test]
    fn test_function_error_is_500() {
        let mut router = Router::new();
        mount(
            &mut router,
            vec![HandlerDescriptor::new("GET", "/fail", |_| Err(HandlerError::failed("boom")))],
        );

        let text = render(&router, &Request::new("GET", "/fail"));

        assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(text.ends_with("Unexpected Error"));
        assert!(!text.contains("boom"));
    }

    #[test]
    fn test_mount_sources() {
        struct Fixed;

        impl RouteSource for Fixed {
            fn routes(&self) -> Vec<HandlerDescriptor> {
                vec![
                    HandlerDescriptor::new("GET", "/a", |_| Ok("a".into())),
                    HandlerDescriptor::new("GET", "/b", |_| Ok("b".into())),
                ]
            }
        }

        let mut router = Router::new();
        assert_eq!(mount_sources(&mut router, &[&Fixed, &Fixed]), 4);
        assert_eq!(router.route_count(), 2);
    }

    #[test]
    fn test_descriptor_debug_omits_function() {
        let text = format!("{:?}", greet());
        assert!(text.contains("/greet"));
        assert!(text.contains("HandlerDescriptor"));
    }
}
