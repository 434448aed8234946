//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Códigos de estado que conoce el servidor. Los más comunes tienen su
//! propia variante y su reason phrase; cualquier otro código se representa
//! con `StatusCode::Other` y se serializa con la frase genérica `Status`.

/// Códigos de estado HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 200 OK - La petición fue exitosa
    Ok,

    /// 201 Created - Recurso creado
    Created,

    /// 204 No Content - Petición exitosa sin contenido en el body
    NoContent,

    /// 400 Bad Request - Request malformado (ej: Content-Length inválido)
    BadRequest,

    /// 401 Unauthorized
    Unauthorized,

    /// 403 Forbidden - Intento de path traversal en archivos estáticos
    Forbidden,

    /// 404 Not Found - Ruta o archivo no encontrado
    NotFound,

    /// 405 Method Not Allowed
    MethodNotAllowed,

    /// 500 Internal Server Error - El handler falló
    InternalServerError,

    /// 503 Service Unavailable - Pool saturado con la política de rechazo
    ServiceUnavailable,

    /// Cualquier otro código numérico
    Other(u16),
}

impl StatusCode {
    /// Construye el código a partir de su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use microserver::http::StatusCode;
    /// assert_eq!(StatusCode::from_u16(404), StatusCode::NotFound);
    /// assert_eq!(StatusCode::from_u16(418), StatusCode::Other(418));
    /// ```
    pub fn from_u16(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            201 => StatusCode::Created,
            204 => StatusCode::NoContent,
            400 => StatusCode::BadRequest,
            401 => StatusCode::Unauthorized,
            403 => StatusCode::Forbidden,
            404 => StatusCode::NotFound,
            405 => StatusCode::MethodNotAllowed,
            500 => StatusCode::InternalServerError,
            503 => StatusCode::ServiceUnavailable,
            other => StatusCode::Other(other),
        }
    }

    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use microserver::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
            StatusCode::ServiceUnavailable => 503,
            StatusCode::Other(code) => *code,
        }
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// Los códigos sin entrada en la tabla reciben `Status`.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
            StatusCode::Other(code) => match StatusCode::from_u16(*code) {
                StatusCode::Other(_) => "Status",
                known => known.reason_phrase(),
            },
        }
    }

    /// Verifica si el código indica error del servidor (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode::from_u16(code)
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
