//! # Respuestas HTTP
//! src/http/response.rs
//!
//! `Response` acumula status y headers y se serializa **una sola vez**
//! sobre la salida de la conexión. Después del primer envío exitoso,
//! cualquier llamada posterior (set_status, set_header, send, send_error)
//! no tiene efecto.
//!
//! ## Formato generado
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/plain; charset=utf-8\r\n
//! Content-Length: 9\r\n
//! Connection: close\r\n
//! \r\n
//! Hello Ada
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use microserver::http::Response;
//!
//! let mut out = Vec::new();
//! let mut response = Response::new(&mut out);
//! response.send_text("Hello").unwrap();
//! response.send_text("ignored").unwrap();
//! drop(response);
//!
//! let text = String::from_utf8(out).unwrap();
//! assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
//! assert!(text.ends_with("\r\n\r\nHello"));
//! ```

use super::StatusCode;
use std::io::{self, Write};

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Cuerpo producido por un handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Texto; Content-Type por defecto `text/plain; charset=utf-8`
    Text(String),

    /// Binario; Content-Type por defecto `application/octet-stream`
    Bytes(Vec<u8>),
}

impl Body {
    pub fn len(&self) -> usize {
        match self {
            Body::Text(text) => text.len(),
            Body::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes)
    }
}

/// Respuesta HTTP de un solo envío
pub struct Response<'a> {
    /// Salida de la conexión
    out: &'a mut dyn Write,

    /// Código de estado (200 por defecto)
    status: StatusCode,

    /// Headers en orden de inserción
    headers: Vec<(String, String)>,

    /// true después del primer envío exitoso
    sent: bool,
}

impl<'a> Response<'a> {
    /// Crea una respuesta 200 sin headers que escribirá en `out`
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self {
            out,
            status: StatusCode::Ok,
            headers: Vec::new(),
            sent: false,
        }
    }

    /// Cambia el código de estado (no-op si ya se envió)
    pub fn set_status(&mut self, status: StatusCode) {
        if self.sent {
            return;
        }
        self.status = StatusCode::from_u16(status.as_u16());
    }

    /// Agrega o reemplaza un header (no-op si ya se envió)
    ///
    /// La comparación de nombres no distingue mayúsculas.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if self.sent {
            return;
        }

        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Atajo para `Content-Type`
    pub fn set_content_type(&mut self, content_type: &str) {
        self.set_header("Content-Type", content_type);
    }

    /// Obtiene el valor de un header ya configurado
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Código de estado actual
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Indica si la respuesta ya fue enviada
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Envía un body de texto
    pub fn send_text(&mut self, text: &str) -> io::Result<()> {
        self.send_with_default(text.as_bytes(), TEXT_PLAIN)
    }

    /// Envía un body binario
    pub fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.send_with_default(bytes, OCTET_STREAM)
    }

    /// Envía un `Body` eligiendo el Content-Type por defecto según su tipo
    pub fn send(&mut self, body: Body) -> io::Result<()> {
        match body {
            Body::Text(text) => self.send_text(&text),
            Body::Bytes(bytes) => self.send_bytes(&bytes),
        }
    }

    /// Envía una respuesta de error en texto plano
    ///
    /// Fuerza `Content-Type: text/plain; charset=utf-8`.
    pub fn send_error(&mut self, status: StatusCode, message: &str) -> io::Result<()> {
        if self.sent {
            return Ok(());
        }
        self.status = StatusCode::from_u16(status.as_u16());
        self.set_header("Content-Type", TEXT_PLAIN);
        self.send_text(message)
    }

    fn send_with_default(&mut self, body: &[u8], default_type: &str) -> io::Result<()> {
        if self.sent {
            return Ok(());
        }

        // Un intento fallido también cierra la respuesta: no hay reintento
        self.sent = true;

        let bytes = self.to_bytes(body, default_type);
        self.out.write_all(&bytes)?;
        self.out.flush()
    }

    /// Serializa status line, headers, `Connection: close`, línea vacía y body
    ///
    /// `Content-Type` y `Content-Length` se completan solo en la salida.
    fn to_bytes(&self, body: &[u8], default_type: &str) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {}\r\n", self.status);

        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("Connection") {
                continue;
            }
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        if self.header("Content-Type").is_none() {
            head.push_str(&format!("Content-Type: {}\r\n", default_type));
        }
        if self.header("Content-Length").is_none() {
            head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        head.push_str("Connection: close\r\n\r\n");

        let mut result = Vec::with_capacity(head.len() + body.len());
        result.extend_from_slice(head.as_bytes());
        result.extend_from_slice(body);
        result
    }
}
