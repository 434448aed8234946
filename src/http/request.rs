//! # Parsing de Requests HTTP/1.1
//! src/http/request.rs
//!
//! Parser HTTP implementado desde cero que lee directamente del socket,
//! línea por línea y luego el body byte a byte.
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /api/echo?debug=1 HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 7\r\n
//! \r\n
//! {"a":1}
//! ```
//!
//! ## Resultados posibles
//!
//! - `Ok(Some(request))` - Request parseado
//! - `Ok(None)` - No hay nada que procesar: el cliente cerró, mandó una
//!   línea vacía, la request line no sirve, una línea supera `MAX_LINE`
//!   o expiró el read timeout
//! - `Err(ParseError::InvalidContentLength)` - Request malformado (400)
//! - `Err(ParseError::Io)` - Cualquier otro error de lectura

use super::url::decode_component;
use log::debug;
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read};
use std::net::TcpStream;
use std::time::Duration;
use thiserror::Error;

/// Longitud máxima de la request line y de cada header, con el CRLF incluido
pub const MAX_LINE: usize = 8192;

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Error)]
pub enum ParseError {
    /// El header Content-Length no es un entero
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// Error de I/O distinto a un timeout
    #[error("I/O error reading request: {0}")]
    Io(#[from] io::Error),
}

/// Representa un request HTTP parseado
///
/// Es inmutable una vez construido: solo expone getters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Método HTTP tal como llegó (GET, POST, ...)
    method: String,

    /// Path sin query string (ej: "/hello")
    path: String,

    /// Target original de la request line (ej: "/hello?name=Ada")
    target: String,

    /// Query parameters decodificados (ej: {"name": "Ada"})
    query_params: HashMap<String, String>,

    /// Headers con nombre en minúsculas
    headers: HashMap<String, String>,

    /// Body declarado por Content-Length (puede estar vacío)
    body: Vec<u8>,
}

impl Request {
    /// Construye un request a mano, sin headers ni body
    ///
    /// Útil para probar handlers sin abrir un socket.
    ///
    /// # Ejemplo
    /// ```
    /// use microserver::http::Request;
    ///
    /// let request = Request::new("GET", "/hello?name=Ada");
    /// assert_eq!(request.path(), "/hello");
    /// assert_eq!(request.query_param("name"), Some("Ada"));
    /// ```
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query_params) = Self::split_target(target);
        Self {
            method: method.to_string(),
            path,
            target: target.to_string(),
            query_params,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header (el nombre se normaliza a minúsculas)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.trim().to_lowercase(), value.trim().to_string());
        self
    }

    /// Reemplaza el body
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Parsea un request leyendo de un socket con read timeout
    ///
    /// Configura el timeout de lectura del socket antes de empezar.
    pub fn parse_stream(stream: &TcpStream, timeout: Duration) -> Result<Option<Self>, ParseError> {
        stream.set_read_timeout(Some(timeout))?;
        Self::parse(stream)
    }

    /// Parsea un request desde cualquier fuente de bytes
    ///
    /// # Ejemplo
    /// ```
    /// use microserver::http::Request;
    ///
    /// let raw: &[u8] = b"GET /hello?name=Ada HTTP/1.1\r\nHost: x\r\n\r\n";
    /// let request = Request::parse(raw).unwrap().unwrap();
    ///
    /// assert_eq!(request.method(), "GET");
    /// assert_eq!(request.header("host"), Some("x"));
    /// ```
    pub fn parse<R: Read>(reader: R) -> Result<Option<Self>, ParseError> {
        let mut reader = BufReader::new(reader);

        match Self::parse_buffered(&mut reader) {
            Err(ParseError::Io(e)) if is_timeout(&e) => {
                debug!("Read timed out while parsing request");
                Ok(None)
            }
            Err(ParseError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
                debug!("Dropping request: {}", e);
                Ok(None)
            }
            other => other,
        }
    }

    fn parse_buffered<R: BufRead>(reader: &mut R) -> Result<Option<Self>, ParseError> {
        // 1. Request line
        let request_line = match read_line(reader)? {
            Some(line) if !line.is_empty() => line,
            _ => return Ok(None),
        };

        let mut parts = request_line.split(' ').filter(|part| !part.is_empty());
        let (method, target) = match (parts.next(), parts.next()) {
            (Some(method), Some(target)) => (method.to_string(), target.to_string()),
            _ => {
                debug!("Unusable request line: {:?}", request_line);
                return Ok(None);
            }
        };

        let (path, query_params) = Self::split_target(&target);

        // 2. Headers hasta la línea vacía
        let headers = Self::parse_headers(reader)?;

        // 3. Body (solo si hay Content-Length)
        let body = match headers.get("content-length") {
            Some(raw) => Self::read_body(reader, raw)?,
            None => Vec::new(),
        };

        Ok(Some(Request {
            method,
            path,
            target,
            query_params,
            headers,
            body,
        }))
    }

    /// Separa el path de la query string
    ///
    /// Ejemplo: "/hello?name=Ada&x"
    /// Retorna: ("/hello", {"name": "Ada", "x": ""})
    fn split_target(target: &str) -> (String, HashMap<String, String>) {
        match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Self::parse_query_string(query)),
            None => (target.to_string(), HashMap::new()),
        }
    }

    /// Parsea una query string; ante claves repetidas gana la última
    fn parse_query_string(query: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();

        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }

            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.insert(decode_component(key), decode_component(value));
        }

        params
    }

    /// Lee headers hasta la línea vacía (o EOF)
    ///
    /// Las líneas sin ':' se ignoran.
    fn parse_headers<R: BufRead>(reader: &mut R) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        while let Some(line) = read_line(reader)? {
            if line.is_empty() {
                break;
            }

            match line.find(':') {
                Some(colon_pos) if colon_pos > 0 => {
                    let name = line[..colon_pos].trim().to_lowercase();
                    let value = line[colon_pos + 1..].trim().to_string();
                    headers.insert(name, value);
                }
                _ => debug!("Ignoring header line without name: {:?}", line),
            }
        }

        Ok(headers)
    }

    /// Lee el body declarado por Content-Length
    ///
    /// Si el stream termina antes, el body queda truncado sin error.
    fn read_body<R: BufRead>(reader: &mut R, raw_length: &str) -> Result<Vec<u8>, ParseError> {
        let length: i64 = raw_length
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidContentLength(raw_length.to_string()))?;

        let mut body = Vec::new();
        if length <= 0 {
            return Ok(body);
        }

        reader.by_ref().take(length as u64).read_to_end(&mut body)?;

        if (body.len() as i64) < length {
            debug!("Body truncated: declared {} bytes, got {}", length, body.len());
        }

        Ok(body)
    }

    // === Getters ===

    /// Método HTTP del request
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path sin query string
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Target completo tal como llegó en la request line
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Todos los query parameters
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Obtiene un query parameter específico
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Obtiene un query parameter o el valor por defecto
    ///
    /// # Ejemplo
    /// ```
    /// use microserver::http::Request;
    ///
    /// let request = Request::new("GET", "/hello");
    /// assert_eq!(request.query_param_or("name", "world"), "world");
    /// ```
    pub fn query_param_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.query_param(name).unwrap_or(default)
    }

    /// Todos los headers (nombres en minúsculas)
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header; el nombre no distingue mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    /// Body crudo
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body como texto (UTF-8 con reemplazo de bytes inválidos)
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Lee una línea terminada en LF, quitando el CRLF final
///
/// Retorna `None` en EOF y `InvalidData` si la línea no cabe en `MAX_LINE`.
fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE as u64)
        .read_until(b'\n', &mut buf)?;

    if read == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if read == MAX_LINE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line longer than {} bytes", MAX_LINE),
        ));
    }

    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
