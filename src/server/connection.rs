//! # Manejo de Conexiones
//! src/server/connection.rs
//!
//! Una conexión = un request = una respuesta. El job que envuelve la
//! conexión la cierra siempre al terminar, pase lo que pase.

use crate::http::{Body, ParseError, Request, Response, StatusCode};
use crate::router::Router;
use crate::server::pool::Job;
use log::{debug, log, warn, Level};
use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tiempo máximo que se espera el request de una conexión rechazada
const REJECT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Cierra el socket al salir de scope
struct CloseOnDrop(TcpStream);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        // El peer puede haber cerrado primero
        let _ = self.0.shutdown(Shutdown::Both);
    }
}

/// Job del pool que atiende una conexión
pub struct ConnectionJob {
    stream: TcpStream,
    router: Arc<Router>,
    read_timeout: Duration,
}

impl ConnectionJob {
    pub fn new(stream: TcpStream, router: Arc<Router>, read_timeout: Duration) -> Self {
        Self {
            stream,
            router,
            read_timeout,
        }
    }
}

impl Job for ConnectionJob {
    fn run(self: Box<Self>) {
        let ConnectionJob {
            stream,
            router,
            read_timeout,
        } = *self;

        let connection = CloseOnDrop(stream);
        handle_connection(&connection.0, &router, read_timeout);
    }

    /// Responde 503 sin pasar por el router
    fn reject(self: Box<Self>) {
        let connection = CloseOnDrop(self.stream);

        // Consumir el request para que el cierre no provoque un RST
        let _ = Request::parse_stream(&connection.0, REJECT_READ_TIMEOUT);

        let mut writer: &TcpStream = &connection.0;
        let mut response = Response::new(&mut writer);
        if let Err(e) = response.send_error(StatusCode::ServiceUnavailable, "Service Unavailable") {
            debug!("Failed to send 503: {}", e);
        }
    }
}

/// Atiende un request completo sobre `stream`
///
/// - Sin request (timeout, cierre del peer o request line inutilizable): se
///   descarta la conexión sin responder
/// - `Content-Length` inválido: 400
/// - Cualquier otro error de lectura: se descarta
/// - Si el handler no envió nada: `None` → 204, `Some(body)` → 200 con el body
pub fn handle_connection(stream: &TcpStream, router: &Router, read_timeout: Duration) {
    let start = Instant::now();
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let mut writer = stream;

    let request = match Request::parse_stream(stream, read_timeout) {
        Ok(Some(request)) => request,
        Ok(None) => {
            debug!("{}: no request received, closing", peer);
            return;
        }
        Err(ParseError::InvalidContentLength(value)) => {
            warn!("{}: invalid Content-Length {:?}", peer, value);
            let mut response = Response::new(&mut writer);
            if let Err(e) = response.send_error(StatusCode::BadRequest, "Bad Request") {
                debug!("{}: failed to send 400: {}", peer, e);
            }
            return;
        }
        Err(ParseError::Io(e)) => {
            warn!("{}: failed to read request: {}", peer, e);
            return;
        }
    };

    let mut response = Response::new(&mut writer);
    let body = router.handle(&request, &mut response);

    if !response.is_sent() {
        if let Err(e) = finish(&mut response, body) {
            warn!("{}: failed to write response: {}", peer, e);
        }
    }

    log!(
        access_level(response.status()),
        "{} {} {} -> {} ({:.2}ms)",
        peer,
        request.method(),
        request.target(),
        response.status(),
        start.elapsed().as_secs_f64() * 1000.0
    );
}

/// Nivel del log de acceso: los 5xx se destacan como warning
fn access_level(status: StatusCode) -> Level {
    if status.is_server_error() {
        Level::Warn
    } else {
        Level::Info
    }
}

/// Envía lo que devolvió el handler
fn finish(response: &mut Response<'_>, body: Option<Body>) -> io::Result<()> {
    match body {
        Some(body) => response.send(body),
        None => {
            response.set_status(StatusCode::NoContent);
            response.send_bytes(&[])
        }
    }
}
