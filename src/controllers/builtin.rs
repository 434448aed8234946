//! # Rutas Básicas
//! src/controllers/builtin.rs
//!
//! Rutas registradas directamente en el router:
//! - `GET /hello?name=` → `Hello <name>` (default `world`)
//! - `POST /api/echo` → devuelve el body tal cual
//! - `GET /api/time` → `{"time": "..."}` con la hora local en español

use crate::http::{Body, Request, Response};
use crate::router::{HandlerResult, Router};
use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use serde_json::json;

const DIAS: [&str; 7] = [
    "lunes",
    "martes",
    "miércoles",
    "jueves",
    "viernes",
    "sábado",
    "domingo",
];

const MESES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Registra `/hello`, `/api/echo` y `/api/time`
pub fn mount_builtin(router: &mut Router) {
    router.get("/hello", hello_handler);
    router.post("/api/echo", echo_handler);
    router.get("/api/time", time_handler);
}

/// Handler para /hello?name=N
pub fn hello_handler(req: &Request, _res: &mut Response<'_>) -> HandlerResult {
    Ok(Some(format!("Hello {}", req.query_param_or("name", "world")).into()))
}

/// Handler para /api/echo
///
/// El body vuelve como texto (UTF-8 con reemplazo de bytes inválidos).
pub fn echo_handler(req: &Request, _res: &mut Response<'_>) -> HandlerResult {
    Ok(Some(Body::Text(req.body_string())))
}

/// Handler para /api/time
///
/// # Ejemplo de response
/// ```json
/// {"time": "lunes, 19 de octubre de 2026 14:03:07"}
/// ```
pub fn time_handler(_req: &Request, res: &mut Response<'_>) -> HandlerResult {
    let body = json!({ "time": format_spanish(&Local::now()) });
    res.set_content_type("application/json");
    Ok(Some(Body::Text(body.to_string())))
}

/// `EEEE, d 'de' MMMM 'de' yyyy HH:mm:ss` en español
pub fn format_spanish<Tz: TimeZone>(time: &DateTime<Tz>) -> String {
    format!(
        "{}, {} de {} de {} {:02}:{:02}:{:02}",
        DIAS[time.weekday().num_days_from_monday() as usize],
        time.day(),
        MESES[time.month0() as usize],
        time.year(),
        time.hour(),
        time.minute(),
        time.second()
    )
}
