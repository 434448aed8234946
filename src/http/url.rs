//! # Decodificación de URLs
//! src/http/url.rs
//!
//! Helpers de percent-decoding usados por el parser (query strings) y por
//! el router (paths de archivos estáticos).

/// Decodifica un componente de query string (`+` se interpreta como espacio)
///
/// Las secuencias `%XX` malformadas se conservan tal cual y los bytes que no
/// forman UTF-8 válido se reemplazan por `U+FFFD`.
///
/// # Ejemplo
/// ```
/// use microserver::http::url::decode_component;
/// assert_eq!(decode_component("Bogot%C3%A1"), "Bogotá");
/// assert_eq!(decode_component("hello+world"), "hello world");
/// ```
pub fn decode_component(s: &str) -> String {
    percent_decode(&s.replace('+', " "))
}

/// Decodifica un path de URL (`+` se mantiene literal)
pub fn decode_path(s: &str) -> String {
    percent_decode(s)
}

fn percent_decode(s: &str) -> String {
    match urlencoding::decode(s) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(s.as_bytes())).into_owned(),
    }
}
