//! # Archivos Estáticos
//! src/router/static_files.rs
//!
//! Fallback del router cuando ninguna ruta registrada coincide: resuelve el
//! path del request dentro de un directorio raíz y envía el archivo.
//!
//! ## Protección contra path traversal
//!
//! El path se decodifica, se une a la raíz canónica y se canonicaliza. Si el
//! archivo no existe, `canonicalize` falla y se usa la normalización léxica
//! de `path-clean`. Cualquier resultado que no sea la raíz o algo debajo de
//! ella se rechaza con 403, sin importar cómo venga codificado el `..`.

use crate::http::url::decode_path;
use crate::http::{Response, StatusCode};
use log::{debug, warn};
use path_clean::PathClean;
use std::fs;
use std::path::{Path, PathBuf};

/// Resultado de resolver un path contra la raíz
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Archivo existente dentro de la raíz
    File(PathBuf),

    /// El path escapa de la raíz
    Forbidden,

    /// No existe o es un directorio
    NotFound,
}

/// Directorio raíz de archivos estáticos
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directorio raíz configurado (sin canonicalizar)
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resuelve un path de URL (ya normalizado) a un archivo
    ///
    /// `/` se interpreta como `/index.html`.
    pub fn resolve(&self, request_path: &str) -> Resolution {
        let mut decoded = decode_path(request_path);
        if decoded == "/" {
            decoded = "/index.html".to_string();
        }
        let relative = decoded.trim_start_matches('/');

        let root = match self.root.canonicalize() {
            Ok(root) => root,
            Err(e) => {
                warn!("Static root {} is not usable: {}", self.root.display(), e);
                return Resolution::NotFound;
            }
        };

        let candidate = root.join(relative);
        let resolved = candidate.canonicalize().unwrap_or_else(|_| candidate.clean());

        if !resolved.starts_with(&root) {
            warn!("Rejected path traversal attempt: {:?}", request_path);
            return Resolution::Forbidden;
        }

        if !resolved.is_file() {
            return Resolution::NotFound;
        }

        Resolution::File(resolved)
    }

    /// Resuelve y envía el archivo (o el error correspondiente)
    pub fn serve(&self, request_path: &str, response: &mut Response<'_>) {
        let result = match self.resolve(request_path) {
            Resolution::Forbidden => response.send_error(StatusCode::Forbidden, "Forbidden"),
            Resolution::NotFound => response.send_error(StatusCode::NotFound, "Not Found"),
            Resolution::File(path) => match fs::read(&path) {
                Ok(data) => {
                    debug!("Serving {} ({} bytes)", path.display(), data.len());
                    response.set_content_type(content_type(&path));
                    response.send_bytes(&data)
                }
                Err(e) => {
                    warn!("Failed to read {}: {}", path.display(), e);
                    response.send_error(StatusCode::InternalServerError, "Internal Server Error")
                }
            },
        };

        if let Err(e) = result {
            warn!("Failed to write static response for {}: {}", request_path, e);
        }
    }
}

/// Content-Type según la extensión del archivo
pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Crea `<tmp>/public` con algunos archivos y un `secret` al lado
    fn fixture() -> (TempDir, StaticFiles) {
        let dir = TempDir::new().unwrap();
        let public = dir.path().join("public");
        fs::create_dir_all(public.join("css")).unwrap();
        fs::write(public.join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(public.join("css").join("site.css"), "body{}").unwrap();
        fs::write(public.join("hola mundo.txt"), "hola").unwrap();
        fs::write(dir.path().join("secret"), "top secret").unwrap();

        let files = StaticFiles::new(public);
        (dir, files)
    }

    fn render(files: &StaticFiles, path: &str) -> String {
        let mut out = Vec::new();
        let mut response = Response::new(&mut out);
        files.serve(path, &mut response);
        drop(response);
        String::from_utf8_lossy(&out).into_owned()
    }

    // ==================== Resolution ====================

    #[test]
    fn test_root_maps_to_index() {
        let (_dir, files) = fixture();
        match files.resolve("/") {
            Resolution::File(path) => assert!(path.ends_with("index.html")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nested_file() {
        let (_dir, files) = fixture();
        assert!(matches!(files.resolve("/css/site.css"), Resolution::File(_)));
    }

    #[test]
    fn test_encoded_space_in_name() {
        let (_dir, files) = fixture();
        assert!(matches!(files.resolve("/hola%20mundo.txt"), Resolution::File(_)));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let (_dir, files) = fixture();
        assert_eq!(files.resolve("/missing.png"), Resolution::NotFound);
    }

    #[test]
    fn test_directory_is_not_found() {
        let (_dir, files) = fixture();
        assert_eq!(files.resolve("/css"), Resolution::NotFound);
    }

    #[test]
    fn test_inner_dotdot_that_stays_inside_is_allowed() {
        let (_dir, files) = fixture();
        assert!(matches!(files.resolve("/css/../index.html"), Resolution::File(_)));
    }

    // ==================== Traversal ====================

    #[test]
    fn test_plain_dotdot_is_forbidden() {
        let (_dir, files) = fixture();
        assert_eq!(files.resolve("/../secret"), Resolution::Forbidden);
    }

    #[test]
    fn test_encoded_dotdot_is_forbidden() {
        let (_dir, files) = fixture();
        assert_eq!(files.resolve("/%2e%2e/secret"), Resolution::Forbidden);
        assert_eq!(files.resolve("/%2E%2E%2Fsecret"), Resolution::Forbidden);
        assert_eq!(files.resolve("/..%2fsecret"), Resolution::Forbidden);
    }

    #[test]
    fn test_encoded_slashes_escape_is_forbidden() {
        let (_dir, files) = fixture();
        assert_eq!(
            files.resolve("/secret%2f..%2f..%2fetc%2fpasswd"),
            Resolution::Forbidden
        );
    }

    #[test]
    fn test_nonexistent_target_outside_root_is_forbidden() {
        let (_dir, files) = fixture();
        assert_eq!(files.resolve("/../../nope/nothing"), Resolution::Forbidden);
    }

    #[test]
    fn test_double_leading_slash_does_not_escape() {
        let (_dir, files) = fixture();
        assert_eq!(files.resolve("//etc/passwd"), Resolution::NotFound);
    }

    #[test]
    fn test_sibling_with_common_prefix_is_forbidden() {
        let (dir, files) = fixture();
        let sibling = dir.path().join("public2");
        fs::create_dir_all(&sibling).unwrap();
        fs::write(sibling.join("x.txt"), "x").unwrap();

        assert_eq!(files.resolve("/../public2/x.txt"), Resolution::Forbidden);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escaping_root_is_forbidden() {
        let (dir, files) = fixture();
        std::os::unix::fs::symlink(dir.path().join("secret"), files.root().join("link")).unwrap();

        assert_eq!(files.resolve("/link"), Resolution::Forbidden);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let files = StaticFiles::new("/definitely/not/here/public");
        assert_eq!(files.resolve("/index.html"), Resolution::NotFound);
    }

    // ==================== Serving ====================

    #[test]
    fn test_serve_html() {
        let (_dir, files) = fixture();
        let text = render(&files, "/");

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(text.ends_with("<h1>home</h1>"));
    }

    #[test]
    fn test_serve_forbidden() {
        let (_dir, files) = fixture();
        let text = render(&files, "/../secret");

        assert!(text.starts_with("HTTP/1.1 403 Forbidden\r\n"));
        assert!(!text.contains("top secret"));
    }

    #[test]
    fn test_serve_not_found() {
        let (_dir, files) = fixture();
        let text = render(&files, "/missing.png");
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    // ==================== Content types ====================

    #[test]
    fn test_content_types() {
        assert_eq!(content_type(Path::new("a.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("a.HTM")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("a.css")), "text/css; charset=utf-8");
        assert_eq!(content_type(Path::new("a.js")), "application/javascript; charset=utf-8");
        assert_eq!(content_type(Path::new("a.png")), "image/png");
        assert_eq!(content_type(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(content_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(content_type(Path::new("a.gif")), "image/gif");
        assert_eq!(content_type(Path::new("a.tar.gz")), "application/octet-stream");
        assert_eq!(content_type(Path::new("README")), "application/octet-stream");
    }
}
