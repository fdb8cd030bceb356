use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

const STYLE_CSS: &str = include_str!("../assets/style.css");
const SCRIPT_JS: &str = include_str!("../assets/script.js");

/// Stylesheet and script served next to the documentation page.
///
/// Built-in copies are compiled in; a configured directory takes precedence
/// for any file it contains.
#[derive(Debug, Clone, Default)]
pub struct StaticAssets {
    override_dir: Option<PathBuf>,
}

impl StaticAssets {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self { override_dir }
    }

    fn map_path(base: &Path, url_path: &str) -> Option<PathBuf> {
        let mut pb = base.to_path_buf();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    pub fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "html" => "text/html; charset=utf-8",
            "css" => "text/css; charset=utf-8",
            "js" => "application/javascript; charset=utf-8",
            "json" => "application/json",
            "txt" => "text/plain; charset=utf-8",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            _ => "application/octet-stream",
        }
    }

    fn embedded(name: &str) -> Option<&'static str> {
        match name {
            "style.css" => Some(STYLE_CSS),
            "script.js" => Some(SCRIPT_JS),
            _ => None,
        }
    }

    /// Load an asset by its path below the docs endpoint.
    pub fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let name = url_path.trim_start_matches('/');
        if let Some(dir) = &self.override_dir {
            let path = Self::map_path(dir, name)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
            if path.is_file() {
                let bytes = fs::read(&path)?;
                return Ok((bytes, Self::content_type(&path)));
            }
        }
        Self::embedded(name)
            .map(|body| (body.as_bytes().to_vec(), Self::content_type(Path::new(name))))
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file not found"))
    }
}
