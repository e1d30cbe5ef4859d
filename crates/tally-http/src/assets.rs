//! Single-page application asset serving.
//!
//! The SPA build in `web/build` is compiled into the binary with
//! [`rust_embed`], so the server needs nothing on disk besides the counter
//! file. A directory override ([`AppState::assets_dir`]) serves from disk
//! instead, which is handy while iterating on the UI.
//!
//! Either way, paths that do not name a file fall back to `index.html` so
//! client-side routes survive a reload, and nothing under the `/api`
//! prefix ever reaches the SPA.
//!
//! [`AppState::assets_dir`]: crate::state::AppState::assets_dir

use std::collections::BTreeMap;
use std::fs::{self, DirEntry};
use std::path::Path;

use axum::extract::Request;
use axum::http::{header, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use rust_embed::RustEmbed;
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;

use crate::error::ApiError;

/// Name of the SPA entry point.
pub const INDEX_FILE: &str = "index.html";

/// Path prefix reserved for the JSON API.
pub const API_PREFIX: &str = "/api";

/// The SPA build, embedded at compile time.
#[derive(RustEmbed)]
#[folder = "../../web/build/"]
pub struct WebAssets;

/// Build the router that serves everything the API routes do not match.
///
/// Serves from `dir` when given, otherwise from [`WebAssets`].
pub fn spa_router(dir: Option<&Path>) -> Router {
    let router = match dir {
        Some(dir) => Router::new().fallback_service(spa_service(dir)),
        None => Router::new().fallback(serve_embedded),
    };
    router.layer(middleware::from_fn(reject_api_paths))
}

/// Build the on-disk static file service with `index.html` fallback.
pub fn spa_service(dir: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(dir).fallback(ServeFile::new(dir.join(INDEX_FILE)))
}

/// Serve a file from the embedded build, or `index.html` if there is none.
pub async fn serve_embedded(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() { INDEX_FILE } else { path };

    match WebAssets::get(path).or_else(|| WebAssets::get(INDEX_FILE)) {
        Some(file) => (
            [(header::CONTENT_TYPE, file.metadata.mimetype().to_owned())],
            file.data,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Answer any `/api`-prefixed path that no API route matched with a JSON
/// 404 instead of the SPA.
pub async fn reject_api_paths(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if path.starts_with(API_PREFIX) {
        return ApiError::NotFound(path.to_owned()).into_response();
    }
    next.run(request).await
}

// ---------------------------------------------------------------------------
// Startup diagnostic
// ---------------------------------------------------------------------------

/// Log the served asset tree at `info` level, one line per entry.
pub fn log_asset_tree(dir: Option<&Path>, max_depth: i32) {
    let lines = match dir {
        Some(dir) => {
            info!(dir = %dir.display(), max_depth, "Serving assets from disk");
            asset_tree(dir, max_depth)
        }
        None => {
            info!(max_depth, "Serving embedded assets");
            embedded_asset_tree(max_depth)
        }
    };
    for line in lines {
        info!("{line}");
    }
}

/// Render the embedded build as an indented tree.
///
/// Same depth rules as [`asset_tree`].
pub fn embedded_asset_tree(max_depth: i32) -> Vec<String> {
    let mut root = PathNode::default();
    for path in WebAssets::iter() {
        root.insert(&path);
    }
    let mut lines = Vec::new();
    root.render(0, "", max_depth, &mut lines);
    lines
}

/// Render the contents of `root` as an indented tree.
///
/// Descends at most `max_depth` levels (negative means unlimited, 0
/// renders nothing). Entries are sorted by name. A directory that cannot
/// be read yields an error line in place of its children.
pub fn asset_tree(root: &Path, max_depth: i32) -> Vec<String> {
    let mut lines = Vec::new();
    render_dir(root, 0, "", max_depth, &mut lines);
    lines
}

const fn branch(is_last: bool) -> (&'static str, &'static str) {
    if is_last {
        ("└── ", "    ")
    } else {
        ("├── ", "│   ")
    }
}

const fn depth_exhausted(level: i32, max_depth: i32) -> bool {
    max_depth >= 0 && level >= max_depth
}

/// Directory tree built from `/`-separated embedded paths.
#[derive(Default)]
struct PathNode(BTreeMap<String, PathNode>);

impl PathNode {
    fn insert(&mut self, path: &str) {
        let mut node = self;
        for part in path.split('/').filter(|part| !part.is_empty()) {
            node = node.0.entry(part.to_owned()).or_default();
        }
    }

    fn render(&self, level: i32, prefix: &str, max_depth: i32, lines: &mut Vec<String>) {
        if depth_exhausted(level, max_depth) {
            return;
        }

        let last = self.0.len().saturating_sub(1);
        for (i, (name, child)) in self.0.iter().enumerate() {
            let (branch, indent) = branch(i == last);
            lines.push(format!("{prefix}{branch}{name}"));
            if !child.0.is_empty() {
                child.render(
                    level.saturating_add(1),
                    &format!("{prefix}{indent}"),
                    max_depth,
                    lines,
                );
            }
        }
    }
}

fn render_dir(dir: &Path, level: i32, prefix: &str, max_depth: i32, lines: &mut Vec<String>) {
    if depth_exhausted(level, max_depth) {
        return;
    }

    let mut entries: Vec<DirEntry> = match fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(Result::ok).collect(),
        Err(e) => {
            lines.push(format!("{prefix}error reading directory {}: {e}", dir.display()));
            return;
        }
    };
    entries.sort_by_key(DirEntry::file_name);

    let last = entries.len().saturating_sub(1);
    for (i, entry) in entries.iter().enumerate() {
        let (branch, indent) = branch(i == last);
        lines.push(format!(
            "{prefix}{branch}{}",
            entry.file_name().to_string_lossy()
        ));

        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            render_dir(
                &entry.path(),
                level.saturating_add(1),
                &format!("{prefix}{indent}"),
                max_depth,
                lines,
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(INDEX_FILE), "<html></html>").unwrap();
        fs::create_dir(dir.path().join("_app")).unwrap();
        fs::write(dir.path().join("_app").join("main.js"), "").unwrap();
        fs::write(dir.path().join("favicon.png"), "").unwrap();
        dir
    }

    #[test]
    fn depth_one_lists_top_level_only() {
        let dir = sample_dir();
        let lines = asset_tree(dir.path(), 1);
        assert_eq!(lines, vec!["├── _app", "├── favicon.png", "└── index.html"]);
    }

    #[test]
    fn unlimited_depth_descends() {
        let dir = sample_dir();
        let lines = asset_tree(dir.path(), -1);
        assert_eq!(
            lines,
            vec![
                "├── _app",
                "│   └── main.js",
                "├── favicon.png",
                "└── index.html",
            ]
        );
    }

    #[test]
    fn zero_depth_renders_nothing() {
        let dir = sample_dir();
        assert!(asset_tree(dir.path(), 0).is_empty());
    }

    #[test]
    fn missing_directory_renders_an_error_line() {
        let dir = tempfile::tempdir().unwrap();
        let lines = asset_tree(&dir.path().join("build"), 1);
        assert_eq!(lines.len(), 1);
        assert!(lines.first().is_some_and(|l| l.starts_with("error reading directory")));
    }

    #[test]
    fn path_list_renders_like_a_directory() {
        let mut root = PathNode::default();
        for path in ["index.html", "_app/main.js", "favicon.png"] {
            root.insert(path);
        }
        let mut lines = Vec::new();
        root.render(0, "", -1, &mut lines);
        assert_eq!(lines, asset_tree(sample_dir().path(), -1));
    }

    #[test]
    fn embedded_build_contains_index() {
        assert!(WebAssets::get(INDEX_FILE).is_some());
        assert!(embedded_asset_tree(1).iter().any(|l| l.ends_with(INDEX_FILE)));
    }
}
