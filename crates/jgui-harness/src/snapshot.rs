#![forbid(unsafe_code)]

//! Markup snapshots of element trees.
//!
//! Snapshots live in `tests/snapshots/<name>.snap` beside the calling
//! crate's manifest. Run with `BLESS=1` to create or update them.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use jgui_core::Element;

/// Why a snapshot check failed.
#[derive(Debug)]
pub enum SnapshotError {
    /// No stored snapshot and blessing is off.
    Missing(PathBuf),
    Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    Io(PathBuf, std::io::Error),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(path) => write!(
                f,
                "snapshot {} does not exist; rerun with BLESS=1",
                path.display()
            ),
            Self::Mismatch {
                path,
                expected,
                actual,
            } => write!(
                f,
                "snapshot {} differs\n--- expected\n{expected}\n+++ actual\n{actual}",
                path.display()
            ),
            Self::Io(path, err) => write!(f, "snapshot {}: {err}", path.display()),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Pretty markup, one element per line, indented by depth.
#[must_use]
pub fn render_tree(root: &Element) -> String {
    fn walk(el: &Element, depth: usize, out: &mut String) {
        let mut line = format!("{}<{}", "  ".repeat(depth), el.tag());
        if let Some(id) = el.id() {
            line.push_str(&format!(" #{id}"));
        }
        for class in el.classes() {
            line.push_str(&format!(" .{class}"));
        }
        if el.is_disabled() {
            line.push_str(" disabled");
        }
        if el.is_hidden() {
            line.push_str(" hidden");
        }
        line.push('>');
        let text = el.text();
        if !text.is_empty() {
            line.push(' ');
            line.push_str(&text);
        }
        out.push_str(&line);
        out.push('\n');
        for child in el.children() {
            walk(&child, depth + 1, out);
        }
    }
    let mut out = String::new();
    walk(root, 0, &mut out);
    out
}

/// Compare `actual` against `<dir>/<name>.snap`, writing it when `bless`.
///
/// # Errors
///
/// See [`SnapshotError`].
pub fn check(dir: &Path, name: &str, actual: &str, bless: bool) -> Result<(), SnapshotError> {
    let path = dir.join(format!("{name}.snap"));
    if bless {
        fs::create_dir_all(dir).map_err(|e| SnapshotError::Io(dir.to_path_buf(), e))?;
        fs::write(&path, actual).map_err(|e| SnapshotError::Io(path.clone(), e))?;
        tracing::info!(path = %path.display(), "snapshot blessed");
        return Ok(());
    }
    match fs::read_to_string(&path) {
        Ok(expected) if expected == actual => Ok(()),
        Ok(expected) => Err(SnapshotError::Mismatch {
            path,
            expected,
            actual: actual.to_string(),
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(SnapshotError::Missing(path)),
        Err(err) => Err(SnapshotError::Io(path, err)),
    }
}

/// Whether `BLESS` is set in the environment.
#[must_use]
pub fn blessing() -> bool {
    std::env::var_os("BLESS").is_some_and(|v| !v.is_empty() && v != "0")
}

/// Assert an element tree matches its stored snapshot.
#[macro_export]
macro_rules! assert_snapshot {
    ($name:expr, $root:expr) => {{
        let dir = ::std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("snapshots");
        let actual = $crate::snapshot::render_tree($root);
        if let Err(err) = $crate::snapshot::check(&dir, $name, &actual, $crate::snapshot::blessing()) {
            panic!("{err}");
        }
    }};
}
