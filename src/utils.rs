//! Utility functions for cross-platform path handling

use std::path::Path;

/// Normalize a repository-relative path to git's forward-slash form.
///
/// - `./` prefixes are dropped
/// - backslashes become `/`
/// - repeated separators collapse, trailing separators are removed
///
/// Surrounding whitespace is kept: git reports such names verbatim.
///
/// Returns the reason as `Err` when the path is empty, absolute, or
/// escapes the repository with a `..` segment.
pub fn normalize_repo_path(raw: &str) -> Result<String, String> {
  let unified = raw.replace('\\', "/");

  if unified.starts_with('/') {
    return Err("path is absolute".to_string());
  }

  if cfg!(windows) && has_drive_letter(&unified) {
    return Err("path is absolute".to_string());
  }

  let mut segments = Vec::new();
  for segment in unified.split('/') {
    match segment {
      "" | "." => continue,
      ".." => return Err("path escapes the repository root".to_string()),
      s => segments.push(s),
    }
  }

  if segments.is_empty() {
    return Err("path is empty".to_string());
  }

  Ok(segments.join("/"))
}

/// `C:/...` style prefix; only meaningful on Windows, where `a:notes` cannot
/// be a relative file name.
fn has_drive_letter(path: &str) -> bool {
  let bytes = path.as_bytes();
  bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// True when `path` is `prefix` itself or lies underneath it.
///
/// Both sides must already be normalized. `rocky9-old/x` does not match `rocky9`.
pub fn is_under_prefix(path: &str, prefix: &str) -> bool {
  match path.strip_prefix(prefix) {
    Some(rest) => rest.is_empty() || rest.starts_with('/'),
    None => false,
  }
}

/// Convert a path to Git format (always forward slashes)
///
/// Git expects paths with forward slashes, even on Windows.
pub fn path_to_git_format(path: &Path) -> String {
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}
