//! Local file names for remote books.

use std::path::{Path, PathBuf};

use super::AcquisitionError;
use crate::catalog::BookFormat;

const SKIPPED_PARAMETERS: [&str; 2] = ["username=", "password="];

/// Path under `root` where the book at `url` is stored.
///
/// The host and every path segment of the URL become directories, the last
/// segment becomes the file name, and query parameters are appended to it
/// with `_` separators. Credentials in the query never reach the file name.
///
/// With `create` set, missing directories are created. Without it, `None` is
/// returned as soon as a directory does not exist.
pub fn book_file_path(
    root: &Path,
    url: &str,
    format: BookFormat,
    create: bool,
) -> Result<Option<PathBuf>, AcquisitionError> {
    let rest = match url.find("://") {
        Some(i) => &url[i + 3..],
        None => url,
    };
    let mut rest = rest.strip_prefix("www.").unwrap_or(rest).to_string();

    let mut dir = root.to_path_buf();
    let mut start = 0;
    loop {
        if !resolve_directory(&dir, create)? {
            return Ok(None);
        }
        let Some(offset) = rest[start..].find('/') else {
            break;
        };
        let slash = start + offset;
        if rest[slash + 1..].starts_with('?') {
            // "name/?query" names the file after the last segment
            rest.remove(slash);
            break;
        }
        push_segment(&mut dir, &rest[start..slash]);
        start = slash + 1;
    }

    let tail = &rest[start..];
    let (mut name, params) = match tail.find('?') {
        Some(i) => (tail[..i].to_string(), &tail[i + 1..]),
        None => (tail.to_string(), ""),
    };

    let extension = match format.extension() {
        Some(ext) => {
            if name.ends_with(ext) {
                name.truncate(name.len() - ext.len());
            }
            ext.to_string()
        }
        None => match name.rfind('.') {
            Some(dot) => {
                let ext = name[dot..].to_string();
                name.truncate(dot);
                ext
            }
            None => String::new(),
        },
    };

    let mut parameters: Vec<&str> = params.split('&').collect();
    if parameters.last() == Some(&"") {
        parameters.pop();
    }
    for param in parameters {
        if SKIPPED_PARAMETERS.iter().any(|p| param.starts_with(p)) {
            continue;
        }
        name.push('_');
        name.push_str(param);
        if name.ends_with('=') {
            name.pop();
        }
    }

    let file_name = format!("{}{}{}", name, format.infix(), extension);
    if file_name.is_empty() || file_name == "." || file_name == ".." {
        return Err(AcquisitionError::InvalidLocator(url.to_string()));
    }
    Ok(Some(dir.join(file_name)))
}

/// Segments that would leave the directory are dropped.
fn push_segment(dir: &mut PathBuf, segment: &str) {
    if !segment.is_empty() && segment != "." && segment != ".." {
        dir.push(segment);
    }
}

fn resolve_directory(dir: &Path, create: bool) -> Result<bool, AcquisitionError> {
    if create {
        std::fs::create_dir_all(dir).map_err(|source| AcquisitionError::DirectoryCreation {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(true)
    } else {
        Ok(dir.is_dir())
    }
}
