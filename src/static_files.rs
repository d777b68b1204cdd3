//! Folder mounts.
//!
//! A [`FileServer`] answers the part of a request path that follows its mount
//! prefix. The sub-path is resolved lexically against the root: a `..` that
//! would climb above the root is rejected before the filesystem is touched,
//! whether or not the target exists.

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, HttpError};
use crate::response::Response;

pub(crate) const ILLEGAL_PATH: &str = "Illegal path";
pub(crate) const FILE_NOT_FOUND: &str = "File not found";

/// Options of a static mount.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct StaticOptions {
    /// Answer directory paths with an HTML list of their entries instead of
    /// a 404.
    pub list_files: bool,
}

impl StaticOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list_files(mut self, enabled: bool) -> Self {
        self.list_files = enabled;
        self
    }
}

#[derive(Debug)]
pub(crate) struct FileServer {
    root: PathBuf,
    options: StaticOptions,
}

impl FileServer {
    /// Mounts `folder`, made absolute against the working directory. The
    /// folder does not have to exist yet.
    pub(crate) fn new(folder: impl AsRef<Path>, options: StaticOptions) -> Result<Self, Error> {
        let folder = folder.as_ref();
        let root = if folder.is_absolute() {
            folder.to_path_buf()
        } else {
            std::env::current_dir()?.join(folder)
        };
        Ok(Self { root: normalize(&root), options })
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a percent-encoded sub-path onto the root.
    pub(crate) fn resolve(&self, sub_path: &str) -> Result<PathBuf, HttpError> {
        let decoded = urlencoding::decode(sub_path).map_err(|_| HttpError::bad_request(ILLEGAL_PATH))?;

        let mut segments: Vec<&str> = Vec::new();
        for segment in decoded.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(HttpError::bad_request(ILLEGAL_PATH));
                    }
                }
                s if s.contains('\0') || Path::new(s).has_root() => {
                    return Err(HttpError::bad_request(ILLEGAL_PATH));
                }
                s => segments.push(s),
            }
        }

        let mut path = self.root.clone();
        path.extend(segments);
        Ok(path)
    }

    /// Serves `sub_path`. `request_path` is the full path of the request,
    /// used to build the links of a directory listing.
    pub(crate) async fn serve(&self, request_path: &str, sub_path: &str) -> Result<Response, HttpError> {
        let path = self.resolve(sub_path)?;
        let not_found = || HttpError::not_found(FILE_NOT_FOUND);

        let metadata = tokio::fs::metadata(&path).await.map_err(|_| not_found())?;
        if metadata.is_dir() {
            if !self.options.list_files {
                return Err(not_found());
            }
            return self.listing(&path, request_path).await;
        }

        let contents = tokio::fs::read(&path).await.map_err(|_| not_found())?;
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        Ok(Response::builder().bytes(mime.as_ref(), contents))
    }

    async fn listing(&self, dir: &Path, request_path: &str) -> Result<Response, HttpError> {
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|_| HttpError::not_found(FILE_NOT_FOUND))?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        let base = request_path.trim_end_matches('/');
        let body = names.iter()
            .map(|name| format!("<a href=\"{base}/{name}\"> {name}</a><br/>"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(Response::builder().bytes("text/html; charset=utf-8", body.into_bytes()))
    }
}

/// Removes `.` and folds `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
