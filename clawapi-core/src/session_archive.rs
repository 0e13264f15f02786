//! Portable session archives.
//!
//! An archive is a zip holding exactly the session files of one provider,
//! stored under a folder named after it:
//!
//! ```text
//! claude/cookies.json
//! claude/userAgent.txt
//! ```
//!
//! Browser profile leftovers (caches, local storage) are never included.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path};

use tracing::{debug, info};
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::FileOptions;

use crate::session_store::{COOKIES_FILE, SessionStore, USER_AGENT_FILE};

const SESSION_FILES: [&str; 2] = [COOKIES_FILE, USER_AGENT_FILE];

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("No session files found for '{0}'")]
    NothingToExport(String),

    #[error("Archive entry '{entry}' does not belong to provider '{provider}'")]
    ForeignEntry { provider: String, entry: String },

    #[error("Archive contains no {COOKIES_FILE} for '{0}'")]
    MissingCookies(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Write the provider's session files into a zip at `archive_path`.
///
/// Returns the number of files archived.
pub fn export_session(
    store: &SessionStore,
    provider: &str,
    archive_path: &Path,
) -> Result<usize, ArchiveError> {
    let session_dir = store.session_dir(provider);
    let present: Vec<&str> = SESSION_FILES
        .iter()
        .copied()
        .filter(|file| session_dir.join(file).is_file())
        .collect();
    if present.is_empty() {
        return Err(ArchiveError::NothingToExport(provider.to_string()));
    }

    let mut zip = ZipWriter::new(File::create(archive_path)?);
    let options = FileOptions::default();
    for file in &present {
        let content = fs::read(session_dir.join(file))?;
        zip.start_file(format!("{provider}/{file}"), options)?;
        zip.write_all(&content)?;
    }
    zip.finish()?;

    info!(
        "Exported {} session files for '{}' to {}",
        present.len(),
        provider,
        archive_path.display()
    );
    Ok(present.len())
}

/// Replace the provider's session with the content of an archive.
///
/// The archive is fully read and checked before the previous session is
/// removed, so a rejected archive leaves the old session untouched.
pub fn import_session(
    store: &SessionStore,
    provider: &str,
    archive_path: &Path,
) -> Result<(), ArchiveError> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    let mut files: Vec<(&'static str, Vec<u8>)> = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let raw_name = entry.name().to_string();
        let parts: Vec<String> = entry
            .enclosed_name()
            .map(|path| {
                path.components()
                    .filter_map(|c| match c {
                        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let [folder, file] = parts.as_slice() else {
            return Err(ArchiveError::ForeignEntry {
                provider: provider.to_string(),
                entry: raw_name,
            });
        };
        if folder != provider {
            return Err(ArchiveError::ForeignEntry {
                provider: provider.to_string(),
                entry: raw_name,
            });
        }

        let Some(known) = SESSION_FILES.iter().find(|f| *f == file) else {
            debug!("Skipping non-session archive entry {}", raw_name);
            continue;
        };
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        files.push((*known, content));
    }

    if !files.iter().any(|(name, _)| *name == COOKIES_FILE) {
        return Err(ArchiveError::MissingCookies(provider.to_string()));
    }

    store.reset(provider)?;
    let session_dir = store.session_dir(provider);
    fs::create_dir_all(&session_dir)?;
    for (name, content) in files {
        fs::write(session_dir.join(name), content)?;
    }

    info!("Imported session for '{}' from {}", provider, archive_path.display());
    Ok(())
}
