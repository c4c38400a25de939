//! Handing finished downloads over to the user

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Destination for downloaded payloads
pub trait FileSink: Send + Sync {
    /// Store `bytes` under `filename` and return where they ended up
    fn deliver(&self, bytes: &[u8], filename: &str) -> std::io::Result<PathBuf>;
}

/// Writes payloads into a folder, never overwriting existing files
pub struct FolderSink {
    dir: PathBuf,
}

impl FolderSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FileSink for FolderSink {
    fn deliver(&self, bytes: &[u8], filename: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let mut attempt = 0;
        loop {
            let path = self.dir.join(numbered_name(filename, attempt));
            // create_new so two deliveries can't race for the same name
            match std::fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    write_or_discard(file, &path, bytes)?;
                    info!(path = %path.display(), size = bytes.len(), "File saved");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Fill a freshly created file, removing it again if the write fails
fn write_or_discard(mut file: impl Write, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let result = file.write_all(bytes).and_then(|()| file.flush());
    drop(file);
    if let Err(e) = result {
        if let Err(remove_err) = std::fs::remove_file(path) {
            warn!(error = %remove_err, path = %path.display(), "Failed to remove partial file");
        }
        return Err(e);
    }
    Ok(())
}

/// `name.ext`, `name (1).ext`, `name (2).ext`, ...
fn numbered_name(filename: &str, n: u32) -> String {
    if n == 0 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", filename, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_keeps_extension() {
        assert_eq!(numbered_name("video_x.mp4", 0), "video_x.mp4");
        assert_eq!(numbered_name("video_x.mp4", 2), "video_x (2).mp4");
        assert_eq!(numbered_name("README", 1), "README (1)");
    }

    #[test]
    fn writes_into_created_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FolderSink::new(tmp.path().join("nested"));
        let path = sink.deliver(b"abc", "audio_x.m4a").unwrap();
        assert_eq!(path, tmp.path().join("nested").join("audio_x.m4a"));
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FolderSink::new(tmp.path());
        let first = sink.deliver(b"one", "video_x.mp4").unwrap();
        let second = sink.deliver(b"two", "video_x.mp4").unwrap();
        assert_ne!(first, second);
        assert_eq!(second.file_name().unwrap(), "video_x (1).mp4");
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::WriteZero, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("video_x.mp4");
        std::fs::write(&path, b"").unwrap();

        let err = write_or_discard(BrokenWriter, &path, b"payload").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);
        assert!(!path.exists());
    }

    #[test]
    fn successful_write_keeps_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("audio_x.m4a");
        let file = std::fs::File::create(&path).unwrap();

        write_or_discard(file, &path, b"payload").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }
}
