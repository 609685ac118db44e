//! Toolchain archive download and extraction.
//!
//! [`Fetcher`] is the seam between resolvers and the network: resolvers only
//! name a URL and an archive format, and the fetcher leaves the unpacked
//! contents in a directory. [`HttpFetcher`] is the real implementation;
//! tests substitute their own.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use flate2::read::GzDecoder;
use tar::Archive;
use url::Url;

use crate::core::errors::{CrossError, CrossResult};
use crate::util::shell::{Progress, Shell, Status};

/// Archive formats toolchains are published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from a URL or file name.
    pub fn from_url(url: &str) -> CrossResult<Self> {
        let lower = url.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Ok(ArchiveFormat::TarGz)
        } else if lower.ends_with(".zip") {
            Ok(ArchiveFormat::Zip)
        } else {
            Err(CrossError::UnsupportedArchiveFormat(url.to_string()))
        }
    }
}

/// Produces an extracted archive in a directory.
///
/// `dest` exists and is empty when `fetch` is called. Implementations must
/// be usable from several threads at once (toolchain prefetch).
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, format: ArchiveFormat, dest: &Path) -> CrossResult<()>;
}

/// Downloads over HTTPS with reqwest and unpacks while streaming.
pub struct HttpFetcher {
    shell: Arc<Shell>,
    github_proxy: Option<String>,
    offline: bool,
}

impl HttpFetcher {
    pub fn new(shell: Arc<Shell>) -> Self {
        HttpFetcher {
            shell,
            github_proxy: None,
            offline: false,
        }
    }

    /// Route github.com downloads through a mirror such as `https://ghproxy.example/`.
    pub fn with_github_proxy(mut self, proxy: Option<&str>) -> CrossResult<Self> {
        self.github_proxy = match proxy.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => Some(normalize_proxy(p)?),
            None => None,
        };
        Ok(self)
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    fn client(&self, url: &str) -> CrossResult<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .user_agent(concat!("xforge/", env!("CARGO_PKG_VERSION")))
            .timeout(None)
            .build()
            .map_err(|e| download_error(url, e))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, format: ArchiveFormat, dest: &Path) -> CrossResult<()> {
        let url = apply_github_proxy(url, self.github_proxy.as_deref());
        if self.offline {
            return Err(CrossError::DownloadFailed {
                url,
                reason: "offline mode is enabled and the toolchain is not cached".to_string(),
            });
        }

        self.shell.status(Status::Fetching, &url);
        tracing::debug!("downloading {} into {}", url, dest.display());

        let response = self
            .client(&url)?
            .get(&url)
            .send()
            .map_err(|e| download_error(&url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CrossError::DownloadFailed {
                url,
                reason: format!("HTTP {}", status),
            });
        }

        let progress = self
            .shell
            .bytes_progress("Downloading", response.content_length());
        let mut reader = ProgressReader::new(response, progress);

        match format {
            ArchiveFormat::TarGz => {
                extract_tar_gz(&mut reader, dest)?;
            }
            ArchiveFormat::Zip => {
                // zip needs random access; spool to a temp file next to dest
                let parent = dest.parent().unwrap_or(dest);
                let mut spool = tempfile::tempfile_in(parent)
                    .map_err(|e| CrossError::io("failed to create download spool file", e))?;
                io::copy(&mut reader, &mut spool).map_err(|e| CrossError::DownloadFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
                spool
                    .rewind()
                    .map_err(|e| CrossError::io("failed to rewind download spool file", e))?;
                self.shell.status(Status::Extracting, dest.display());
                extract_zip(spool, dest)?;
            }
        }

        reader.progress.finish();
        Ok(())
    }
}

fn download_error(url: &str, err: reqwest::Error) -> CrossError {
    CrossError::DownloadFailed {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

fn normalize_proxy(proxy: &str) -> CrossResult<String> {
    let parsed = Url::parse(proxy)
        .map_err(|e| CrossError::InvalidArgument(format!("invalid GitHub proxy `{proxy}`: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CrossError::InvalidArgument(format!(
            "GitHub proxy `{proxy}` must be an http(s) URL"
        )));
    }
    let mut out = proxy.to_string();
    if !out.ends_with('/') {
        out.push('/');
    }
    Ok(out)
}

/// Prefix github.com URLs with the configured mirror.
pub fn apply_github_proxy(url: &str, proxy: Option<&str>) -> String {
    match proxy {
        Some(proxy) if url.starts_with("https://github.com/") => format!("{proxy}{url}"),
        _ => url.to_string(),
    }
}

/// Counts bytes flowing through a reader into a progress bar.
struct ProgressReader<R> {
    inner: R,
    progress: Progress,
}

impl<R> ProgressReader<R> {
    fn new(inner: R, progress: Progress) -> Self {
        ProgressReader { inner, progress }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.progress.inc(n as u64);
        Ok(n)
    }
}

fn extraction_error(dest: &Path, err: impl std::fmt::Display) -> CrossError {
    CrossError::ExtractionFailed {
        path: dest.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Unpack a gzip-compressed tarball into `dest`.
///
/// Entries that would land outside `dest` are rejected.
pub fn extract_tar_gz(reader: impl Read, dest: &Path) -> CrossResult<()> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    std::fs::create_dir_all(dest).map_err(|e| extraction_error(dest, e))?;

    let entries = archive.entries().map_err(|e| extraction_error(dest, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| extraction_error(dest, e))?;
        let entry_path = entry
            .path()
            .map_err(|e| extraction_error(dest, e))?
            .into_owned();
        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| extraction_error(dest, e))?;
        if !unpacked {
            return Err(extraction_error(
                dest,
                format!("entry escapes destination: {}", entry_path.display()),
            ));
        }
    }
    Ok(())
}

/// Unpack a zip archive into `dest`, restoring unix modes and symlinks.
pub fn extract_zip<R: Read + Seek>(reader: R, dest: &Path) -> CrossResult<()> {
    let mut archive = zip::ZipArchive::new(reader).map_err(|e| extraction_error(dest, e))?;
    std::fs::create_dir_all(dest).map_err(|e| extraction_error(dest, e))?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| extraction_error(dest, e))?;
        let Some(rel) = file.enclosed_name() else {
            return Err(extraction_error(
                dest,
                format!("entry escapes destination: {}", file.name()),
            ));
        };
        let out = dest.join(rel);

        if file.is_dir() {
            std::fs::create_dir_all(&out).map_err(|e| extraction_error(dest, e))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| extraction_error(dest, e))?;
        }

        #[cfg(unix)]
        if file.is_symlink() {
            let mut target = String::new();
            file.read_to_string(&mut target)
                .map_err(|e| extraction_error(dest, e))?;
            let _ = std::fs::remove_file(&out);
            std::os::unix::fs::symlink(target, &out).map_err(|e| extraction_error(dest, e))?;
            continue;
        }

        let mut outfile = File::create(&out).map_err(|e| extraction_error(dest, e))?;
        io::copy(&mut file, &mut outfile).map_err(|e| extraction_error(dest, e))?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out, std::fs::Permissions::from_mode(mode & 0o7777))
                .map_err(|e| extraction_error(dest, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    fn tarball(files: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, data, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_archive_format_from_url() {
        assert_eq!(ArchiveFormat::from_url("a/b.tgz").unwrap(), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::from_url("a/b.TAR.GZ").unwrap(), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::from_url("ndk.zip").unwrap(), ArchiveFormat::Zip);
        let err = ArchiveFormat::from_url("a/b.tar.xz").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_extract_tar_gz() {
        let tmp = TempDir::new().unwrap();
        let data = tarball(&[
            ("aarch64-linux-musl-cross/bin/aarch64-linux-musl-gcc", b"#!/bin/sh\n", 0o755),
            ("aarch64-linux-musl-cross/README", b"readme", 0o644),
        ]);

        extract_tar_gz(Cursor::new(data), tmp.path()).unwrap();

        let gcc = tmp.path().join("aarch64-linux-musl-cross/bin/aarch64-linux-musl-gcc");
        assert!(gcc.exists());
        #[cfg(unix)]
        assert!(crate::util::fs::is_executable(&gcc));
    }

    #[test]
    fn test_extract_tar_gz_corrupt_is_extraction_error() {
        let tmp = TempDir::new().unwrap();
        let err = extract_tar_gz(Cursor::new(b"not a tarball".to_vec()), tmp.path()).unwrap_err();
        assert!(matches!(err, CrossError::ExtractionFailed { .. }));
    }

    #[test]
    fn test_extract_zip() {
        let tmp = TempDir::new().unwrap();
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(0o755);
        writer.add_directory("android-ndk-r27d/", options).unwrap();
        writer
            .start_file("android-ndk-r27d/ndk-build", options)
            .unwrap();
        writer.write_all(b"#!/bin/sh\n").unwrap();
        let cursor = writer.finish().unwrap();

        extract_zip(Cursor::new(cursor.into_inner()), tmp.path()).unwrap();
        assert!(tmp.path().join("android-ndk-r27d/ndk-build").is_file());
    }

    #[test]
    fn test_github_proxy() {
        let url = "https://github.com/zijiren233/cross-make/releases/download/x.tgz";
        assert_eq!(
            apply_github_proxy(url, Some("https://ghproxy.example/")),
            format!("https://ghproxy.example/{url}")
        );
        assert_eq!(
            apply_github_proxy("https://dl.google.com/ndk.zip", Some("https://ghproxy.example/")),
            "https://dl.google.com/ndk.zip"
        );
        assert_eq!(apply_github_proxy(url, None), url);

        assert_eq!(normalize_proxy("https://ghproxy.example").unwrap(), "https://ghproxy.example/");
        assert!(normalize_proxy("not a url").is_err());
        assert!(normalize_proxy("ftp://mirror.example/").is_err());
    }

    #[test]
    fn test_offline_fetch_fails_without_network() {
        let tmp = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(Arc::new(Shell::default())).offline(true);
        let err = fetcher
            .fetch("https://github.com/a/b.tgz", ArchiveFormat::TarGz, tmp.path())
            .unwrap_err();
        assert!(matches!(err, CrossError::DownloadFailed { .. }));
        assert_eq!(err.exit_code(), 2);
    }
}
