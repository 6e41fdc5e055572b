//! Artifact resolution and placeholder bundles.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tracing::{info, warn};

use crate::application::ports::ArtifactSource;
use crate::domain::ArtifactRef;

// ── Local artifact source ─────────────────────────────────────────────────────

/// Resolves `file://` URLs and plain paths already present on this host.
///
/// Remote repositories are out of reach here; place a fetching
/// implementation of [`ArtifactSource`] in front for those.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalArtifactSource;

impl ArtifactSource for LocalArtifactSource {
    async fn resolve(&self, reference: &ArtifactRef) -> Result<PathBuf> {
        let location = reference.access_url.as_deref().ok_or_else(|| {
            anyhow::anyhow!("artifact {} has no access location", reference.coordinates)
        })?;
        let path = match location.strip_prefix("file://") {
            Some(path) => PathBuf::from(path),
            None if location.contains("://") => {
                anyhow::bail!("unsupported artifact location {location}: only local files resolve")
            }
            None => PathBuf::from(location),
        };
        anyhow::ensure!(
            path.is_file(),
            "artifact {} not found at {}",
            reference.coordinates,
            path.display()
        );
        let digest = sha256_file(&path)?;
        info!(
            artifact = %reference.coordinates,
            path = %path.display(),
            sha256 = %digest,
            "artifact resolved"
        );
        Ok(path)
    }
}

/// Compute the SHA-256 hex digest of a file, reading in 64 KiB chunks.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 65536];
    loop {
        let n = file.read(&mut buf).context("reading file")?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(HEX[(b >> 4) as usize]));
        out.push(char::from(HEX[(b & 0xf) as usize]));
    }
    out
}

// ── Default bundles ───────────────────────────────────────────────────────────

/// Placeholder bundle for an app whose binaries are not published yet.
/// The backing directory is removed on drop.
pub struct DefaultBundle {
    _dir: TempDir,
    path: PathBuf,
}

impl DefaultBundle {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Build a minimal gzip'd bundle of the requested packaging.
///
/// `jar` is packaged as a `war`; anything but `war`, `jar` or `ear` is
/// refused.
///
/// # Errors
///
/// Returns an error for an unsupported extension or if writing fails.
pub fn synthesize_default(app_name: &str, extension: &str) -> Result<DefaultBundle> {
    let packaging = match extension.to_ascii_lowercase().as_str() {
        "war" => "war",
        "jar" => {
            warn!(app = %app_name, "no default jar bundle, packaging a war instead");
            "war"
        }
        "ear" => "ear",
        other => anyhow::bail!("no default bundle for '{other}' binaries (expected war, jar or ear)"),
    };

    let dir = tempfile::tempdir().context("creating bundle directory")?;
    let path = dir.path().join(format!("{app_name}-default-{packaging}.tar.gz"));
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    let page = format!("<html><body><h1>{app_name}</h1><p>No binaries published yet.</p></body></html>\n");
    let entries: Vec<(&str, String)> = match packaging {
        "ear" => vec![(
            "META-INF/application.xml",
            format!("<application><display-name>{app_name}</display-name></application>\n"),
        )],
        _ => vec![
            ("index.html", page),
            (
                "WEB-INF/web.xml",
                format!("<web-app><display-name>{app_name}</display-name></web-app>\n"),
            ),
        ],
    };
    for (name, body) in &entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, body.as_bytes())
            .with_context(|| format!("adding {name} to bundle"))?;
    }
    builder
        .into_inner()
        .context("closing bundle archive")?
        .finish()
        .context("flushing bundle")?;

    info!(app = %app_name, path = %path.display(), "default bundle synthesized");
    Ok(DefaultBundle { _dir: dir, path })
}
