//! Dive file discovery
//!
//! Finds basestation per-dive files in a local directory or behind an
//! HTTP(S) directory listing, filters them by profile number and, for
//! remote sources, downloads them into the local cache.

use crate::config::ProfileRange;
use crate::constants::{DIVE_FILE_EXTENSION, PROFILE_PREFIX_LEN};
use crate::error::{Og1Error, Result};

use regex::Regex;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Where dive files come from
#[derive(Debug, Clone, PartialEq)]
pub enum DiveSource {
    Local(PathBuf),
    Remote(Url),
}

impl DiveSource {
    /// Classify a source string as a URL or an existing directory
    pub fn parse(source: &str) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            // Directory listings only resolve relative links under a trailing slash
            let base = if source.ends_with('/') {
                source.to_string()
            } else {
                format!("{source}/")
            };
            let url = Url::parse(&base).map_err(|_| Og1Error::InvalidSource {
                source_str: source.to_string(),
            })?;
            return Ok(DiveSource::Remote(url));
        }

        let path = PathBuf::from(source);
        if path.is_dir() {
            Ok(DiveSource::Local(path))
        } else if path.exists() {
            Err(Og1Error::InvalidSource {
                source_str: source.to_string(),
            })
        } else {
            Err(Og1Error::SourceNotFound { path })
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, DiveSource::Remote(_))
    }
}

impl std::fmt::Display for DiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiveSource::Local(path) => write!(f, "{}", path.display()),
            DiveSource::Remote(url) => write!(f, "{url}"),
        }
    }
}

/// Dive files ready to read, plus the remote ones that could not be fetched
#[derive(Debug, Default, PartialEq)]
pub struct DiscoveredDives {
    pub files: Vec<PathBuf>,
    pub failed_downloads: usize,
}

/// File discovery component for basestation dive files
#[derive(Debug)]
pub struct FileDiscovery {
    source: DiveSource,
    profile_range: ProfileRange,
    cache_dir: PathBuf,
}

impl FileDiscovery {
    pub fn new(source: DiveSource, profile_range: ProfileRange, cache_dir: PathBuf) -> Self {
        Self {
            source,
            profile_range,
            cache_dir,
        }
    }

    /// Discover dive files, returning local paths sorted by file name
    pub async fn discover_dive_files(&self) -> Result<DiscoveredDives> {
        match &self.source {
            DiveSource::Local(dir) => {
                let names = list_files_in_directory(dir)?;
                let selected = filter_files_by_profile(&names, &self.profile_range);
                debug!(
                    "Selected {} of {} files in {}",
                    selected.len(),
                    names.len(),
                    dir.display()
                );
                Ok(DiscoveredDives {
                    files: selected.into_iter().map(|n| dir.join(n)).collect(),
                    failed_downloads: 0,
                })
            }
            DiveSource::Remote(url) => {
                let client = reqwest::Client::new();
                let names = list_files_in_https_server(&client, url).await?;
                let selected = filter_files_by_profile(&names, &self.profile_range);
                info!("Selected {} of {} files at {}", selected.len(), names.len(), url);

                fs::create_dir_all(&self.cache_dir).await?;
                Ok(self.fetch_all(&client, url, &selected).await)
            }
        }
    }

    /// Fetch each file in turn; a failed download is logged and counted
    async fn fetch_all(
        &self,
        client: &reqwest::Client,
        base: &Url,
        names: &[String],
    ) -> DiscoveredDives {
        let mut discovered = DiscoveredDives::default();
        for name in names {
            match self.fetch(client, base, name).await {
                Ok(path) => discovered.files.push(path),
                Err(e) => {
                    error!("Failed to download {}: {}", name, e);
                    discovered.failed_downloads += 1;
                }
            }
        }
        if discovered.failed_downloads > 0 {
            warn!(
                "{} of {} dive files could not be downloaded",
                discovered.failed_downloads,
                names.len()
            );
        }
        discovered
    }

    /// Download one file into the cache unless it is already there
    async fn fetch(&self, client: &reqwest::Client, base: &Url, name: &str) -> Result<PathBuf> {
        let target = self.cache_dir.join(name);
        if fs::try_exists(&target).await? {
            debug!("Using cached {}", target.display());
            return Ok(target);
        }

        let url = base.join(name).map_err(|_| Og1Error::InvalidSource {
            source_str: format!("{base}{name}"),
        })?;
        debug!("Downloading {}", url);
        let bytes = client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        // Write then rename so an interrupted download never looks cached
        let partial = target.with_extension("part");
        fs::write(&partial, &bytes).await?;
        fs::rename(&partial, &target).await?;
        Ok(target)
    }
}

/// Profile number of a dive file name (`p0150500_20050213.nc` gives 500)
pub fn profile_number(file_name: &str) -> Option<i64> {
    file_name
        .split('_')
        .next()
        .and_then(|token| token.get(PROFILE_PREFIX_LEN..))
        .and_then(|digits| digits.parse().ok())
}

/// Keep `.nc` files whose profile number lies in the range
pub fn filter_files_by_profile(files: &[String], range: &ProfileRange) -> Vec<String> {
    files
        .iter()
        .filter(|f| is_dive_file(Path::new(f.as_str())))
        .filter(|f| match profile_number(f) {
            Some(profile) => range.contains(profile),
            None => {
                debug!("Skipping {}: no profile number in name", f);
                false
            }
        })
        .cloned()
        .collect()
}

/// File names of `.nc` files directly inside a directory, sorted
pub fn list_files_in_directory(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(Og1Error::SourceNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Og1Error::Io(e.into()))?;
        if entry.file_type().is_file() && is_dive_file(entry.path()) {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// File names linked from an HTML directory listing that end in `.nc`
pub async fn list_files_in_https_server(
    client: &reqwest::Client,
    url: &Url,
) -> Result<Vec<String>> {
    let body = client
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let files = parse_listing(&body);
    if files.is_empty() {
        warn!("No .nc links found at {}", url);
    }
    Ok(files)
}

/// Extract `.nc` link targets from listing HTML, keeping only the file name
///
/// Names come back sorted with duplicates removed.
fn parse_listing(html: &str) -> Vec<String> {
    static HREF: OnceLock<Regex> = OnceLock::new();
    let href = HREF.get_or_init(|| {
        Regex::new(r#"(?i)href\s*=\s*["']([^"']+\.nc)["']"#).expect("valid href pattern")
    });

    let mut files: Vec<String> = href
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().rsplit('/').next().map(str::to_string))
        .collect();
    files.sort();
    files.dedup();
    files
}

/// Check if a path is a netCDF dive file
fn is_dive_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == DIVE_FILE_EXTENSION)
}
