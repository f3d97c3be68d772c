//! # Version Resolver Module / 版本解析模块
//!
//! Selects manifest entries for a requested track. A single track resolves to
//! at most one released and one snapshot version; the all-tracks mode (used
//! by scheduled builds) enumerates every non-legacy snapshot and derives the
//! branch each one belongs to.
//!
//! 为请求的轨道选择清单条目。单个轨道最多解析为一个发布版本和一个快照版本；
//! 全轨道模式（用于定时构建）枚举所有非旧版快照并推导每个快照所属的分支。

use crate::core::manifest::ReleaseManifest;
use thiserror::Error;

/// Track that always follows the newest unreleased 8.x line.
pub const FUTURE_TRACK: &str = "8.x";
/// Snapshot key holding the version for [`FUTURE_TRACK`].
pub const FUTURE_SNAPSHOT_KEY: &str = "8.future";
pub const MAIN_TRACK: &str = "main";
/// Version prefixes skipped when enumerating all tracks.
pub const LEGACY_PREFIXES: &[&str] = &["7."];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("manifest has no `{key}` entry in `{section}` for track `{track}`")]
    MissingEntry {
        section: &'static str,
        key: String,
        track: String,
    },

    #[error("cannot derive a branch from snapshot `{key}` with version `{version}`")]
    UnparsableVersion { key: String, version: String },
}

/// Which manifest entries to pick.
/// 选择哪些清单条目。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode {
    /// Resolve one requested track (a branch name, `main`, or `8.x`).
    SingleTrack(String),
    /// Enumerate every non-legacy snapshot, deriving its branch.
    AllTracks,
}

impl SelectionMode {
    /// Human-readable name of the selection, used for step-group titles.
    pub fn display_track(&self) -> &str {
        match self {
            SelectionMode::SingleTrack(track) => track,
            SelectionMode::AllTracks => "scheduled",
        }
    }
}

/// A concrete stack version picked from the manifest.
/// 从清单中选出的具体技术栈版本。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// The full version string, e.g. `8.15.2` or `9.0.0-SNAPSHOT`.
    pub version: String,
    /// `true` when the version comes from the `snapshots` section.
    pub snapshot: bool,
    /// The requested track, or the derived branch in all-tracks mode.
    pub track: String,
}

impl ResolvedVersion {
    fn new(version: &str, snapshot: bool, track: &str) -> Self {
        Self {
            version: version.to_string(),
            snapshot,
            track: track.to_string(),
        }
    }
}

/// Resolves the manifest entries selected by `mode`.
///
/// Releases come before snapshots, and within a section the first entry whose
/// version starts with the track wins. A numeric track with no match yields an
/// empty list; `main` and `8.x` require their snapshot keys to exist.
///
/// 解析由 `mode` 选择的清单条目。
/// 发布版本排在快照之前；在同一部分中，版本以轨道开头的第一个条目胜出。
pub fn resolve(
    manifest: &ReleaseManifest,
    mode: &SelectionMode,
) -> Result<Vec<ResolvedVersion>, ResolveError> {
    match mode {
        SelectionMode::SingleTrack(track) => resolve_track(manifest, track),
        SelectionMode::AllTracks => resolve_all_tracks(manifest),
    }
}

fn resolve_track(
    manifest: &ReleaseManifest,
    track: &str,
) -> Result<Vec<ResolvedVersion>, ResolveError> {
    let special_key = match track {
        FUTURE_TRACK => Some(FUTURE_SNAPSHOT_KEY),
        MAIN_TRACK => Some(MAIN_TRACK),
        _ => None,
    };

    if let Some(key) = special_key {
        let version = manifest
            .snapshots
            .get(key)
            .ok_or_else(|| ResolveError::MissingEntry {
                section: "snapshots",
                key: key.to_string(),
                track: track.to_string(),
            })?;
        return Ok(vec![ResolvedVersion::new(version, true, track)]);
    }

    let released = manifest
        .releases
        .iter()
        .find(|(_, version)| version.starts_with(track))
        .map(|(_, version)| ResolvedVersion::new(version, false, track));
    let snapshot = manifest
        .snapshots
        .iter()
        .find(|(_, version)| version.starts_with(track))
        .map(|(_, version)| ResolvedVersion::new(version, true, track));

    Ok(released.into_iter().chain(snapshot).collect())
}

fn resolve_all_tracks(manifest: &ReleaseManifest) -> Result<Vec<ResolvedVersion>, ResolveError> {
    manifest
        .snapshots
        .iter()
        .filter(|(_, version)| !is_legacy(version))
        .map(|(key, version)| {
            let branch = derive_branch(key, version)?;
            Ok(ResolvedVersion::new(version, true, &branch))
        })
        .collect()
}

/// Returns `true` for versions of a major line that is no longer tested.
pub fn is_legacy(version: &str) -> bool {
    LEGACY_PREFIXES
        .iter()
        .any(|prefix| version.starts_with(prefix))
}

/// Derives the branch a snapshot entry is built from.
///
/// `main` stays `main`, a `*.future` key becomes `{major}.x`, anything else
/// becomes `{major}.{minor}` of its version.
///
/// 推导快照条目所对应的构建分支。
pub fn derive_branch(key: &str, version: &str) -> Result<String, ResolveError> {
    if key == MAIN_TRACK {
        return Ok(MAIN_TRACK.to_string());
    }

    let unparsable = || ResolveError::UnparsableVersion {
        key: key.to_string(),
        version: version.to_string(),
    };
    let mut parts = version.split(['.', '-']);
    let major = parts
        .next()
        .filter(|part| is_numeric(part))
        .ok_or_else(unparsable)?;

    if key.ends_with(".future") {
        return Ok(format!("{major}.x"));
    }

    let minor = parts
        .next()
        .filter(|part| is_numeric(part))
        .ok_or_else(unparsable)?;
    Ok(format!("{major}.{minor}"))
}

fn is_numeric(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}
