//! # Release Manifest Module / 发布清单模块
//!
//! This module parses the release manifest published for the Elastic stack.
//! The manifest maps track names to concrete version strings and is split into
//! a `releases` section and a `snapshots` section. Entry order is preserved,
//! because the resolver picks the first entry that matches a track.
//!
//! 此模块解析为 Elastic 技术栈发布的版本清单。
//! 清单将轨道名称映射到具体的版本字符串，分为 `releases` 和 `snapshots` 两部分。
//! 条目的顺序会被保留，因为解析器会选择第一个匹配轨道的条目。

use serde_yaml::Value;
use thiserror::Error;

/// Errors raised while turning a manifest document into a [`ReleaseManifest`].
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest is not valid YAML or JSON: {0}")]
    Syntax(#[from] serde_yaml::Error),

    #[error("manifest root must be a mapping")]
    NotAMapping,

    #[error("manifest section `{0}` must be a mapping of names to versions")]
    SectionNotAMapping(&'static str),

    #[error("manifest section `{section}` has a non-scalar {what}")]
    NonScalar {
        section: &'static str,
        what: &'static str,
    },
}

/// One ordered `name -> version` section of the manifest.
/// 清单中一个有序的 `名称 -> 版本` 部分。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestSection {
    entries: Vec<(String, String)>,
}

impl ManifestSection {
    /// Builds a section from `(name, version)` pairs, keeping their order.
    /// A repeated name replaces the earlier value in place.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut section = Self::default();
        for (name, version) in pairs {
            section.insert(name.into(), version.into());
        }
        section
    }

    fn insert(&mut self, name: String, version: String) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = version,
            None => self.entries.push((name, version)),
        }
    }

    /// Looks up the version stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, version)| version.as_str())
    }

    /// Iterates `(name, version)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, version)| (name.as_str(), version.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The release manifest: released versions and continuously built snapshots.
/// 发布清单：已发布的版本和持续构建的快照版本。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseManifest {
    pub releases: ManifestSection,
    pub snapshots: ManifestSection,
}

impl ReleaseManifest {
    pub fn new(releases: ManifestSection, snapshots: ManifestSection) -> Self {
        Self {
            releases,
            snapshots,
        }
    }

    /// Parses a JSON or YAML manifest document.
    ///
    /// Keys and values that YAML would read as numbers or booleans keep their
    /// textual form, so `7.17: 7.17.3` yields the track name `"7.17"`.
    /// A missing section is treated as empty.
    ///
    /// 解析 JSON 或 YAML 格式的清单文档。
    /// 会被 YAML 读作数字或布尔值的键和值保留其文本形式。缺失的部分视为空。
    pub fn parse(document: &str) -> Result<Self, ManifestError> {
        let root: Value = serde_yaml::from_str(document)?;
        let root = match root {
            Value::Mapping(mapping) => mapping,
            Value::Null => return Ok(Self::default()),
            _ => return Err(ManifestError::NotAMapping),
        };

        let releases = parse_section(root.get("releases"), "releases")?;
        let snapshots = parse_section(root.get("snapshots"), "snapshots")?;
        Ok(Self::new(releases, snapshots))
    }
}

fn parse_section(
    value: Option<&Value>,
    section: &'static str,
) -> Result<ManifestSection, ManifestError> {
    let mapping = match value {
        None | Some(Value::Null) => return Ok(ManifestSection::default()),
        Some(Value::Mapping(mapping)) => mapping,
        Some(_) => return Err(ManifestError::SectionNotAMapping(section)),
    };

    let mut parsed = ManifestSection::default();
    for (key, version) in mapping {
        let name = scalar_text(key).ok_or(ManifestError::NonScalar {
            section,
            what: "key",
        })?;
        let version = scalar_text(version).ok_or(ManifestError::NonScalar {
            section,
            what: "value",
        })?;
        parsed.insert(name, version);
    }
    Ok(parsed)
}

/// Renders a YAML scalar as the text it was written as (modulo float normalization).
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        _ => None,
    }
}
