//! # Manifest Module Unit Tests / Manifest 模块单元测试
//!
//! Parsing of JSON and YAML release manifests into ordered sections.
//!
//! 将 JSON 和 YAML 发布清单解析为有序部分的测试。

mod common;

use stack_matrix::core::manifest::{ManifestError, ManifestSection, ReleaseManifest};

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn test_parse_yaml_keeps_document_order() {
        let manifest = common::sample_manifest();

        let keys: Vec<&str> = manifest.snapshots.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["7.current", "8.previous", "8.current", "8.future", "main"]
        );
        assert_eq!(manifest.releases.len(), 3);
        assert_eq!(manifest.releases.get("8.current"), Some("8.15.2"));
        assert_eq!(manifest.snapshots.get("main"), Some("9.0.0-SNAPSHOT"));
    }

    #[test]
    fn test_parse_json_document() {
        let document = std::fs::read_to_string(common::fixture_path("releases_without_main.json")).unwrap();
        let manifest = ReleaseManifest::parse(&document).unwrap();

        assert_eq!(manifest.releases.get("8.current"), Some("8.15.2"));
        assert_eq!(manifest.snapshots.get("8.current"), Some("8.15.3-SNAPSHOT"));
        assert!(manifest.snapshots.get("main").is_none());
    }

    #[test]
    fn test_unquoted_numeric_keys_become_text() {
        let manifest = ReleaseManifest::parse("releases:\n  8.15: 8.15.2\n  9: 9.0.0\n").unwrap();

        assert_eq!(manifest.releases.get("8.15"), Some("8.15.2"));
        assert_eq!(manifest.releases.get("9"), Some("9.0.0"));
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let manifest = ReleaseManifest::parse("releases:\n  8.current: 8.15.2\n").unwrap();
        assert!(manifest.snapshots.is_empty());

        let empty = ReleaseManifest::parse("").unwrap();
        assert_eq!(empty, ReleaseManifest::default());
    }

    #[test]
    fn test_rejects_non_mapping_root() {
        let err = ReleaseManifest::parse("- 8.15.2\n- 8.14.3\n").unwrap_err();
        assert!(matches!(err, ManifestError::NotAMapping));
    }

    #[test]
    fn test_rejects_non_mapping_section() {
        let err = ReleaseManifest::parse("snapshots: [8.15.3]\n").unwrap_err();
        assert!(matches!(err, ManifestError::SectionNotAMapping("snapshots")));
    }

    #[test]
    fn test_rejects_nested_values() {
        let err = ReleaseManifest::parse("releases:\n  8.current:\n    - 8.15.2\n").unwrap_err();
        assert!(matches!(
            err,
            ManifestError::NonScalar {
                section: "releases",
                what: "value"
            }
        ));
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = ReleaseManifest::parse("releases: {8.current: ").unwrap_err();
        assert!(matches!(err, ManifestError::Syntax(_)));
    }
}

#[cfg(test)]
mod section_tests {
    use super::*;

    #[test]
    fn test_from_pairs_replaces_duplicates_in_place() {
        let section = ManifestSection::from_pairs([
            ("8.previous", "8.14.3"),
            ("8.current", "8.15.1"),
            ("8.previous", "8.14.4"),
        ]);

        let entries: Vec<(&str, &str)> = section.iter().collect();
        assert_eq!(entries, vec![("8.previous", "8.14.4"), ("8.current", "8.15.1")]);
    }
}
