//! # File System Module Unit Tests / 文件系统模块单元测试
//!
//! Profile config rewriting, plugin version reading and the ingest processor scan.
//!
//! 配置重写、插件版本读取以及 ingest 处理器扫描。

use stack_matrix::core::e2e::SUPPORTED_PROCESSORS;
use stack_matrix::infra::fs::{
    enable_logstash, find_unsupported_processors, read_plugin_version,
    write_profile_config,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_pipeline(root: &Path, package: &str, data_stream: &str, content: &str) {
    let dir = root
        .join("integrations/packages")
        .join(package)
        .join("data_stream")
        .join(data_stream)
        .join("elasticsearch/ingest_pipeline");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("default.yml"), content).unwrap();
}

#[cfg(test)]
mod profile_tests {
    use super::*;

    #[test]
    fn test_enable_logstash_uncomments_only_the_switch() {
        let example = "stack.geoip_dir: /tmp\n# stack.logstash_enabled: true\n# stack.self_monitor_enabled: false\n";
        let expected = "stack.geoip_dir: /tmp\nstack.logstash_enabled: true\n# stack.self_monitor_enabled: false\n";
        assert_eq!(enable_logstash(example), expected);
    }

    #[test]
    fn test_enable_logstash_keeps_missing_trailing_newline() {
        assert_eq!(
            enable_logstash("  #stack.logstash_enabled: true"),
            "stack.logstash_enabled: true"
        );
    }

    #[test]
    fn test_write_profile_config() {
        let dir = tempdir().unwrap();
        let example = dir.path().join("config.yml.example");
        let config = dir.path().join("config.yml");
        fs::write(&example, "# stack.logstash_enabled: true\n").unwrap();

        write_profile_config(&example, &config).unwrap();
        assert_eq!(fs::read_to_string(config).unwrap(), "stack.logstash_enabled: true\n");
    }

    #[test]
    fn test_read_plugin_version() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("VERSION");

        fs::write(&file, "  8.15.0\n").unwrap();
        assert_eq!(read_plugin_version(&file).unwrap(), "8.15.0");

        fs::write(&file, "\n").unwrap();
        assert!(read_plugin_version(&file).is_err());
        assert!(read_plugin_version(&dir.path().join("missing")).is_err());
    }
}

#[cfg(test)]
mod processor_scan_tests {
    use super::*;

    #[test]
    fn test_supported_processors_pass() {
        let dir = tempdir().unwrap();
        write_pipeline(
            dir.path(),
            "nginx",
            "access",
            "processors:\n  - set:\n      field: a\n      value: b\n  - grok:\n      field: message\n",
        );

        let unsupported = find_unsupported_processors(dir.path(), SUPPORTED_PROCESSORS).unwrap();
        assert!(unsupported.is_empty());
    }

    #[test]
    fn test_unsupported_processors_are_grouped() {
        let dir = tempdir().unwrap();
        write_pipeline(
            dir.path(),
            "nginx",
            "access",
            "processors:\n  - inference:\n      model_id: x\n  - set:\n      field: a\n",
        );
        write_pipeline(
            dir.path(),
            "apache",
            "error",
            "processors:\n  - inference:\n      model_id: y\n  - enrich:\n      policy_name: p\n",
        );

        let unsupported = find_unsupported_processors(dir.path(), SUPPORTED_PROCESSORS).unwrap();
        let names: Vec<&str> = unsupported.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["enrich", "inference"]);
        assert_eq!(unsupported["inference"].len(), 2);
        assert_eq!(unsupported["enrich"].len(), 1);
    }

    #[test]
    fn test_unparsable_files_are_skipped() {
        let dir = tempdir().unwrap();
        write_pipeline(dir.path(), "broken", "logs", "processors: [unclosed\n");
        write_pipeline(dir.path(), "empty", "logs", "description: no processors here\n");

        let unsupported = find_unsupported_processors(dir.path(), SUPPORTED_PROCESSORS).unwrap();
        assert!(unsupported.is_empty());
    }
}
