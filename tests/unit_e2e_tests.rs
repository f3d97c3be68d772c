//! # E2E Module Unit Tests / E2E 模块单元测试
//!
//! The parts of the E2E driver that do not need a running stack.
//!
//! E2E 驱动中不需要运行技术栈的部分。

use stack_matrix::core::e2e::{
    distro_for, plugin_gem, BootstrapError, ProjectType, SUPPORTED_PROCESSORS,
};

#[cfg(test)]
mod e2e_tests {
    use super::*;

    #[test]
    fn test_project_type_parsing() {
        assert_eq!("on_prems".parse::<ProjectType>().unwrap(), ProjectType::OnPrems);
        assert_eq!("serverless".parse::<ProjectType>().unwrap(), ProjectType::Serverless);
        assert!(matches!(
            "cloud".parse::<ProjectType>(),
            Err(BootstrapError::UnknownProjectType(ref t)) if t == "cloud"
        ));
    }

    #[test]
    fn test_pipeline_config_file() {
        assert_eq!(ProjectType::OnPrems.pipeline_config_file(), "pipeline.conf");
        assert_eq!(
            ProjectType::Serverless.pipeline_config_file(),
            "serverless_pipeline.conf"
        );
    }

    #[test]
    fn test_distro_for() {
        assert_eq!(distro_for("linux").unwrap(), "linux_amd64.tar.gz");
        assert_eq!(distro_for("macos").unwrap(), "darwin_amd64.tar.gz");
        assert!(matches!(
            distro_for("windows"),
            Err(BootstrapError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn test_plugin_gem() {
        assert_eq!(
            plugin_gem("8.15.0"),
            "logstash-filter-elastic_integration-8.15.0-java.gem"
        );
    }

    #[test]
    fn test_supported_processors() {
        assert!(SUPPORTED_PROCESSORS.contains(&"grok"));
        assert!(SUPPORTED_PROCESSORS.contains(&"geoip"));
        assert!(!SUPPORTED_PROCESSORS.contains(&"inference"));
    }

    #[test]
    fn test_packages_failed_message() {
        let err = BootstrapError::PackagesFailed(vec!["nginx".to_string(), "tomcat".to_string()]);
        assert_eq!(err.to_string(), "following packages failed: [\"nginx\", \"tomcat\"]");
    }
}
