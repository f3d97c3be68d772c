//! # Stats Module Unit Tests / Stats 模块单元测试
//!
//! Reading counters out of node stats and the throughput check between samples.
//!
//! 从节点统计中读取计数器，以及两次采样之间的吞吐量检查。

use serde_json::json;
use stack_matrix::core::stats::{
    analyze_throughput, integration_counters, reload_successes, EventCounters, EventDelta,
    ThroughputError,
};

fn counters(events_in: u64, events_out: u64) -> EventCounters {
    EventCounters {
        events_in,
        events_out,
    }
}

fn node_stats(filters: serde_json::Value) -> serde_json::Value {
    json!({
        "pipelines": {
            "main": {
                "reloads": { "successes": 3, "failures": 0 },
                "plugins": { "filters": filters }
            }
        }
    })
}

#[cfg(test)]
mod throughput_tests {
    use super::*;

    #[test]
    fn test_balanced_throughput_passes() {
        let report = analyze_throughput(counters(10, 10), counters(25, 25), true).unwrap();
        assert_eq!(
            report.delta,
            EventDelta {
                in_events: 15,
                out_events: 15
            }
        );
        assert!(report.warnings.is_empty());
        assert_eq!(report.baseline, counters(25, 25));
    }

    #[test]
    fn test_nothing_processed_fails_after_failed_system_test() {
        let err = analyze_throughput(counters(10, 10), counters(10, 10), false).unwrap_err();
        assert!(matches!(err, ThroughputError::NothingProcessed(_)));
    }

    #[test]
    fn test_unbalanced_fails_after_failed_system_test() {
        let err = analyze_throughput(counters(0, 0), counters(20, 18), false).unwrap_err();
        assert_eq!(
            err,
            ThroughputError::Unbalanced(EventDelta {
                in_events: 20,
                out_events: 18
            })
        );
        assert_eq!(err.to_string(), "processed events are not equal, events, in: 20, out: 18");
    }

    #[test]
    fn test_anomalies_are_warnings_after_passed_system_test() {
        let report = analyze_throughput(counters(5, 5), counters(9, 5), true).unwrap();
        assert_eq!(report.warnings.len(), 2);
        assert!(matches!(report.warnings[0], ThroughputError::NothingProcessed(_)));
        assert!(matches!(report.warnings[1], ThroughputError::Unbalanced(_)));
    }

    #[test]
    fn test_report_with_warnings_can_be_kept() {
        let report = analyze_throughput(counters(0, 0), counters(3, 0), true).unwrap();
        let kept = report.clone();
        assert_eq!(kept, report);
        assert_eq!(kept.warnings.len(), 2);
    }

    #[test]
    fn test_failed_system_test_with_good_throughput_passes() {
        let report = analyze_throughput(counters(0, 0), counters(7, 7), false).unwrap();
        assert!(report.warnings.is_empty());
    }
}

#[cfg(test)]
mod node_stats_tests {
    use super::*;

    #[test]
    fn test_integration_counters() {
        let stats = node_stats(json!([
            { "name": "mutate", "events": { "in": 99, "out": 99 } },
            { "name": "elastic_integration", "events": { "in": 42, "out": 40 } }
        ]));
        assert_eq!(integration_counters(&stats).unwrap(), counters(42, 40));
    }

    #[test]
    fn test_missing_plugin() {
        let stats = node_stats(json!([{ "name": "mutate", "events": { "in": 1, "out": 1 } }]));
        assert_eq!(
            integration_counters(&stats).unwrap_err(),
            ThroughputError::MissingPluginStats
        );
    }

    #[test]
    fn test_missing_pipeline() {
        let err = integration_counters(&json!({ "pipelines": {} })).unwrap_err();
        assert_eq!(err, ThroughputError::MissingPipeline("main".to_string()));
    }

    #[test]
    fn test_malformed_counters() {
        let stats = node_stats(json!([{ "name": "elastic_integration", "events": { "in": "many" } }]));
        assert_eq!(
            integration_counters(&stats).unwrap_err(),
            ThroughputError::MalformedCounters
        );
    }

    #[test]
    fn test_reload_successes() {
        assert_eq!(reload_successes(&node_stats(json!([]))), Some(3));
        assert_eq!(reload_successes(&json!({ "pipelines": { "main": {} } })), Some(0));
        assert_eq!(reload_successes(&json!({})), None);
    }
}
