//! # Node Stats Module / 节点统计模块
//!
//! Reads the parts of the Logstash node stats document the E2E run relies on
//! and checks the plugin's throughput between two samples. The previous
//! sample is always passed in by the caller; nothing is remembered here.
//!
//! 读取 E2E 运行所依赖的 Logstash 节点统计文档的相关部分，
//! 并检查插件在两次采样之间的吞吐量。上一次的采样总是由调用者传入。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Filter plugin name as it appears in the pipeline stats.
pub const INTEGRATION_FILTER_NAME: &str = "elastic_integration";
pub const MAIN_PIPELINE: &str = "main";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ThroughputError {
    #[error("node stats do not contain pipeline `{0}`")]
    MissingPipeline(String),

    #[error("could not fetch elastic integration plugin stats")]
    MissingPluginStats,

    #[error("plugin stats have no readable `events` counters")]
    MalformedCounters,

    #[error("events not processed, events, in: {}, out: {}", .0.in_events, .0.out_events)]
    NothingProcessed(EventDelta),

    #[error("processed events are not equal, events, in: {}, out: {}", .0.in_events, .0.out_events)]
    Unbalanced(EventDelta),
}

/// Cumulative event counters of the integration filter.
/// 集成过滤器的累计事件计数器。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounters {
    #[serde(rename = "in", default)]
    pub events_in: u64,
    #[serde(rename = "out", default)]
    pub events_out: u64,
}

/// Events seen between two samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventDelta {
    pub in_events: i64,
    pub out_events: i64,
}

impl EventDelta {
    /// `current - previous` for both counters.
    pub fn between(previous: EventCounters, current: EventCounters) -> Self {
        Self {
            in_events: current.events_in as i64 - previous.events_in as i64,
            out_events: current.events_out as i64 - previous.events_out as i64,
        }
    }
}

impl fmt::Display for EventDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in: {}, out: {}", self.in_events, self.out_events)
    }
}

/// Result of a throughput check that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThroughputReport {
    pub delta: EventDelta,
    /// Anomalies tolerated because the system test passed.
    pub warnings: Vec<ThroughputError>,
    /// The sample to use as `previous` for the next package.
    pub baseline: EventCounters,
}

/// Compares two samples of the integration filter counters.
///
/// When nothing came out, or more went in than came out, the package fails if
/// its system test failed too; otherwise the anomaly is downgraded to a
/// warning, since the ingest pipeline may legitimately drop events.
///
/// 比较集成过滤器计数器的两次采样。
/// 当没有事件输出或输入输出不相等时，如果系统测试也失败则该包失败；
/// 否则该异常降级为警告。
pub fn analyze_throughput(
    previous: EventCounters,
    current: EventCounters,
    system_test_passed: bool,
) -> Result<ThroughputReport, ThroughputError> {
    let delta = EventDelta::between(previous, current);
    let mut warnings = Vec::new();

    if delta.out_events == 0 {
        let anomaly = ThroughputError::NothingProcessed(delta);
        if !system_test_passed {
            return Err(anomaly);
        }
        warnings.push(anomaly);
    }
    if delta.in_events != delta.out_events {
        let anomaly = ThroughputError::Unbalanced(delta);
        if !system_test_passed {
            return Err(anomaly);
        }
        warnings.push(anomaly);
    }

    Ok(ThroughputReport {
        delta,
        warnings,
        baseline: current,
    })
}

fn pipeline<'a>(stats: &'a Value, name: &str) -> Result<&'a Value, ThroughputError> {
    stats
        .get("pipelines")
        .and_then(|pipelines| pipelines.get(name))
        .ok_or_else(|| ThroughputError::MissingPipeline(name.to_string()))
}

/// Extracts the integration filter counters of the main pipeline.
/// 提取主流水线中集成过滤器的计数器。
pub fn integration_counters(stats: &Value) -> Result<EventCounters, ThroughputError> {
    let filter = pipeline(stats, MAIN_PIPELINE)?
        .get("plugins")
        .and_then(|plugins| plugins.get("filters"))
        .and_then(Value::as_array)
        .and_then(|filters| {
            filters
                .iter()
                .find(|filter| filter.get("name").and_then(Value::as_str) == Some(INTEGRATION_FILTER_NAME))
        })
        .ok_or(ThroughputError::MissingPluginStats)?;

    let events = filter
        .get("events")
        .ok_or(ThroughputError::MalformedCounters)?;
    serde_json::from_value(events.clone()).map_err(|_| ThroughputError::MalformedCounters)
}

/// Successful reloads of the main pipeline, if the pipeline is running.
pub fn reload_successes(stats: &Value) -> Option<u64> {
    pipeline(stats, MAIN_PIPELINE)
        .ok()
        .map(|main| {
            main.get("reloads")
                .and_then(|reloads| reloads.get("successes"))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        })
}
