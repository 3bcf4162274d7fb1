use std::path::PathBuf;
use std::time::Duration;
use vigil_monitor::{
    ErrorLevel, ErrorTrackingConfig, HealthStatus, MetricConfig, Monitoring, MonitoringConfig,
};

fn monitoring() -> Monitoring {
    Monitoring::new(MonitoringConfig::default()).unwrap()
}

#[tokio::test]
async fn test_init_and_shutdown_lifecycle() {
    let monitoring = monitoring();

    monitoring.init().unwrap();
    assert!(monitoring.init().is_err(), "double init must fail");

    monitoring.shutdown();
    monitoring.init().unwrap();
    monitoring.shutdown();
}

#[tokio::test]
async fn test_init_enables_disabled_stores() {
    let monitoring = Monitoring::new(MonitoringConfig {
        errors: ErrorTrackingConfig {
            enabled: false,
            ..ErrorTrackingConfig::default()
        },
        metrics: MetricConfig {
            enabled: false,
            ..MetricConfig::default()
        },
    })
    .unwrap();

    monitoring.init().unwrap();
    assert!(monitoring.errors().is_enabled());
    assert!(monitoring.performance().is_enabled());
    monitoring.shutdown();
}

#[tokio::test]
async fn test_system_health_document() {
    let monitoring = monitoring();

    let timer = monitoring.timer("select", Some("db.query"), None);
    tokio::time::sleep(Duration::from_millis(5)).await;
    timer.end(true, None);

    let id = monitoring
        .errors()
        .track_error(ErrorLevel::Error, "disk write failed", None, None);
    monitoring.errors().resolve_error(id, None);

    let health = monitoring.system_health();
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.performance.total_operations, 1);
    assert!(health.performance.slowest_operation.contains("select"));
    assert_eq!(health.errors.total_errors, 1);
    assert_eq!(health.errors.resolved_count, 1);

    // The document must serialize into a plain key/value structure
    let value = serde_json::to_value(&health).unwrap();
    assert_eq!(value["status"], "healthy");
    assert_eq!(value["performance"]["total_operations"], 1);
    assert_eq!(value["errors"]["resolved_count"], 1);
}

#[tokio::test]
async fn test_system_health_degrades_on_unresolved_errors() {
    let monitoring = monitoring();

    monitoring
        .errors()
        .track_error(ErrorLevel::Error, "disk write failed", None, None);

    assert_eq!(monitoring.system_health().status, HealthStatus::Degraded);
}

#[tokio::test]
async fn test_system_health_without_data() {
    let health = monitoring().system_health();
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.performance.slowest_operation, "N/A");
    assert_eq!(health.performance.success_rate, 1.0);
    assert_eq!(health.errors.total_errors, 0);
}

#[tokio::test]
async fn test_with_tracking_success() {
    let monitoring = monitoring();

    let result: Result<u32, std::io::Error> = monitoring
        .with_tracking("load_settings", async { Ok(42) })
        .await;

    assert_eq!(result.unwrap(), 42);

    let samples = monitoring.performance().get_metrics(Some("function"), None);
    assert_eq!(samples.len(), 1);
    assert!(samples[0].success);
    assert_eq!(samples[0].operation, "load_settings");
}

#[tokio::test]
async fn test_with_tracking_failure_propagates_error() {
    let monitoring = monitoring();

    let result: Result<u32, String> = monitoring
        .with_tracking("flaky_call", async { Err("upstream unreachable".to_string()) })
        .await;

    assert_eq!(result.unwrap_err(), "upstream unreachable");

    let samples = monitoring.performance().get_metrics(Some("function"), None);
    assert_eq!(samples.len(), 1);
    assert!(!samples[0].success);
    assert_eq!(
        samples[0].metadata.as_ref().unwrap().get("reason"),
        Some(&serde_json::json!("upstream unreachable"))
    );
}

#[tokio::test]
async fn test_current_metrics_via_facade() {
    let monitoring = monitoring();
    monitoring.performance().record_metric("tick", 1.0, None);

    let current = monitoring.current_metrics();
    assert_eq!(current.total_operations, 1);
    assert!(!current.platform.is_empty());
}

fn temp_config_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("vigil-monitor-{}-{name}", std::process::id()))
}

#[test]
fn test_config_from_toml_file() {
    let path = temp_config_path("config.toml");
    std::fs::write(
        &path,
        concat!(
            "[errors]\n",
            "max_errors = 50\n",
            "retention_days = 7\n",
            "\n",
            "[metrics]\n",
            "aggregation_window_ms = 5000\n",
        ),
    )
    .unwrap();

    let config = MonitoringConfig::from_file(&path).unwrap();
    assert_eq!(config.errors.max_errors, 50);
    assert_eq!(config.errors.retention_days, 7);
    assert!(config.errors.enabled, "unset fields take defaults");
    assert_eq!(config.metrics.aggregation_window_ms, 5000);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_config_file_rejects_invalid_values() {
    let path = temp_config_path("invalid.toml");
    std::fs::write(&path, "[errors]\nmax_errors = 0\n").unwrap();

    assert!(MonitoringConfig::from_file(&path).is_err());

    std::fs::remove_file(&path).ok();
}
