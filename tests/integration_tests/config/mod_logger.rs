use natours::config::LogConfig;
use natours::logger::{AUDIT_TARGET, configure_from_config};
use tempfile::tempdir;

#[test]
fn rolling_files_are_created() {
    let dir = tempdir().unwrap();
    let logs = dir.path().join("logs");
    let cfg = LogConfig { dir: Some(logs.clone()), level: "info".into(), retention: 2 };
    configure_from_config(&cfg).unwrap();
    log::info!("started");
    log::info!(target: AUDIT_TARGET, "create Tour");
    log::logger().flush();
    assert!(logs.join("app.log").exists());
    assert!(logs.join("audit.log").exists());
}
