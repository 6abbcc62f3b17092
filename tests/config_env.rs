use latency_proxy::{MonitorConfig, MonitorError, NamingPolicy, TimeUnit};

// Every environment case lives in one test so nothing races on the
// process environment.
#[test]
fn environment_overrides() {
    for var in [
        "LATENCY_MONITOR_NAME",
        "LATENCY_SAMPLE_SIZE",
        "LATENCY_TIME_UNIT",
        "LATENCY_EAGER",
        "LATENCY_NAMING",
    ] {
        std::env::remove_var(var);
    }
    assert_eq!(MonitorConfig::from_env().unwrap(), MonitorConfig::default());

    std::env::set_var("LATENCY_MONITOR_NAME", "orders");
    std::env::set_var("LATENCY_SAMPLE_SIZE", "25");
    std::env::set_var("LATENCY_TIME_UNIT", "us");
    std::env::set_var("LATENCY_EAGER", "false");
    std::env::set_var("LATENCY_NAMING", "method-name");
    let config = MonitorConfig::from_env().unwrap();
    assert_eq!(config.name, "orders");
    assert_eq!(config.sample_size, 25);
    assert_eq!(config.unit, TimeUnit::Microseconds);
    assert!(!config.add_all_monitors_at_startup);
    assert_eq!(config.naming, NamingPolicy::MethodName);

    std::env::set_var("LATENCY_SAMPLE_SIZE", "0");
    assert!(matches!(
        MonitorConfig::from_env(),
        Err(MonitorError::InvalidConfiguration(_))
    ));

    std::env::set_var("LATENCY_SAMPLE_SIZE", "10");
    std::env::set_var("LATENCY_NAMING", "com.example.CustomNaming");
    assert!(matches!(
        MonitorConfig::from_env(),
        Err(MonitorError::InvalidConfiguration(_))
    ));
}
