#[cfg(test)]
mod tests {
    use super::super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_dashboard_intervals() {
        let config = Config::default();
        assert_eq!(config.polling.students_ms, 5_000);
        assert_eq!(config.polling.detail_ms, 3_000);
        assert_eq!(config.polling.config_ms, 30_000);
        assert_eq!(config.polling.violations_count, 100);
        assert_eq!(config.realtime.events_reconnect_ms, 4_000);
        assert_eq!(config.realtime.screen_reconnect_ms, 3_000);
        assert_eq!(config.server.proxy_prefix, "/api/teacher");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml_str(
            r#"
            [backend]
            url = "http://10.0.0.5:8080"

            [polling]
            students_ms = 2000
            "#,
        ).unwrap();
        assert_eq!(config.backend.url, "http://10.0.0.5:8080");
        assert_eq!(config.backend.api_path, "/api");
        assert_eq!(config.polling.students_ms, 2_000);
        assert_eq!(config.polling.violations_ms, 5_000);
    }

    #[test]
    fn test_yaml_config() {
        let config = Config::from_yaml_str("server:\n  bind: 127.0.0.1:9000\n").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.backend.url, "http://localhost:8080");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TEACHER_API_URL", "https://teacher.school.lan"),
            ("CLASSWATCH_BIND", "127.0.0.1:4000"),
            ("CLASSWATCH_SCREEN_WS", ""),
        ].into_iter().collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend.url, "https://teacher.school.lan");
        assert_eq!(config.server.bind, "127.0.0.1:4000");
        assert_eq!(config.backend.screen_ws_url, None, "empty override must be ignored");
    }

    #[test]
    fn test_ws_urls_derive_from_backend_origin() {
        let mut config = Config::default();
        config.backend.url = "http://10.10.64.215:8080".to_string();
        assert_eq!(config.events_ws_url().unwrap().as_str(), "ws://10.10.64.215:8080/ws");
        assert_eq!(
            config.screen_ws_url().unwrap().as_str(),
            "ws://10.10.64.215:8080/ws/screen/view"
        );

        config.backend.url = "https://teacher.school.lan/ignored?x=1".to_string();
        assert_eq!(config.events_ws_url().unwrap().as_str(), "wss://teacher.school.lan/ws");
    }

    #[test]
    fn test_explicit_ws_url_wins() {
        let mut config = Config::default();
        config.backend.events_ws_url = Some("ws://relay.lan:9001/events".to_string());
        assert_eq!(config.events_ws_url().unwrap().as_str(), "ws://relay.lan:9001/events");

        config.backend.events_ws_url = Some("http://relay.lan/events".to_string());
        assert!(matches!(config.events_ws_url(), Err(ConfigError::Scheme { .. })));
    }

    #[test]
    fn test_api_base_appends_api_path() {
        let mut config = Config::default();
        config.backend.url = "http://10.0.0.5:8080".to_string();
        assert_eq!(config.api_base().unwrap().as_str(), "http://10.0.0.5:8080/api");
    }

    #[test]
    fn test_validate_rejects_zero_interval_and_bad_url() {
        let mut config = Config::default();
        config.polling.config_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroValue("polling.config_ms"))));

        let mut config = Config::default();
        config.backend.url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Url { .. })));

        let mut config = Config::default();
        config.backend.url = "ftp://teacher".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Scheme { .. })));
    }
}
