#[cfg(test)]
mod tests {
    use std::io::Write;

    use quip_config::QuipConfig;
    use quip_core::{ParamDefault, ParamValue};

    const EXAMPLE: &str = r##"
[connect]
server = "irc.example.net"
port = 6697
channels = ["#quip", "#bots"]
nickname = "quip"
ping_interval = 45

[scripts]
enable_default = true
enable_weather = false
markov_respond = "quip"
remind_tasklimit = 10
markov_listen = true

[logging]
level = "debug"
"##;

    fn parse(raw: &str) -> QuipConfig {
        toml::from_str(raw).expect("example config parses")
    }

    mod schema {
        use super::*;

        #[test]
        fn test_connect_section() {
            let config = parse(EXAMPLE);
            assert_eq!(config.connect.server, "irc.example.net");
            assert_eq!(config.connect.port, 6697);
            assert_eq!(config.connect.channels, vec!["#quip", "#bots"]);
            assert_eq!(config.connect.ping_interval, 45);
            // Unset keys fall back to defaults.
            assert_eq!(config.connect.reconnect_interval, 30);
            assert!(config.connect.reconnect);
        }

        #[test]
        fn test_script_enablement_with_default() {
            let config = parse(EXAMPLE);
            assert!(!config.scripts.enabled("weather").unwrap());
            // No explicit key — global default applies.
            assert!(config.scripts.enabled("markov").unwrap());
        }

        #[test]
        fn test_typed_accessors_and_fallbacks() {
            let config = parse(EXAMPLE);
            let scripts = &config.scripts;
            assert_eq!(scripts.get_str("markov_respond", "bot").unwrap(), "quip");
            assert_eq!(scripts.get_int("remind_tasklimit", 1000).unwrap(), 10);
            assert_eq!(scripts.get_int("remind_durlimit", 604800).unwrap(), 604800);
            assert!(scripts.get_bool("markov_listen", false).unwrap());
        }

        #[test]
        fn test_mistyped_key_is_an_error() {
            let config = parse(EXAMPLE);
            assert!(config.scripts.get_str("remind_tasklimit", "").is_err());
            assert!(config.scripts.get_bool("markov_respond", true).is_err());
        }

        #[test]
        fn test_resolve_param() {
            let config = parse(EXAMPLE);
            let value = config
                .scripts
                .resolve_param("markov", "respond", ParamDefault::Str("bot"))
                .unwrap();
            assert_eq!(value, ParamValue::Str("quip".into()));
            let value = config
                .scripts
                .resolve_param("remind", "durlimit", ParamDefault::Int(604800))
                .unwrap();
            assert_eq!(value, ParamValue::Int(604800));
        }

        #[test]
        fn test_validate_requires_server_and_channel() {
            let config = QuipConfig::default();
            assert!(config.validate().is_err());
            let config = parse(EXAMPLE);
            assert!(config.validate().is_ok());
        }
    }

    mod loader {
        use super::*;

        #[test]
        fn test_load_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(EXAMPLE.as_bytes()).unwrap();
            let config = quip_config::load(Some(file.path())).unwrap();
            assert_eq!(config.logging.level, "debug");
        }

        #[test]
        fn test_missing_file_is_fatal() {
            let dir = tempfile::tempdir().unwrap();
            let missing = dir.path().join("nope.toml");
            assert!(quip_config::load(Some(&missing)).is_err());
        }

        #[test]
        fn test_malformed_file_is_fatal() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(b"[connect\nserver=").unwrap();
            assert!(quip_config::load(Some(file.path())).is_err());
        }
    }
}
