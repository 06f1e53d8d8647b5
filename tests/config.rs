// ABOUTME: Integration tests for configuration parsing and discovery.
// ABOUTME: Tests YAML parsing, file lookup order and environment overrides.

use enginewire::config::*;
use enginewire::error::Error;
use enginewire::stream::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_READ_SIZE, RAW_STREAM};
use std::fs;

mod parsing {
    use super::*;

    #[test]
    fn parse_full_config() {
        let yaml = r#"
raw_stream_content_type: application/x-engine-stream
max_frame_size: 1048576
read_size: 512
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.raw_stream_content_type, "application/x-engine-stream");
        assert_eq!(config.max_frame_size, 1_048_576);
        assert_eq!(config.read_size, 512);
    }

    #[test]
    fn empty_document_is_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.raw_stream_content_type, RAW_STREAM);
        assert_eq!(config.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(config.read_size, DEFAULT_READ_SIZE);
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = Config::from_yaml("max_frame: 10\n").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn empty_content_type_rejected() {
        let err = Config::from_yaml("raw_stream_content_type: \"\"\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn decode_options_carry_values() {
        let config = Config::from_yaml("read_size: 64\nmax_frame_size: 128\n").unwrap();
        let opts = config.decode_options();
        assert_eq!(opts.read_size, 64);
        assert_eq!(opts.max_frame_size, 128);
        assert_eq!(opts.raw_stream_content_type, RAW_STREAM);
    }
}

mod discovery {
    use super::*;

    #[test]
    fn defaults_when_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn finds_primary_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "read_size: 100\n").unwrap();
        assert_eq!(Config::discover(dir.path()).unwrap().read_size, 100);
    }

    #[test]
    fn primary_file_wins_over_alternatives() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "read_size: 1\n").unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_ALT), "read_size: 2\n").unwrap();
        assert_eq!(Config::discover(dir.path()).unwrap().read_size, 1);
    }

    #[test]
    fn finds_config_in_dot_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".enginewire")).unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_DIR), "read_size: 3\n").unwrap();
        assert_eq!(Config::discover(dir.path()).unwrap().read_size, 3);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }
}

mod environment {
    use super::*;

    #[test]
    fn env_overrides_file_values() {
        temp_env::with_vars(
            [
                (ENV_RAW_STREAM_TYPE, Some("application/x-custom")),
                (ENV_MAX_FRAME_SIZE, Some("2048")),
                (ENV_READ_SIZE, None),
            ],
            || {
                let config = Config::from_yaml("read_size: 16\n")
                    .unwrap()
                    .apply_env()
                    .unwrap();
                assert_eq!(config.raw_stream_content_type, "application/x-custom");
                assert_eq!(config.max_frame_size, 2048);
                assert_eq!(config.read_size, 16);
            },
        );
    }

    #[test]
    fn blank_env_values_ignored() {
        temp_env::with_var(ENV_READ_SIZE, Some("  "), || {
            let config = Config::default().apply_env().unwrap();
            assert_eq!(config.read_size, DEFAULT_READ_SIZE);
        });
    }

    #[test]
    fn invalid_env_value_rejected() {
        temp_env::with_var(ENV_MAX_FRAME_SIZE, Some("lots"), || {
            let err = Config::default().apply_env().unwrap_err();
            assert!(
                matches!(err, Error::InvalidConfig(ref msg) if msg.contains(ENV_MAX_FRAME_SIZE))
            );
        });
    }

    #[test]
    fn zero_read_size_from_env_rejected() {
        temp_env::with_var(ENV_READ_SIZE, Some("0"), || {
            let err = Config::default().apply_env().unwrap_err();
            assert!(matches!(err, Error::InvalidConfig(_)));
        });
    }
}
