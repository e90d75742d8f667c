use figment::providers::{Format, Serialized, Toml};
use figment::{Figment, Jail};
use psamfinder::config::{ConfigError, ConfigOverrides, Settings};
use psamfinder::scanner::{DigestAlgorithm, PerceptualAlgorithm};
use tempfile::tempdir;

fn to_figment_err(e: ConfigError) -> figment::Error {
    figment::Error::from(e.to_string())
}

#[test]
fn test_config_load_from_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("psamfinder.toml");
    std::fs::write(
        &path,
        r#"
similarity_threshold = 0.92
max_images = 50
hash_algorithm = "blake3"
perceptual_algorithm = "ahash"
skip_hidden = true
"#,
    )
    .unwrap();

    // Figment directly, so environment variables from other tests do not leak in.
    let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(&path));
    let settings = Settings::from_figment(&figment).unwrap();

    assert_eq!(settings.similarity_threshold, 0.92);
    assert_eq!(settings.max_images, 50);
    assert_eq!(settings.hash_algorithm, DigestAlgorithm::Blake3);
    assert_eq!(settings.perceptual_algorithm, PerceptualAlgorithm::Ahash);
    assert!(settings.skip_hidden);
    assert_eq!(settings.io_threads, 4);
    assert!(!settings.use_trash);
}

#[test]
fn test_flags_beat_env_beat_file() {
    Jail::expect_with(|jail| {
        jail.create_file("custom.toml", "io_threads = 2\nuse_trash = true\nmax_images = 10")?;
        jail.set_env("PSAMFINDER_IO_THREADS", "6");
        jail.set_env("PSAMFINDER_MAX_IMAGES", "20");

        let path = jail.directory().join("custom.toml");
        let overrides = ConfigOverrides {
            max_images: Some(30),
            ..ConfigOverrides::default()
        };
        let settings = Settings::load(Some(&path), &overrides).map_err(to_figment_err)?;

        assert_eq!(settings.max_images, 30);
        assert_eq!(settings.io_threads, 6);
        assert!(settings.use_trash);
        Ok(())
    });
}

#[test]
fn test_unset_overrides_leave_lower_layers() {
    Jail::expect_with(|jail| {
        jail.create_file("custom.toml", "similarity_threshold = 0.7")?;
        let path = jail.directory().join("custom.toml");

        let settings =
            Settings::load(Some(&path), &ConfigOverrides::default()).map_err(to_figment_err)?;
        assert_eq!(settings.similarity_threshold, 0.7);
        assert_eq!(settings.hash_algorithm, DigestAlgorithm::Sha256);
        Ok(())
    });
}

#[test]
fn test_invalid_values_rejected() {
    Jail::expect_with(|jail| {
        let path = jail.directory().join("custom.toml");

        jail.create_file("custom.toml", "similarity_threshold = 1.5")?;
        let err = Settings::load(Some(&path), &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold(t) if t == 1.5));

        jail.create_file("custom.toml", "io_threads = 0")?;
        let err = Settings::load(Some(&path), &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIoThreads));

        jail.create_file("custom.toml", "hash_algorithm = \"md5\"")?;
        let err = Settings::load(Some(&path), &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)));
        Ok(())
    });
}

#[test]
fn test_missing_explicit_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.toml");
    let err = Settings::load(Some(&path), &ConfigOverrides::default()).unwrap_err();
    assert!(matches!(err, ConfigError::MissingFile(p) if p == path));
}
