use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with `SHELFNET_` environment overrides.
///
/// Relative library locations, including the defaults, are taken relative to
/// the directory holding the file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let mut config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("SHELFNET_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    if let Some(base) = path.parent() {
        config.library.resolve_relative_to(base);
    }
    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[library]
download_dir = "/srv/books"

[network]
timeout_secs = 10
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.library.download_dir.to_str().unwrap(), "/srv/books");
        assert_eq!(config.network.timeout_secs, 10);
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[network]
timeout_secs = "soon"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/shelfnet.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_relative_library_paths_follow_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("shelfnet.toml");
        std::fs::write(
            &path,
            r#"
[library]
download_dir = "books"
database = "/var/lib/shelfnet/library.db"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.library.download_dir, dir.path().join("books"));
        assert_eq!(config.library.catalog_dir, dir.path().join("catalogs"));
        assert_eq!(
            config.library.database,
            Path::new("/var/lib/shelfnet/library.db")
        );
    }

    #[test]
    fn test_load_config_from_str_keeps_relative_paths() {
        let config = load_config_from_str("[library]\ndownload_dir = \"books\"\n").unwrap();
        assert_eq!(config.library.download_dir, Path::new("books"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[library]
catalog_dir = "/etc/shelfnet/catalogs"

[bookstore]
title = "LitRes"
site_name = "litres.ru"
catalog_url = "http://robot.litres.ru/pages"
secure_url = "https://robot.litres.ru/pages"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(
            config.library.catalog_dir.to_str().unwrap(),
            "/etc/shelfnet/catalogs"
        );
        let bookstore = config.bookstore.unwrap();
        assert_eq!(bookstore.site_name, "litres.ru");
        assert!(bookstore.enabled);
    }
}
