/*!
 * Tests for configuration loading and language defaults
 */

use anyhow::Result;

use po_translate::app_config::{Config, LogLevel, TranslationProvider};
use po_translate::language_utils::language_from_env;
use crate::common;

#[test]
fn test_from_file_withPartialJson_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "source_language": "en",
            "target_language": "pt-BR",
            "translation": {
                "provider": "deepl-free",
                "available_providers": [
                    { "type": "deepl-free", "api_key": "secret" }
                ]
            },
            "run": { "batch_size": 25, "skip_fuzzy": true },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::from_file(&path)?;
    assert_eq!(config.translation.provider, TranslationProvider::DeepLFree);
    assert_eq!(config.translation.get_api_key(), "secret");
    assert_eq!(config.translation.get_endpoint(), "https://api-free.deepl.com");
    assert_eq!(config.run.batch_size, 25);
    assert!(config.run.skip_fuzzy);
    assert!(config.run.recursive);
    assert_eq!(config.translation.common.retry_count, 3);
    assert_eq!(config.log_level, LogLevel::Debug);
    config.validate()?;
    Ok(())
}

#[test]
fn test_from_file_withInvalidJson_shouldNameTheFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "broken.json", "{ not json")?;
    let err = Config::from_file(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("broken.json"));
    Ok(())
}

#[test]
fn test_validate_withEachService_shouldOnlyRequireKeysWhereNeeded() {
    for provider in TranslationProvider::ALL {
        let mut config = common::test_config();
        config.translation.provider = provider;
        assert_eq!(config.validate().is_err(), provider.requires_api_key(), "{}", provider);
    }
}

#[test]
fn test_language_from_env_withVariousLocales_shouldPickPrimaryLanguage() {
    assert_eq!(language_from_env(Some("de_DE.UTF-8"), None).as_deref(), Some("de"));
    assert_eq!(language_from_env(Some("sv_SE"), Some("fr_FR")).as_deref(), Some("sv"));
    assert_eq!(language_from_env(None, Some("fr_FR.UTF-8")).as_deref(), Some("fr"));
    assert_eq!(language_from_env(Some(""), Some("nb_NO")).as_deref(), Some("nb"));
    assert_eq!(language_from_env(Some("C"), None), None);
    assert_eq!(language_from_env(Some("POSIX"), None), None);
    assert_eq!(language_from_env(None, None), None);
}
