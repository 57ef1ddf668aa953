use anyhow::Result;
use comfyfetch_core::{Config, ModelCategory};

pub async fn execute(key: Option<&str>, value: Option<&str>) -> Result<()> {
    let mut config = Config::load()?;

    match (key, value) {
        // Show all config
        (None, None) => {
            println!("Configuration file: {:?}\n", Config::config_path()?);
            println!("[paths]");
            println!("  base_path = {:?}", config.paths.base_path.display().to_string());
            println!("  models_dir = {:?}", config.models_dir().display().to_string());
            println!("  workflows_dir = {:?}", config.workflows_dir().display().to_string());
            println!();
            println!("[downloads]");
            println!("  endpoint = \"{}\"", config.downloads.endpoint);
            println!("  revision = \"{}\"", config.downloads.revision);
            println!(
                "  hf_token = {}",
                config.downloads.hf_token.as_ref().map(|_| "***").unwrap_or("(not set)")
            );
            println!("  max_concurrent = {}", config.downloads.max_concurrent);
            println!();
            println!("[categories]");
            for category in ModelCategory::ALL {
                println!(
                    "  {} = {}",
                    category.dir_name(),
                    config.categories.is_enabled(category)
                );
            }
        }

        // Get a specific key
        (Some(key), None) => {
            let value = get_config_value(&config, key)?;
            println!("{}", value);
        }

        // Set a specific key
        (Some(key), Some(value)) => {
            set_config_value(&mut config, key, value)?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }

        _ => unreachable!(),
    }

    Ok(())
}

fn category_key(key: &str) -> Option<ModelCategory> {
    key.strip_prefix("categories.")
        .and_then(ModelCategory::from_dir_name)
}

fn get_config_value(config: &Config, key: &str) -> Result<String> {
    if let Some(category) = category_key(key) {
        return Ok(config.categories.is_enabled(category).to_string());
    }
    match key {
        "paths.base_path" => Ok(config.paths.base_path.display().to_string()),
        "paths.models_dir" => Ok(config.models_dir().display().to_string()),
        "paths.workflows_dir" => Ok(config.workflows_dir().display().to_string()),
        "downloads.endpoint" => Ok(config.downloads.endpoint.clone()),
        "downloads.revision" => Ok(config.downloads.revision.clone()),
        "downloads.hf_token" => Ok(config
            .downloads
            .hf_token
            .as_ref()
            .map(|_| "***".to_string())
            .unwrap_or_default()),
        "downloads.max_concurrent" => Ok(config.downloads.max_concurrent.to_string()),
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
}

fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    if let Some(category) = category_key(key) {
        config.categories.set(category, value.parse()?);
        return Ok(());
    }
    match key {
        "paths.base_path" => config.paths.base_path = value.into(),
        "paths.models_dir" => {
            config.paths.models_dir = if value.is_empty() {
                None
            } else {
                Some(value.into())
            }
        }
        "paths.workflows_dir" => {
            config.paths.workflows_dir = if value.is_empty() {
                None
            } else {
                Some(value.into())
            }
        }
        "downloads.endpoint" => config.downloads.endpoint = value.to_string(),
        "downloads.revision" => config.downloads.revision = value.to_string(),
        "downloads.hf_token" => {
            config.downloads.hf_token = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        }
        "downloads.max_concurrent" => config.downloads.max_concurrent = value.parse()?,
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_category() {
        let mut config = Config::default();
        set_config_value(&mut config, "categories.loras", "true").unwrap();
        assert_eq!(get_config_value(&config, "categories.loras").unwrap(), "true");
        assert!(set_config_value(&mut config, "categories.loras", "maybe").is_err());
    }

    #[test]
    fn test_token_is_masked() {
        let mut config = Config::default();
        set_config_value(&mut config, "downloads.hf_token", "hf_secret").unwrap();
        assert_eq!(get_config_value(&config, "downloads.hf_token").unwrap(), "***");
    }

    #[test]
    fn test_unknown_key() {
        let mut config = Config::default();
        assert!(get_config_value(&config, "daemon.port").is_err());
        assert!(set_config_value(&mut config, "categories.upscalers", "true").is_err());
    }
}
