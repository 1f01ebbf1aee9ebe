use crate::config::types::Config;
use std::fs;
use std::path::PathBuf;

/// Write a default config, either to stdout or to the user config location.
pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config)?;

    if stdout {
        print!("{}", yaml);
        return Ok(());
    }

    let config_path = match dirs::home_dir() {
        Some(home_dir) => {
            let user_config = home_dir.join(".config/telhub/config.yml");
            if let Some(parent) = user_config.parent() {
                fs::create_dir_all(parent)?;
            }
            user_config
        }
        None => PathBuf::from("/etc/telhub/config.yml"),
    };

    if config_path.exists() {
        return Err(format!(
            "config file already exists at {}; remove it first or use --stdout",
            config_path.display()
        )
        .into());
    }

    fs::write(&config_path, yaml)?;
    println!("Wrote default config to {}", config_path.display());
    Ok(())
}
