use config::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

/// Run settings. Every field has a default, so a missing or partial
/// configuration file behaves like the built-in defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root under which `albums/`, `photos/` and `photos.csv` are written.
    pub output_dir: PathBuf,
    /// `error`, `warn`, `info`, `debug` or `trace`.
    pub log_level: String,
    /// Photos requested per CloudKit page.
    pub page_size: u32,
    pub endpoints: Endpoints,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            log_level: "warn".to_string(),
            page_size: 100,
            endpoints: Endpoints::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub auth: String,
    pub setup: String,
    pub home: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth: "https://idmsa.apple.com/appleauth/auth".to_string(),
            setup: "https://setup.icloud.com/setup/ws/1".to_string(),
            home: "https://www.icloud.com".to_string(),
        }
    }
}

/// Largest page the photo service is asked for.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Loads settings from `cfg_file` when it exists, defaults otherwise.
pub fn get_configuration(cfg_file: &Path) -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(
            config::File::from(cfg_file)
                .format(config::FileFormat::Yaml)
                .required(false),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    if !(1..=MAX_PAGE_SIZE).contains(&settings.page_size) {
        return Err(ConfigError::Message(format!(
            "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
            settings.page_size
        )));
    }
    Ok(settings)
}

pub struct ConfigFolder {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl ConfigFolder {
    /// `~/.icloud-backup`, or `./.icloud-backup` when no home is known.
    pub fn new() -> Self {
        let home_dir = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self::in_dir(Path::new(&home_dir))
    }

    pub fn in_dir(home_dir: &Path) -> Self {
        Self {
            config_dir: get_config_dir_name(home_dir),
            config_file: get_config_file_name(home_dir),
        }
    }
}

impl Default for ConfigFolder {
    fn default() -> Self {
        Self::new()
    }
}

fn get_config_dir_name(home_dir: &Path) -> PathBuf {
    home_dir.join(".icloud-backup")
}

fn get_config_file_name(home_dir: &Path) -> PathBuf {
    home_dir.join(".icloud-backup").join("config.yaml")
}

pub fn create_config(cfg_folder: ConfigFolder) -> anyhow::Result<()> {
    println!("\x1b[1m\x1b[32mCreating configuration...\x1b[0m");

    if cfg_folder.config_file.exists() && !confirm_overwrite()? {
        println!("\x1b[33mOperation cancelled.\x1b[0m");
        return Ok(());
    }

    write_config_template(&cfg_folder)?;

    println!("\x1b[32mConfiguration file created at:");
    println!("  -> {}", cfg_folder.config_file.display());
    println!("\x1b[0mEdit it to change where backups are written. Credentials are always prompted for.");

    Ok(())
}

fn write_config_template(cfg_folder: &ConfigFolder) -> io::Result<()> {
    fs::create_dir_all(&cfg_folder.config_dir)?;
    fs::write(&cfg_folder.config_file, include_str!("config_template.yaml"))
}

fn confirm_overwrite() -> Result<bool, io::Error> {
    println!("\x1b[31mThe configuration file already exists.");
    println!("Do you want to overwrite it? (y/N)\x1b[0m");

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().to_lowercase() == "y")
}
