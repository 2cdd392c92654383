//! Orchestration of one backup run: settings, sign-in, albums, photos.

use crate::api_client::{authenticate, ICloudSession};
use crate::configuration::{self, ConfigFolder, Settings};
use crate::export::export_library;
use crate::foundation::console::Terminal;
use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};

pub async fn run(cfg_folder: ConfigFolder) -> anyhow::Result<()> {
    let settings = configuration::get_configuration(&cfg_folder.config_file)
        .with_context(|| {
            format!(
                "Unable to parse configuration file {}",
                cfg_folder.config_file.display()
            )
        })?;
    init_tracing(&settings);

    if !cfg_folder.config_file.exists() {
        info!("no configuration file, using defaults");
    }

    let console = Terminal;
    let session = ICloudSession::new(&settings.endpoints)?;
    let session = match authenticate(session, &console).await {
        Ok(session) => session,
        // Already reported on the terminal.
        Err(_) => std::process::exit(1),
    };

    let photos = session
        .photos(settings.page_size)
        .await
        .context("Unable to open the photo library")?;

    println!(
        "\x1b[1m\x1b[34mBacking up into {}...\x1b[0m",
        settings.output_dir.display()
    );
    let summary = export_library(&photos, &settings.output_dir).await?;

    println!(
        "\x1b[1m\x1b[32mBackup complete: {} album(s), {} photo(s).\x1b[0m",
        summary.albums, summary.photos
    );
    Ok(())
}

fn init_tracing(settings: &Settings) {
    let level = settings.log_level.parse::<LevelFilter>().unwrap_or_else(|_| {
        eprintln!(
            "\x1b[33mUnknown log level '{}', using 'warn'.\x1b[0m",
            settings.log_level
        );
        LevelFilter::WARN
    });

    let installed = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        warn!("tracing subscriber already installed");
    }
}
