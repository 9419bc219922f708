use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(name = "wayswap")]
#[command(
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("WAYSWAP_GIT_HASH"), ")")
)]
#[command(about = "Dmabuf buffer pipeline probe for Wayland compositors")]
struct Cli {
    /// List every advertised dmabuf format
    #[arg(long, action = ArgAction::SetTrue)]
    formats: bool,

    /// Load flush policy and extra formats from a TOML config file
    #[arg(long, short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    if std::env::var("WAYLAND_DISPLAY").is_err() {
        log::error!("WAYLAND_DISPLAY not set - this tool requires a Wayland session.");
        return Err(anyhow::anyhow!("Wayland environment required"));
    }

    let (mut session, _event_queue) = wayswap::wire::Session::connect()?;

    if let Some(path) = &cli.config {
        let file = wayswap::FileConfig::load(path)?;
        file.apply(session.manager.config_mut());
        log::info!("Applied config from {}", path.display());
    }

    let config = session.manager.config();
    println!("dmabuf factory: bound");
    println!(
        "presentation feedback: {}",
        if config.presentation_feedback_available {
            "available"
        } else {
            "absent (synthetic feedback in use)"
        }
    );
    if let Some(clock) = session.presentation_clock() {
        println!("presentation clock id: {clock}");
    }
    println!("flush policy: {:?}", config.flush_policy);
    println!("advertised formats: {}", config.supported_formats.len());

    if cli.formats {
        let mut formats: Vec<u32> = config.supported_formats.iter().copied().collect();
        formats.sort_unstable();
        for format in formats {
            println!("  {:#010x} ({})", format, fourcc_name(format));
        }
    }

    Ok(())
}

/// Renders a drm fourcc code as its four ASCII characters, dotting out
/// anything unprintable.
fn fourcc_name(format: u32) -> String {
    format
        .to_le_bytes()
        .iter()
        .map(|&byte| {
            if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            }
        })
        .collect()
}
