//! theme-runtime - run theme widgets against a page fixture.
//!
//! # Usage
//!
//! ```bash
//! theme-runtime page.json
//! theme-runtime page.json --script clicks.txt --width 375
//! theme-runtime page.json --url 'https://shop.example/?q=tent' --save-data
//! ```

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;

use theme_runtime::config::{
    ConfigFlags, RuntimeConfig, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use theme_runtime::dom::{Dom, MemoryDom, Viewport};
use theme_runtime::fixture::{read_page, write_page};
use theme_runtime::runtime::{Connection, Environment, Page};
use theme_runtime::scheduler::IdleSupport;
use theme_runtime::script::{parse_script, run_script};

/// Run a website theme's widgets against a JSON page fixture
#[derive(Parser, Debug)]
#[command(name = "theme-runtime", version, about, long_about = None)]
struct Cli {
    /// Page fixture (JSON)
    #[arg(value_name = "PAGE")]
    page: PathBuf,

    /// Interaction script to replay after activation
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Override the fixture's viewport width
    #[arg(long)]
    width: Option<f64>,

    /// Override the fixture's viewport height
    #[arg(long)]
    height: Option<f64>,

    /// Address of the page (used for search prefill and submit)
    #[arg(long, default_value = "")]
    url: String,

    /// Desktop breakpoint in pixels
    #[arg(long)]
    breakpoint: Option<f64>,

    /// Carousels with at most this many slides stay static on desktop
    #[arg(long)]
    max_slides: Option<usize>,

    /// Breakpoint re-evaluation debounce in milliseconds
    #[arg(long)]
    media_debounce: Option<u64>,

    /// Height recomputation debounce in milliseconds
    #[arg(long)]
    resize_debounce: Option<u64>,

    /// Scroll offset below which the sticky bar always shows
    #[arg(long)]
    scroll_threshold: Option<f64>,

    /// Scroll movements smaller than this are ignored
    #[arg(long)]
    hysteresis: Option<f64>,

    /// Idle work fallback delay in milliseconds
    #[arg(long)]
    idle_timeout: Option<u64>,

    /// Pretend the reader asked to save data
    #[arg(long)]
    save_data: bool,

    /// Pretend the host has no idle callbacks
    #[arg(long)]
    no_idle_callbacks: bool,

    /// Write debug logging to a file
    #[arg(long, value_name = "PATH")]
    debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults in .themerc
    #[arg(long)]
    save: bool,

    /// Clear saved defaults in .themerc
    #[arg(long)]
    clear: bool,
}

fn init_logging(debug_log: Option<&PathBuf>) -> Result<()> {
    let level = if debug_log.is_some() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());
    match debug_log {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create debug log {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn environment(url: String, flags: &ConfigFlags) -> Environment {
    let idle = if flags.no_idle_callbacks {
        IdleSupport::Fallback
    } else {
        IdleSupport::Native
    };
    Environment::default()
        .with_url(url)
        .with_connection(Connection {
            save_data: flags.save_data,
            ..Connection::default()
        })
        .with_idle(idle)
}

fn main() -> Result<()> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&local_path)?;
    }
    if cli.save {
        save_config_flags(&local_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);
    init_logging(effective.debug_log.as_ref())?;

    let spec = read_page(&cli.page)?;
    let mut dom = MemoryDom::from_spec(&spec);
    let viewport = dom.viewport();
    dom.set_viewport(Viewport {
        width: cli.width.unwrap_or(viewport.width),
        height: cli.height.unwrap_or(viewport.height),
        scroll_y: viewport.scroll_y,
    });

    let config = effective.apply(RuntimeConfig::default());
    let mut page = Page::new(dom)
        .with_config(config)
        .with_environment(environment(cli.url, &effective));
    let installed = page.activate();

    let outcome = match &cli.script {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script {}", path.display()))?;
            let steps = parse_script(&text)?;
            Some(run_script(&mut page, &steps).context("Script failed")?)
        }
        None => None,
    };

    let final_dom = page
        .host::<MemoryDom>()
        .context("page host is not an in-memory document")?;
    println!("{}", write_page(&final_dom.to_spec())?);

    let runtime = page.runtime();
    let failed = outcome.as_ref().map_or(0, |o| o.failed().len());
    eprintln!(
        "activated {} widget(s), {} still installed, {} listener(s), {} timer(s), {} ms elapsed, {} failed teardown(s)",
        installed.len(),
        runtime.widget_count(),
        runtime.listeners().active_count(),
        runtime.timers().active_count(),
        runtime.now_ms(),
        failed,
    );
    Ok(())
}
