// Combotype CLI
// Watches typed text system-wide and hands matched trigger keywords to a dispatcher

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Context;
use clap::Parser;

use combotype_core::hook::{ChannelSink, EventSource, HookHandle, InputHook, Pipeline};
use combotype_core::layout::LayoutResolver;
use combotype_core::{Config, MatchResult, TriggerDictionary};

/// System-wide trigger keyword watcher
#[derive(Parser, Debug)]
#[command(name = "combotype")]
#[command(version)]
#[command(about = "Detects trigger keywords as you type, in any application", long_about = None)]
struct Args {
    /// TOML configuration file (defaults to ~/.config/combotype/config.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Manually specify devices to watch (can be used multiple times)
    #[arg(short, long, value_name = "DEVICE")]
    devices: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// List available keyboard and pointer devices
    #[arg(long)]
    list_devices: bool,
}

impl Args {
    fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Config::default_path)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp_millis().init();
}

/// Load the config file. A missing default file means no combos; a missing
/// explicit file is an error.
fn load_config(path: Option<&Path>, explicit: bool) -> anyhow::Result<Config> {
    match path {
        Some(path) if explicit || path.exists() => {
            let config = Config::from_toml_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            log::info!("Loaded config from {}", path.display());
            Ok(config)
        }
        _ => {
            log::warn!("No configuration file found, starting with no combos");
            Ok(Config::default())
        }
    }
}

#[cfg(target_os = "linux")]
fn list_devices() -> anyhow::Result<()> {
    use combotype_core::event::EvdevSource;

    let devices = EvdevSource::list_devices().context("Error finding input devices")?;
    println!("Found {} device(s):", devices.len());
    for device in &devices {
        match &device.path {
            Some(path) => println!("  {}: {} [{:?}] ({})", device.index, device.name, device.kind, path),
            None => println!("  {}: {} [{:?}]", device.index, device.name, device.kind),
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn list_devices() -> anyhow::Result<()> {
    anyhow::bail!("--list-devices is only available on Linux")
}

/// Log each match off the hook thread
fn spawn_dispatcher(matches: Receiver<MatchResult>) -> anyhow::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("combotype-dispatch".to_string())
        .spawn(move || {
            for found in matches {
                log::info!(
                    "Combo {} triggered by {:?} (erase {} chars)",
                    found.combo(),
                    found.entry.keyword(),
                    found.erase_len()
                );
            }
            log::debug!("Dispatcher stopped");
        })
        .context("Failed to spawn dispatcher thread")
}

/// Reread the config and swap in the new combos and policy.
///
/// Failures keep the running state.
#[cfg_attr(not(unix), allow(dead_code))]
fn reload(path: Option<&Path>, dictionary: &TriggerDictionary, handle: &HookHandle) {
    let Some(path) = path else {
        log::warn!("No config file to reload");
        return;
    };
    let config = match Config::from_toml_path(path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Reload failed, keeping current combos: {}", e);
            return;
        }
    };
    if let Err(e) = dictionary.rebuild(config.trigger_entries()) {
        log::error!("Reload failed, keeping current combos: {}", e);
        return;
    }
    if !handle.set_policy(config.matcher) {
        log::warn!("Pipeline busy, matcher policy not updated");
    }
}

#[cfg(unix)]
fn wait_for_shutdown(
    config_path: Option<&Path>,
    dictionary: &TriggerDictionary,
    handle: &HookHandle,
) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM, SIGHUP]).context("Failed to register signal handlers")?;
    for signal in &mut signals {
        match signal {
            SIGHUP => {
                log::info!("Received SIGHUP, reloading configuration");
                reload(config_path, dictionary, handle);
            }
            _ => {
                log::info!("Received signal, shutting down gracefully...");
                break;
            }
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(
    _config_path: Option<&Path>,
    _dictionary: &TriggerDictionary,
    _handle: &HookHandle,
) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    let stop = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&stop))
            .context("Failed to register signal handlers")?;
    }
    while !stop.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(100));
    }
    log::info!("Received signal, shutting down gracefully...");
    Ok(())
}

fn run<S, R>(source: S, layout: R, config: Config, config_path: Option<PathBuf>) -> anyhow::Result<()>
where
    S: EventSource,
    R: LayoutResolver + Send + 'static,
{
    let dictionary = Arc::new(TriggerDictionary::new());
    let count = dictionary
        .rebuild(config.trigger_entries())
        .context("Invalid combo in configuration")?;
    log::info!("Watching for {} combo(s)", count);

    let (sink, matches) = ChannelSink::bounded(config.general.dispatch_queue);
    let pipeline =
        Pipeline::new(layout, Arc::clone(&dictionary), Arc::new(sink)).with_policy(config.matcher);
    let mut hook = InputHook::new(source, pipeline);

    let status = hook.start().context("Failed to start the input hook")?;
    if !status.mouse_installed() {
        log::warn!("Running without mouse invalidation");
    }

    let dispatcher = spawn_dispatcher(matches)?;
    let handle = hook.handle();

    wait_for_shutdown(config_path.as_deref(), &dictionary, &handle)?;

    if handle.skipped_events() > 0 {
        log::info!("{} event(s) skipped while the pipeline was busy", handle.skipped_events());
    }
    // Releasing the pipeline closes the dispatch channel
    drop(handle);
    drop(hook);
    if dispatcher.join().is_err() {
        log::error!("Dispatcher thread panicked");
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn start(args: &Args, config: Config, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    use combotype_core::event::EvdevSource;
    use combotype_core::SoftLayout;

    // CLI --devices > config [devices].only > autodetect
    let filter = if args.devices.is_empty() {
        config.devices.only.clone()
    } else {
        args.devices.clone()
    };
    let layout = SoftLayout::new(config.general.layout);
    log::info!("Resolving keys with the {} layout", config.general.layout);

    run(EvdevSource::with_filter(filter), layout, config, config_path)
}

#[cfg(windows)]
fn start(_args: &Args, config: Config, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    use combotype_core::event::WindowsHookSource;
    use combotype_core::layout::WindowsLayout;

    run(WindowsHookSource::new(), WindowsLayout::new(), config, config_path)
}

#[cfg(not(any(target_os = "linux", windows)))]
fn start(_args: &Args, _config: Config, _config_path: Option<PathBuf>) -> anyhow::Result<()> {
    anyhow::bail!("No input source is available on this platform")
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Handle list-devices flag (doesn't require config)
    if args.list_devices {
        return list_devices();
    }

    let config_path = args.config_path();
    let config = load_config(config_path.as_deref(), args.config.is_some())?;

    if args.check_config {
        let count = config.check().context("Configuration is invalid")?;
        println!("Configuration is valid ({} active combos)", count);
        return Ok(());
    }

    start(&args, config, config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["combotype", "--config", "/tmp/test.toml"]);

        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
        assert_eq!(args.config_path(), Some(PathBuf::from("/tmp/test.toml")));
        assert!(args.devices.is_empty());
        assert!(!args.verbose);
        assert!(!args.check_config);
        assert!(!args.list_devices);
    }

    #[test]
    fn test_args_with_options() {
        let args = Args::parse_from([
            "combotype",
            "--verbose",
            "--devices",
            "/dev/input/event0",
            "--devices",
            "/dev/input/event1",
        ]);

        assert!(args.verbose);
        assert_eq!(args.devices, vec!["/dev/input/event0", "/dev/input/event1"]);
    }

    #[test]
    fn test_args_check_config() {
        let args = Args::parse_from(["combotype", "-c", "/tmp/test.toml", "--check-config"]);
        assert!(args.check_config);
    }

    #[test]
    fn test_missing_default_config_is_empty() {
        let config = load_config(Some(Path::new("/nonexistent/config.toml")), false).unwrap();
        assert!(config.trigger_entries().is_empty());
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        assert!(load_config(Some(Path::new("/nonexistent/config.toml")), true).is_err());
    }
}
