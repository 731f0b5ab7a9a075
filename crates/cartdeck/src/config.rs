use directories::ProjectDirs;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use slotbay::{
    AccessKey, ContentUrl, MachineGeometry, Point3, ScreenSource, Slot, SwapPolicy, Tuning,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/cartdeck.sock";

fn unit_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SlotConfig {
    pub rest: Point3,
    #[serde(default)]
    pub rotation: Point3,
    #[serde(default = "unit_scale")]
    pub scale: f64,
    pub content: Option<ContentUrl>,
}

impl SlotConfig {
    fn to_slot(&self, index: usize) -> Slot {
        Slot {
            rotation: self.rotation,
            scale: self.scale,
            content: self.content.clone(),
            ..Slot::new(index, self.rest)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub default_url: ContentUrl,
    pub access_key: Option<AccessKey>,
    pub swap_policy: SwapPolicy,
    pub fps: u32,
    pub socket_path: PathBuf,
    /// Frames the headless renderer waits before reporting a body ready.
    pub warmup_frames: u32,
    pub machine: MachineGeometry,
    pub tuning: Tuning,
    pub slots: Vec<SlotConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let slots = (0..4)
            .map(|i| SlotConfig {
                rest: Point3::new(i as f64 * 100.0 - 150.0, -80.0, 0.0),
                rotation: Point3::default(),
                scale: 1.0,
                content: Some(ContentUrl::new(format!("https://cartdeck.local/cartridge/{i}"))),
            })
            .collect();

        Self {
            default_url: ContentUrl::new("https://cartdeck.local/"),
            access_key: None,
            swap_policy: SwapPolicy::default(),
            fps: 60,
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            warmup_frames: 0,
            machine: MachineGeometry::default(),
            tuning: Tuning::default(),
            slots,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slots.is_empty() {
            return Err(ConfigError::NoSlots);
        }
        if self.fps == 0 {
            return Err(ConfigError::ZeroFps);
        }
        self.default_url
            .to_url()
            .map_err(|source| ConfigError::Url {
                field: "default_url".to_string(),
                source,
            })?;
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(content) = &slot.content {
                content.to_url().map_err(|source| ConfigError::Url {
                    field: format!("slots[{i}].content"),
                    source,
                })?;
            }
        }
        for (name, value) in [
            ("tuning.phase_speed", self.tuning.phase_speed),
            ("tuning.overlay_speed", self.tuning.overlay_speed),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Speed { name, value });
            }
        }
        Ok(())
    }

    pub fn build_slots(&self) -> Vec<Slot> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, cfg)| cfg.to_slot(i))
            .collect()
    }

    pub fn screen_source(&self) -> ScreenSource {
        ScreenSource::new(self.default_url.clone(), self.access_key.clone())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }

    /// Whether `other` moves or adds bays. Such changes cannot be applied
    /// to a running deck.
    pub fn geometry_differs(&self, other: &Config) -> bool {
        self.machine != other.machine
            || self.slots.len() != other.slots.len()
            || self
                .slots
                .iter()
                .zip(&other.slots)
                .any(|(a, b)| a.rest != b.rest || a.rotation != b.rotation || a.scale != b.scale)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
    #[error("At least one slot must be configured")]
    NoSlots,
    #[error("fps must be positive")]
    ZeroFps,
    #[error("{name} must be in (0, 1], got {value}")]
    Speed { name: &'static str, value: f64 },
    #[error("{field} is not a valid URL: {source}")]
    Url {
        field: String,
        source: url::ParseError,
    },
}

pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("org", "cartdeck", "cartdeck").ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

fn finish(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<Config, ConfigError> {
    let cfg: Config = builder
        .add_source(config::Environment::with_prefix("CARTDECK"))
        .build()?
        .try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_config() -> Result<Config, ConfigError> {
    let config_path = get_config_path()?;
    load_config_from(&config_path)
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    finish(config::Config::builder().add_source(config::File::from(path).required(false)))
}

pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    finish(
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml)),
    )
}

pub fn load_or_setup() -> Config {
    let path = match get_config_path() {
        Ok(path) => path,
        Err(e) => {
            log::warn!("{}, using built-in defaults", e);
            return Config::default();
        }
    };
    if !path.exists() {
        log::info!("No config at {}, using built-in defaults", path.display());
        return Config::default();
    }

    match load_config_from(&path) {
        Ok(c) => {
            log::info!("Loaded {} ({} slots)", path.display(), c.slots.len());
            c
        }
        Err(e) => {
            log::warn!("Falling back to built-in config, {} is invalid: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Where `init-config` put the bundled default, and whether it had to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultConfigFile {
    pub path: PathBuf,
    pub written: bool,
}

pub fn write_default_config() -> std::io::Result<DefaultConfigFile> {
    let path =
        get_config_path().map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    write_default_config_to(path)
}

fn write_default_config_to(path: PathBuf) -> std::io::Result<DefaultConfigFile> {
    if path.exists() {
        return Ok(DefaultConfigFile {
            path,
            written: false,
        });
    }
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(&path, DEFAULT_CONFIG)?;
    Ok(DefaultConfigFile {
        path,
        written: true,
    })
}

pub const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

use crate::events::AppEvent;
use async_channel::Sender;

fn watch_dir(
    dir: &Path,
    bridge_tx: Sender<notify::Result<notify::Event>>,
) -> Result<RecommendedWatcher, ConfigError> {
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = bridge_tx.send_blocking(res);
        },
        notify::Config::default(),
    )?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Editors touch a file several times per save; only content changes to
/// the config file itself count.
fn touches_config(event: &notify::Event, config_path: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| p == config_path)
}

pub async fn run_async_watcher(tx: Sender<AppEvent>) {
    let config_path = match get_config_path() {
        Ok(p) => p,
        Err(e) => {
            log::error!("Config watcher error: {}", e);
            return;
        }
    };
    let Some(config_dir) = config_path.parent().map(Path::to_path_buf) else {
        return;
    };

    if let Err(e) = fs_err::create_dir_all(&config_dir) {
        log::error!("Failed to create config directory for watching: {}", e);
        return;
    }

    let (bridge_tx, bridge_rx) = async_channel::unbounded();

    // dropping the watcher stops delivery, keep it alive for the loop
    let _watcher = match watch_dir(&config_dir, bridge_tx) {
        Ok(w) => w,
        Err(e) => {
            log::error!("Failed to watch config directory: {}", e);
            return;
        }
    };
    log::debug!("Watching {}", config_path.display());

    while let Ok(res) = bridge_rx.recv().await {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                log::error!("Watch error: {}", e);
                continue;
            }
        };
        if !touches_config(&event, &config_path) {
            continue;
        }

        // one save, one reload
        let mut burst = 1;
        while let Ok(Ok(extra)) = bridge_rx.try_recv() {
            if touches_config(&extra, &config_path) {
                burst += 1;
            }
        }

        if config_path.exists() {
            log::info!("{} changed ({} events), reloading", config_path.display(), burst);
        } else {
            log::warn!("{} removed, reloading built-in defaults", config_path.display());
        }
        if tx.send(AppEvent::ConfigReload).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn test_default_config_file_matches_builtin() {
        let parsed = parse_config(DEFAULT_CONFIG).unwrap();
        let builtin = Config::default();

        assert_eq!(parsed.slots.len(), builtin.slots.len());
        assert_eq!(parsed.swap_policy, SwapPolicy::LastWins);
        assert!(!parsed.geometry_differs(&builtin));
        assert_eq!(parsed.tuning, builtin.tuning);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg = parse_config(
            r#"
            swap_policy = "first"
            access_key = "k"

            [[slots]]
            rest = { x = 1.0, y = 2.0, z = 3.0 }
            "#,
        )
        .unwrap();

        assert_eq!(cfg.swap_policy, SwapPolicy::FirstWins);
        assert_eq!(cfg.access_key, Some(AccessKey::new("k")));
        assert_eq!(cfg.fps, 60);
        assert_eq!(cfg.slots[0].scale, 1.0);
        assert_eq!(cfg.slots[0].content, None);

        let slots = cfg.build_slots();
        assert_eq!(slots[0].rest_position, Point3::new(1.0, 2.0, 3.0));
        assert!(!slots[0].has_handler());
    }

    #[test]
    fn test_empty_slot_list_is_rejected() {
        let cfg = Config {
            slots: Vec::new(),
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::NoSlots)));
    }

    #[test]
    fn test_out_of_range_speed_is_rejected() {
        let err = parse_config("[tuning]\nphase_speed = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Speed { value, .. } if value == 1.5));
    }

    #[test]
    fn test_bad_content_url_is_rejected() {
        let err = parse_config(
            r#"
            [[slots]]
            rest = { x = 0.0, y = 0.0, z = 0.0 }
            content = "https://deck.local/0"

            [[slots]]
            rest = { x = 1.0, y = 0.0, z = 0.0 }
            content = "cartridge two"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Url { ref field, .. } if field == "slots[1].content"));
    }

    #[test]
    fn test_settle_delay_in_milliseconds() {
        let cfg = parse_config("[tuning]\nsettle_delay_ms = 250").unwrap();
        assert_eq!(cfg.tuning.settle_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_geometry_change_detection() {
        let base = Config::default();
        let mut moved = base.clone();
        moved.slots[1].rest.x += 5.0;
        assert!(base.geometry_differs(&moved));

        let mut relinked = base.clone();
        relinked.slots[1].content = None;
        relinked.default_url = ContentUrl::new("https://elsewhere/");
        assert!(!base.geometry_differs(&relinked));
    }

    #[test]
    fn test_only_config_file_changes_trigger_reload() {
        let config_path = Path::new("/home/u/.config/cartdeck/config.toml");
        let sibling = Path::new("/home/u/.config/cartdeck/config.toml.swp");
        let event = |kind| notify::Event::new(kind);

        assert!(touches_config(
            &event(EventKind::Modify(ModifyKind::Any)).add_path(config_path.into()),
            config_path
        ));
        assert!(touches_config(
            &event(EventKind::Create(CreateKind::File)).add_path(config_path.into()),
            config_path
        ));
        assert!(touches_config(
            &event(EventKind::Remove(RemoveKind::File)).add_path(config_path.into()),
            config_path
        ));
        assert!(!touches_config(
            &event(EventKind::Access(AccessKind::Any)).add_path(config_path.into()),
            config_path
        ));
        assert!(!touches_config(
            &event(EventKind::Modify(ModifyKind::Any)).add_path(sibling.into()),
            config_path
        ));
    }

    #[test]
    fn test_default_config_is_not_overwritten() {
        let dir = std::env::temp_dir().join(format!("cartdeck-init-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = fs_err::remove_dir_all(&dir);

        let first = write_default_config_to(path.clone()).unwrap();
        assert!(first.written);
        assert_eq!(fs_err::read_to_string(&path).unwrap(), DEFAULT_CONFIG);

        fs_err::write(&path, "fps = 30\n").unwrap();
        let second = write_default_config_to(path.clone()).unwrap();
        assert!(!second.written);
        assert_eq!(second.path, path);
        assert_eq!(load_config_from(&path).unwrap().fps, 30);

        fs_err::remove_dir_all(&dir).unwrap();
    }
}
