use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::sync::{mpsc, watch, RwLock};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplaySettings {
    /// Seconds each upload stays on screen.
    pub item_duration_secs: u64,
    pub poll_interval_secs: u64,
    /// Seconds between full-screen QR interstitials.
    pub qr_interval_secs: u64,
    pub qr_duration_secs: u64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            item_duration_secs: 10,
            poll_interval_secs: 5,
            qr_interval_secs: 600,
            qr_duration_secs: 90,
        }
    }
}

impl DisplaySettings {
    // Zero would spin the timers, clamp to one second.
    fn secs(v: u64) -> Duration {
        Duration::from_secs(v.max(1))
    }

    pub fn item_duration(&self) -> Duration {
        Self::secs(self.item_duration_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Self::secs(self.poll_interval_secs)
    }

    pub fn qr_interval(&self) -> Duration {
        Self::secs(self.qr_interval_secs)
    }

    pub fn qr_duration(&self) -> Duration {
        Self::secs(self.qr_duration_secs)
    }
}

pub struct SettingsStore {
    inner: RwLock<DisplaySettings>,
    tx: watch::Sender<DisplaySettings>,
    file_path: PathBuf,
}

#[derive(Clone)]
pub struct SharedSettings(Arc<SettingsStore>);

fn read_file(path: &Path) -> io::Result<DisplaySettings> {
    let toml = fs::read_to_string(path)?;
    toml::from_str(&toml).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_file(path: &Path, settings: &DisplaySettings) -> io::Result<()> {
    let tmp = path.with_extension("toml.tmp");
    let s = toml::to_string_pretty(settings).map_err(io::Error::other)?;
    fs::write(&tmp, s)?;
    fs::rename(&tmp, path)
}

impl SharedSettings {
    /// Load from disk, writing the defaults first if the file does not exist.
    pub fn load(file_path: impl Into<PathBuf>) -> io::Result<Self> {
        let file_path = file_path.into();

        let initial = if file_path.exists() {
            read_file(&file_path)?
        } else {
            let default = DisplaySettings::default();
            write_file(&file_path, &default)?;
            default
        };

        let (tx, _) = watch::channel(initial.clone());
        Ok(SharedSettings(Arc::new(SettingsStore {
            inner: RwLock::new(initial),
            tx,
            file_path,
        })))
    }

    /// Get a snapshot of the current settings.
    pub async fn get(&self) -> DisplaySettings {
        self.0.inner.read().await.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplaySettings> {
        self.0.tx.subscribe()
    }

    /// Mutate in memory and write back to disk atomically.
    pub async fn update<F>(&self, mutator: F) -> io::Result<DisplaySettings>
    where
        F: FnOnce(&mut DisplaySettings),
    {
        let mut guard = self.0.inner.write().await;
        mutator(&mut guard);
        let new = guard.clone();
        write_file(&self.0.file_path, &new)?;
        self.0.tx.send_replace(new.clone());
        Ok(new)
    }

    /// Re-read the file. Subscribers are only woken when something changed.
    pub async fn reload(&self) -> io::Result<bool> {
        let fresh = read_file(&self.0.file_path)?;
        let mut guard = self.0.inner.write().await;
        if *guard == fresh {
            return Ok(false);
        }
        *guard = fresh.clone();
        self.0.tx.send_replace(fresh);
        Ok(true)
    }

    /// Reload whenever the file changes on disk. The returned watcher must be
    /// kept alive for as long as reloading is wanted.
    pub fn watch_file(&self) -> notify::Result<RecommendedWatcher> {
        let (tx, mut rx) = mpsc::channel::<()>(8);
        let config = notify::Config::default().with_poll_interval(Duration::from_secs(2));
        let mut watcher: RecommendedWatcher = Watcher::new(
            move |res: notify::Result<notify::Event>| {
                if res.is_ok() {
                    let _ = tx.blocking_send(());
                }
            },
            config,
        )?;
        // the file is swapped by rename, so watch the directory
        let dir = self
            .0
            .file_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let settings = self.clone();
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                match settings.reload().await {
                    Ok(true) => tracing::info!("display settings reloaded"),
                    Ok(false) => {}
                    Err(e) => tracing::warn!("ignoring unreadable settings file: {e}"),
                }
            }
        });
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_are_written_on_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("display.toml");
        let settings = SharedSettings::load(&path).unwrap();
        assert_eq!(settings.get().await, DisplaySettings::default());
        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("item_duration_secs = 10"));
        assert!(on_disk.contains("qr_interval_secs = 600"));
    }

    #[tokio::test]
    async fn update_persists_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("display.toml");
        let settings = SharedSettings::load(&path).unwrap();
        let mut rx = settings.subscribe();

        settings.update(|s| s.qr_duration_secs = 30).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().qr_duration_secs, 30);

        let again = SharedSettings::load(&path).unwrap();
        assert_eq!(again.get().await.qr_duration_secs, 30);
    }

    #[tokio::test]
    async fn reload_picks_up_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("display.toml");
        fs::write(&path, "item_duration_secs = 4\n").unwrap();
        let settings = SharedSettings::load(&path).unwrap();
        // missing keys fall back to defaults
        assert_eq!(settings.get().await.poll_interval_secs, 5);

        assert!(!settings.reload().await.unwrap());
        fs::write(&path, "item_duration_secs = 7\n").unwrap();
        assert!(settings.reload().await.unwrap());
        assert_eq!(settings.get().await.item_duration(), Duration::from_secs(7));
    }

    #[test]
    fn zero_durations_are_clamped() {
        let s = DisplaySettings {
            item_duration_secs: 0,
            ..DisplaySettings::default()
        };
        assert_eq!(s.item_duration(), Duration::from_secs(1));
    }
}
