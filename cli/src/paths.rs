//! Directory layout under `~/.dhagent`.

use std::io;
use std::path::PathBuf;

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".dhagent";

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Per-application directories.
#[derive(Debug, Clone)]
pub struct Paths {
    pub app_name: String,
    pub home_dir: PathBuf,
}

impl Paths {
    pub fn new(app_name: impl Into<String>) -> io::Result<Self> {
        let home_dir = dirs::home_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "could not find home directory")
        })?;
        Ok(Self {
            app_name: app_name.into(),
            home_dir,
        })
    }

    /// `~/.dhagent/<app>`
    pub fn app_dir(&self) -> PathBuf {
        self.home_dir.join(DEFAULT_BASE_DIR).join(&self.app_name)
    }

    /// `~/.dhagent/<app>/config.yaml`
    pub fn config_file(&self) -> PathBuf {
        self.app_dir().join(DEFAULT_CONFIG_FILE)
    }

    /// `~/.dhagent/<app>/output`, where synthesized audio and reports go by default.
    pub fn output_dir(&self) -> PathBuf {
        self.app_dir().join("output")
    }

    /// Returns a path in the output directory, creating the directory first.
    pub fn output_path(&self, name: &str) -> io::Result<PathBuf> {
        let dir = self.output_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(name))
    }
}
