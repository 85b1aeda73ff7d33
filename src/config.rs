use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{DescriptorBindingFlags, FileLoadingFlags, RenderFlags};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub device: DeviceConfig,
}

/// How a model is loaded and drawn.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub path: Option<PathBuf>,
    pub file_loading_flags: FileLoadingFlags,
    pub descriptor_binding_flags: DescriptorBindingFlags,
    pub render_flags: RenderFlags,
    pub scale: f32,
    /// Animation posed after loading.
    pub animation: Option<AnimationConfig>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            file_loading_flags: FileLoadingFlags::empty(),
            descriptor_binding_flags: DescriptorBindingFlags::default(),
            render_flags: RenderFlags::BIND_IMAGES,
            scale: 1.0,
            animation: None,
        }
    }
}

impl ModelConfig {
    /// Applies command line switches on top of the file. Switches only add loading flags,
    /// flags set in the file stay set. An animation given here replaces the file's.
    pub fn merge_overrides(
        &mut self,
        file_loading_flags: FileLoadingFlags,
        animation: Option<AnimationConfig>,
    ) {
        self.file_loading_flags.insert(file_loading_flags);
        if animation.is_some() {
            self.animation = animation;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct AnimationConfig {
    pub index: usize,
    pub time: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    pub application_name: String,
    pub enable_validation: bool,
    /// Index into the physical device list, ignored when out of range.
    pub preferred_device_index: Option<usize>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            application_name: "vkgltf".to_string(),
            enable_validation: false,
            preferred_device_index: None,
        }
    }
}

impl Config {
    pub fn from_json(value: &str) -> serde_json::Result<Self> {
        serde_json::from_str(value)
    }
}

/// A JSON config file. A missing file is created with the defaults on first load.
pub struct ConfigFileLoader {
    pub path: PathBuf,
    config: Option<Config>,
}

impl ConfigFileLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().into(),
            config: None,
        }
    }

    /// Reads the file again, dropping unsaved changes.
    pub fn load_config(&mut self) -> Result<&mut Config, ConfigError> {
        let config = self.read_config()?;
        Ok(self.config.insert(config))
    }

    pub fn get_or_load_config(&mut self) -> Result<&mut Config, ConfigError> {
        let config = match self.config.take() {
            Some(config) => config,
            None => self.read_config()?,
        };
        Ok(self.config.insert(config))
    }

    pub fn save_config(&self) -> Result<(), ConfigError> {
        match &self.config {
            Some(config) => self.write_config(config),
            None => Ok(()),
        }
    }

    fn read_config(&self) -> Result<Config, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Config::from_json(&content).map_err(|source| ConfigError::Json {
                path: self.path.clone(),
                source,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Writing default config to {:?}", self.path);
                let config = Config::default();
                self.write_config(&config)?;
                Ok(config)
            }
            Err(source) => Err(ConfigError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_config(&self, config: &Config) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, content).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("vkgltf-{}-{}.json", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn missing_file_is_written_with_defaults() {
        let path = temp_path("defaults");
        let mut loader = ConfigFileLoader::new(&path);
        assert_eq!(*loader.load_config().unwrap(), Config::default());

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(Config::from_json(&written).unwrap(), Config::default());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let config = Config::from_json(
            r#"{"model": {"path": "scene.glb", "scale": 2.0, "animation": {"index": 1, "time": 0.5}}}"#,
        )
        .unwrap();
        assert_eq!(config.model.path, Some(PathBuf::from("scene.glb")));
        assert_eq!(config.model.scale, 2.0);
        assert_eq!(
            config.model.animation,
            Some(AnimationConfig {
                index: 1,
                time: 0.5
            })
        );
        assert_eq!(config.model.render_flags, RenderFlags::BIND_IMAGES);
        assert_eq!(config.device, DeviceConfig::default());
    }

    #[test]
    fn overrides_keep_flags_from_the_file() {
        let mut config = Config::from_json(
            r#"{"model": {"file_loading_flags": "FLIP_Y", "animation": {"index": 2, "time": 1.0}}}"#,
        )
        .unwrap()
        .model;

        config.merge_overrides(FileLoadingFlags::empty(), None);
        assert_eq!(config.file_loading_flags, FileLoadingFlags::FLIP_Y);
        assert_eq!(config.animation.map(|a| a.index), Some(2));

        config.merge_overrides(
            FileLoadingFlags::DONT_LOAD_IMAGES,
            Some(AnimationConfig {
                index: 0,
                time: 0.25,
            }),
        );
        assert_eq!(
            config.file_loading_flags,
            FileLoadingFlags::FLIP_Y | FileLoadingFlags::DONT_LOAD_IMAGES
        );
        assert_eq!(
            config.animation,
            Some(AnimationConfig {
                index: 0,
                time: 0.25
            })
        );
    }

    #[test]
    fn saved_changes_survive_a_reload() {
        let path = temp_path("reload");
        let mut loader = ConfigFileLoader::new(&path);
        loader.get_or_load_config().unwrap().device.enable_validation = true;
        loader.save_config().unwrap();

        let mut reloaded = ConfigFileLoader::new(&path);
        assert!(reloaded.get_or_load_config().unwrap().device.enable_validation);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn invalid_json_is_an_error() {
        let path = temp_path("invalid");
        std::fs::write(&path, "{ not json").unwrap();
        let mut loader = ConfigFileLoader::new(&path);
        assert!(matches!(
            loader.load_config(),
            Err(ConfigError::Json { .. })
        ));
        std::fs::remove_file(&path).unwrap();
    }
}
