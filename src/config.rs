use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const WINDOW_WIDTH: u32 = 800;
pub const WINDOW_HEIGHT: u32 = 600;
pub const WINDOW_TITLE: &str = "Lamplit";
/// Samples per pixel of the offscreen target.
pub const MSAA_SAMPLES: u32 = 4;

pub const STAGES_ENV: &str = "LAMPLIT_STAGES";
pub const ASSETS_ENV: &str = "LAMPLIT_ASSETS";

/// Optional stages of the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStages {
    /// Camera-mounted spotlight, toggled with `L`.
    pub spotlight: bool,
    /// Offscreen multisampled pass plus composite, effect toggled with `E`.
    pub post_process: bool,
}

impl Default for PipelineStages {
    fn default() -> Self {
        Self::all()
    }
}

impl PipelineStages {
    pub const fn all() -> Self {
        Self {
            spotlight: true,
            post_process: true,
        }
    }

    /// Renders straight to the window with the spotlight available.
    pub const fn direct() -> Self {
        Self {
            spotlight: true,
            post_process: false,
        }
    }

    pub const fn minimal() -> Self {
        Self {
            spotlight: false,
            post_process: false,
        }
    }

    /// Parses a comma-separated stage list such as `spotlight,post-process`.
    pub fn parse(list: &str) -> Result<Self> {
        let mut stages = Self::minimal();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match name.to_ascii_lowercase().as_str() {
                "spotlight" => stages.spotlight = true,
                "post-process" | "postprocess" => stages.post_process = true,
                "all" => stages = Self::all(),
                "none" => {}
                other => {
                    return Err(anyhow!(
                        "unknown stage `{other}`; expected spotlight, post-process, all or none"
                    ))
                }
            }
        }
        Ok(stages)
    }

    /// Sample count for scene pipelines.
    pub fn scene_samples(self) -> u32 {
        if self.post_process {
            MSAA_SAMPLES
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
            title: WINDOW_TITLE.to_string(),
        }
    }
}

/// Startup settings for the viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub stages: PipelineStages,
    /// Directory the `resources/` tree is resolved against.
    pub asset_root: PathBuf,
}

impl ViewerConfig {
    /// Builds the configuration from the built-in constants and the
    /// `LAMPLIT_STAGES` / `LAMPLIT_ASSETS` environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(list) = env::var(STAGES_ENV) {
            config.stages = PipelineStages::parse(&list)?;
        }
        if let Some(root) = env::var_os(ASSETS_ENV) {
            config.asset_root = PathBuf::from(root);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[test]
    fn parses_stage_lists() {
        assert_eq!(
            PipelineStages::parse("spotlight").unwrap(),
            PipelineStages::direct()
        );
        assert_eq!(
            PipelineStages::parse(" Post-Process , spotlight ").unwrap(),
            PipelineStages::all()
        );
        assert_eq!(
            PipelineStages::parse("none").unwrap(),
            PipelineStages::minimal()
        );
        assert!(PipelineStages::parse("bloom").is_err());
    }

    #[test]
    fn scene_samples_follow_post_process() {
        assert_eq!(PipelineStages::all().scene_samples(), MSAA_SAMPLES);
        assert_eq!(PipelineStages::direct().scene_samples(), 1);
    }

    #[test]
    fn defaults_without_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var(STAGES_ENV);
        env::remove_var(ASSETS_ENV);
        let config = ViewerConfig::from_env().unwrap();
        assert_eq!(config.window.width, WINDOW_WIDTH);
        assert_eq!(config.window.height, WINDOW_HEIGHT);
        assert_eq!(config.stages, PipelineStages::all());
        assert_eq!(config.asset_root, PathBuf::new());
    }

    #[test]
    fn environment_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var(STAGES_ENV, "spotlight");
        env::set_var(ASSETS_ENV, "/opt/lamplit");
        let config = ViewerConfig::from_env();
        env::remove_var(STAGES_ENV);
        env::remove_var(ASSETS_ENV);
        let config = config.unwrap();
        assert_eq!(config.stages, PipelineStages::direct());
        assert_eq!(config.asset_root, PathBuf::from("/opt/lamplit"));
    }

    #[test]
    fn bad_stage_name_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var(STAGES_ENV, "spotlight,sepia");
        let result = ViewerConfig::from_env();
        env::remove_var(STAGES_ENV);
        assert!(result.is_err());
    }
}
