//! Building blocks for the Lamplit room viewer.
//!
//! Camera, lighting and scene evaluation are plain CPU code that can be
//! exercised without a window. The [`render`] module turns a
//! [`FramePlan`] into wgpu draw calls and the binary owns the event loop.

pub mod app;
pub mod assets;
pub mod camera;
pub mod config;
pub mod error;
pub mod input;
pub mod lights;
pub mod obj;
pub mod render;
pub mod scene;
pub mod texture;

pub use app::{FrameClock, FramePlan, PostEffect, Viewer};
pub use assets::AssetRoot;
pub use camera::{Camera, Movement};
pub use config::{PipelineStages, ViewerConfig};
pub use error::InitError;
pub use input::{InputState, KeyCode};
pub use lights::{FrameLights, LightBulb, PointLight, SpotLight};
pub use obj::{load_obj_from_str, ObjMesh, ParsedObj, SubMesh};
pub use render::Renderer;
pub use scene::{DrawItem, ModelId, Room};
