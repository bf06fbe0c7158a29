mod gpu_texture;
mod mesh;
pub mod offscreen;
mod renderer;
mod shaders;
pub mod uniforms;

pub use offscreen::{check_completeness, AttachmentDesc, Incomplete, TargetDesc};
pub use renderer::Renderer;
pub use uniforms::{CompositeUniform, FrameUniform, MaterialUniform, ObjectUniform};
