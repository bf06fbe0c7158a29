//! Multisampled offscreen target and the full-screen composite pass that
//! presents it.
//!
//! The target is sized once from the window at start-up and is never
//! recreated; after a resize the composite stretches the stale image.

use bytemuck::bytes_of;
use log::{error, info};
use thiserror::Error;
use wgpu::util::DeviceExt;

use super::gpu_texture::{create_sampler, DepthBuffer};
use super::mesh::{quad_vertex_layout, SCREEN_QUAD_VERTICES};
use super::shaders::COMPOSITE_SHADER;
use super::uniforms::CompositeUniform;
use crate::app::PostEffect;

/// Sample counts every adapter accepts for render attachments.
pub const SUPPORTED_SAMPLE_COUNTS: [u32; 2] = [1, 4];

/// Size, format and sampling of one attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDesc {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
}

/// Attachments making up the offscreen target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDesc {
    pub color: AttachmentDesc,
    pub depth_stencil: AttachmentDesc,
    /// Single-sample texture the colour attachment resolves into.
    pub resolve: Option<AttachmentDesc>,
}

impl TargetDesc {
    pub fn multisampled(
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let color = AttachmentDesc {
            width,
            height,
            format,
            sample_count,
        };
        Self {
            color,
            depth_stencil: AttachmentDesc {
                format: DepthBuffer::FORMAT,
                ..color
            },
            resolve: Some(AttachmentDesc {
                sample_count: 1,
                ..color
            }),
        }
    }

    /// Window surface drawn into by the scene pipelines, with a depth buffer
    /// sampled like them.
    pub fn direct(width: u32, height: u32, format: wgpu::TextureFormat, sample_count: u32) -> Self {
        let color = AttachmentDesc {
            width,
            height,
            format,
            sample_count,
        };
        Self {
            color,
            depth_stencil: AttachmentDesc {
                format: DepthBuffer::FORMAT,
                ..color
            },
            resolve: None,
        }
    }
}

/// Why an offscreen target cannot be rendered to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Incomplete {
    #[error("color attachment has zero area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },
    #[error("{attachment} attachment is {actual:?}, expected {expected:?} to match the color attachment")]
    SizeMismatch {
        attachment: &'static str,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("{attachment} attachment has {actual} samples, expected {expected}")]
    SampleMismatch {
        attachment: &'static str,
        expected: u32,
        actual: u32,
    },
    #[error("sample count {0} is not supported")]
    UnsupportedSampleCount(u32),
    #[error("depth attachment format {0:?} has no stencil aspect")]
    MissingStencil(wgpu::TextureFormat),
    #[error("multisampled color attachment has no resolve target")]
    MissingResolve,
    #[error("resolve target format {actual:?} differs from color format {expected:?}")]
    FormatMismatch {
        expected: wgpu::TextureFormat,
        actual: wgpu::TextureFormat,
    },
}

/// Checks that the attachments of `desc` can be used together.
pub fn check_completeness(desc: &TargetDesc) -> Result<(), Incomplete> {
    let color = desc.color;
    if color.width == 0 || color.height == 0 {
        return Err(Incomplete::ZeroArea {
            width: color.width,
            height: color.height,
        });
    }
    if !SUPPORTED_SAMPLE_COUNTS.contains(&color.sample_count) {
        return Err(Incomplete::UnsupportedSampleCount(color.sample_count));
    }

    let depth = desc.depth_stencil;
    same_size("depth/stencil", &color, &depth)?;
    if depth.sample_count != color.sample_count {
        return Err(Incomplete::SampleMismatch {
            attachment: "depth/stencil",
            expected: color.sample_count,
            actual: depth.sample_count,
        });
    }
    if !has_stencil(depth.format) {
        return Err(Incomplete::MissingStencil(depth.format));
    }

    match desc.resolve {
        None if color.sample_count > 1 => Err(Incomplete::MissingResolve),
        None => Ok(()),
        Some(resolve) => {
            same_size("resolve", &color, &resolve)?;
            if resolve.sample_count != 1 {
                return Err(Incomplete::SampleMismatch {
                    attachment: "resolve",
                    expected: 1,
                    actual: resolve.sample_count,
                });
            }
            if resolve.format != color.format {
                return Err(Incomplete::FormatMismatch {
                    expected: color.format,
                    actual: resolve.format,
                });
            }
            Ok(())
        }
    }
}

fn same_size(
    attachment: &'static str,
    color: &AttachmentDesc,
    other: &AttachmentDesc,
) -> Result<(), Incomplete> {
    if (other.width, other.height) == (color.width, color.height) {
        Ok(())
    } else {
        Err(Incomplete::SizeMismatch {
            attachment,
            expected: (color.width, color.height),
            actual: (other.width, other.height),
        })
    }
}

fn has_stencil(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Stencil8
            | wgpu::TextureFormat::Depth24PlusStencil8
            | wgpu::TextureFormat::Depth32FloatStencil8
    )
}

/// Multisampled colour + depth/stencil pair with a single-sample resolve.
pub(crate) struct OffscreenTarget {
    desc: TargetDesc,
    _color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth: DepthBuffer,
    _resolve: wgpu::Texture,
    pub resolve_view: wgpu::TextureView,
}

impl OffscreenTarget {
    pub fn new(device: &wgpu::Device, desc: TargetDesc) -> Self {
        match check_completeness(&desc) {
            Ok(()) => info!(
                "offscreen target {}x{} with {}x MSAA",
                desc.color.width, desc.color.height, desc.color.sample_count
            ),
            Err(err) => error!("offscreen framebuffer is not complete: {err}"),
        }

        let color = create_attachment(
            device,
            &desc.color,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
            "offscreen-color",
        );
        let depth = DepthBuffer::create(
            device,
            desc.depth_stencil.width,
            desc.depth_stencil.height,
            desc.depth_stencil.sample_count,
        );
        let resolve_desc = desc.resolve.unwrap_or(AttachmentDesc {
            sample_count: 1,
            ..desc.color
        });
        let resolve = create_attachment(
            device,
            &resolve_desc,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            "offscreen-resolve",
        );

        Self {
            desc,
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            _color: color,
            depth,
            resolve_view: resolve.create_view(&wgpu::TextureViewDescriptor::default()),
            _resolve: resolve,
        }
    }

    /// Colour attachment for the scene pass, resolving when multisampled.
    pub fn color_attachment(&self, clear: wgpu::Color) -> wgpu::RenderPassColorAttachment<'_> {
        let multisampled = self.desc.color.sample_count > 1;
        wgpu::RenderPassColorAttachment {
            view: if multisampled {
                &self.color_view
            } else {
                &self.resolve_view
            },
            resolve_target: multisampled.then_some(&self.resolve_view),
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                store: true,
            },
        }
    }
}

fn create_attachment(
    device: &wgpu::Device,
    desc: &AttachmentDesc,
    usage: wgpu::TextureUsages,
    label: &str,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: desc.width.max(1),
            height: desc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: desc.sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: desc.format,
        usage,
        view_formats: &[],
    })
}

/// Draws the resolved scene onto the window with the selected effect.
pub(crate) struct CompositePass {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform: wgpu::Buffer,
    quad: wgpu::Buffer,
}

impl CompositePass {
    pub fn new(
        device: &wgpu::Device,
        target: &OffscreenTarget,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("composite-shader"),
            source: wgpu::ShaderSource::Wgsl(COMPOSITE_SHADER.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<CompositeUniform>() as u64,
                        ),
                    },
                    count: None,
                },
            ],
        });

        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("composite-uniform"),
            contents: bytes_of(&CompositeUniform::new(PostEffect::PassThrough)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = create_sampler(device, false, "composite-sampler");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite-bind-group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&target.resolve_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("composite-pipeline-layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("composite-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[quad_vertex_layout()],
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("screen-quad"),
            contents: bytemuck::cast_slice(SCREEN_QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            pipeline,
            bind_group,
            uniform,
            quad,
        }
    }

    /// Uploads the effect selection; call before encoding the pass.
    pub fn set_effect(&self, queue: &wgpu::Queue, effect: PostEffect) {
        queue.write_buffer(&self.uniform, 0, bytes_of(&CompositeUniform::new(effect)));
    }

    /// Records the composite into `view` with no depth attachment.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("composite-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                    store: true,
                },
            })],
            depth_stencil_attachment: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..6, 0..1);
    }
}
