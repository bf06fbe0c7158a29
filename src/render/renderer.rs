use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::bytes_of;
use log::{error, info, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use super::gpu_texture::{create_sampler, DepthBuffer, GpuTexture};
use super::mesh::{fallback_cube, scene_vertex_layout, MeshBuffers};
use super::offscreen::{CompositePass, OffscreenTarget, TargetDesc};
use super::shaders::{emissive_shader, lit_shader};
use super::uniforms::{FrameUniform, MaterialUniform, ObjectUniform};
use crate::app::{FramePlan, PostEffect};
use crate::assets::{AssetRoot, ModelData};
use crate::config::PipelineStages;
use crate::obj::{Material, ObjMesh};
use crate::scene::{DrawItem, ModelId, Shading};
use crate::texture::TextureImage;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.05,
    a: 1.0,
};

/// GPU renderer backed by wgpu that draws the room described by a [`FramePlan`].
pub struct Renderer {
    // Declared before `window` so the surface is dropped first.
    surface: wgpu::Surface,
    window: Arc<Window>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    lit_pipeline: wgpu::RenderPipeline,
    emissive_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    models: HashMap<ModelId, LoadedModel>,
    /// Samples per pixel of the scene pipelines and their depth buffer.
    sample_count: u32,
    target: SceneTarget,
}

/// Where the scene pass draws.
enum SceneTarget {
    Direct {
        depth: DepthBuffer,
    },
    Offscreen {
        target: OffscreenTarget,
        composite: CompositePass,
    },
}

struct LoadedModel {
    parts: Vec<ModelPart>,
    materials: Vec<wgpu::BindGroup>,
}

/// Sub-mesh drawn with one entry of [`LoadedModel::materials`].
struct ModelPart {
    mesh: MeshBuffers,
    material: usize,
}

impl Renderer {
    /// Initializes the GPU renderer for `window` and uploads every model.
    pub async fn new(
        window: Arc<Window>,
        stages: PipelineStages,
        assets: &AssetRoot,
    ) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        // SAFETY: the renderer owns an `Arc` of the window and drops the
        // surface before it.
        let surface = unsafe { instance.create_surface(window.as_ref()) }
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("renderer-device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no texture formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        info!(
            "surface {}x{} {:?} via {:?}",
            size.width,
            size.height,
            surface_format,
            adapter.get_info().backend
        );

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame-bind-layout"),
            entries: &[uniform_entry::<FrameUniform>(0)],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object-bind-layout"),
            entries: &[uniform_entry::<ObjectUniform>(0)],
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material-bind-layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                uniform_entry::<MaterialUniform>(3),
            ],
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame-uniform"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bind-group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let samples = stages.scene_samples();
        let lit_pipeline = create_scene_pipeline(
            &device,
            "lit",
            &lit_shader(),
            &[&frame_layout, &object_layout, &material_layout],
            surface_format,
            samples,
        );
        let emissive_pipeline = create_scene_pipeline(
            &device,
            "emissive",
            &emissive_shader(),
            &[&frame_layout, &object_layout],
            surface_format,
            samples,
        );

        let target = if stages.post_process {
            let target = OffscreenTarget::new(
                &device,
                TargetDesc::multisampled(size.width, size.height, surface_format, samples),
            );
            let composite = CompositePass::new(&device, &target, surface_format);
            SceneTarget::Offscreen { target, composite }
        } else {
            SceneTarget::Direct {
                depth: direct_depth(&device, size, surface_format, samples),
            }
        };

        let sampler = create_sampler(&device, true, "material-sampler");
        let models = ModelId::ALL
            .into_iter()
            .map(|id| {
                let model =
                    load_model(&device, &queue, assets, id, &material_layout, &sampler);
                (id, model)
            })
            .collect();

        Ok(Self {
            surface,
            window,
            device,
            queue,
            config,
            size,
            lit_pipeline,
            emissive_pipeline,
            frame_buffer,
            frame_bind_group,
            object_layout,
            models,
            sample_count: samples,
            target,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Exposes the inner window for event handling.
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Width over height of the surface.
    pub fn aspect(&self) -> f32 {
        self.size.width as f32 / self.size.height.max(1) as f32
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Resizes the swap chain. The offscreen target keeps its start-up size.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        if let SceneTarget::Direct { depth } = &mut self.target {
            *depth = direct_depth(&self.device, new_size, self.config.format, self.sample_count);
        }
    }

    /// Uploads the frame uniforms, then draws and presents one frame.
    pub fn render(&mut self, plan: &FramePlan) -> Result<(), wgpu::SurfaceError> {
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytes_of(&FrameUniform::new(plan)));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("renderer-encoder"),
            });

        let object_groups: Vec<_> = plan
            .draws
            .iter()
            .map(|item| self.object_bind_group(item))
            .collect();

        match &self.target {
            SceneTarget::Direct { depth } => {
                let color = wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: true,
                    },
                };
                self.encode_scene(&mut encoder, color, &depth.view, &plan.draws, &object_groups);
            }
            SceneTarget::Offscreen { target, composite } => {
                composite.set_effect(
                    &self.queue,
                    plan.effect.unwrap_or(PostEffect::PassThrough),
                );
                self.encode_scene(
                    &mut encoder,
                    target.color_attachment(CLEAR_COLOR),
                    &target.depth.view,
                    &plan.draws,
                    &object_groups,
                );
                composite.encode(&mut encoder, &view);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn object_bind_group(&self, item: &DrawItem) -> wgpu::BindGroup {
        let object_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("object-uniform"),
                contents: bytes_of(&ObjectUniform::new(item.transform)),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object-bind-group"),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: object_buffer.as_entire_binding(),
            }],
        })
    }

    fn encode_scene(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color: wgpu::RenderPassColorAttachment<'_>,
        depth_view: &wgpu::TextureView,
        draws: &[DrawItem],
        object_groups: &[wgpu::BindGroup],
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene-pass"),
            color_attachments: &[Some(color)],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: true,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: true,
                }),
            }),
        });

        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        for (item, object_group) in draws.iter().zip(object_groups) {
            let Some(model) = self.models.get(&item.model) else {
                continue;
            };
            let lit = item.shading == Shading::Lit;
            pass.set_pipeline(if lit {
                &self.lit_pipeline
            } else {
                &self.emissive_pipeline
            });
            pass.set_bind_group(1, object_group, &[]);
            for part in &model.parts {
                if lit {
                    pass.set_bind_group(2, &model.materials[part.material], &[]);
                }
                pass.set_vertex_buffer(0, part.mesh.vertex.slice(..));
                pass.set_index_buffer(part.mesh.index.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..part.mesh.index_count, 0, 0..1);
            }
        }
    }
}

fn uniform_entry<T>(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn create_scene_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    format: wgpu::TextureFormat,
    sample_count: u32,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{label}-shader")),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{label}-pipeline-layout")),
        bind_group_layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{label}-pipeline")),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[scene_vertex_layout()],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            ..Default::default()
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
    })
}

fn direct_depth(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
    format: wgpu::TextureFormat,
    sample_count: u32,
) -> DepthBuffer {
    let desc = TargetDesc::direct(size.width, size.height, format, sample_count);
    let depth = desc.depth_stencil;
    DepthBuffer::create(device, depth.width, depth.height, depth.sample_count)
}

fn load_model(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    assets: &AssetRoot,
    id: ModelId,
    material_layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
) -> LoadedModel {
    let label = id.label();
    let data = match assets.load_model(id) {
        Ok(data) => {
            info!(
                "loaded {label}: {} sub-meshes, {} materials, {} vertices, {} indices",
                data.meshes.len(),
                data.materials.len(),
                data.vertex_count(),
                data.index_count()
            );
            data
        }
        Err(err) => {
            error!("failed to load model {label}: {err:?}");
            ModelData {
                meshes: Vec::new(),
                materials: Vec::new(),
                base_dir: Default::default(),
            }
        }
    };

    let mut materials: Vec<_> = data
        .materials
        .iter()
        .enumerate()
        .map(|(index, material)| {
            let diffuse = data
                .diffuse_path(index)
                .map(|path| load_texture(assets, &path, TextureImage::fallback_diffuse))
                .unwrap_or_else(TextureImage::fallback_diffuse);
            let specular = data
                .specular_path(index)
                .map(|path| load_texture(assets, &path, TextureImage::fallback_specular))
                .unwrap_or_else(TextureImage::fallback_specular);
            let label = format!("{label}-{}", material.name);
            material_bind_group(
                device,
                queue,
                material_layout,
                sampler,
                &label,
                material,
                [&diffuse, &specular],
            )
        })
        .collect();

    // Sub-meshes without a material share an untextured one appended last.
    let fallback = materials.len();
    let meshes: Vec<(ObjMesh, usize)> = if data.meshes.is_empty() {
        vec![(fallback_cube(), fallback)]
    } else {
        data.meshes
            .into_iter()
            .map(|sub| (sub.mesh, sub.material.unwrap_or(fallback)))
            .collect()
    };
    if meshes.iter().any(|(_, material)| *material == fallback) {
        materials.push(material_bind_group(
            device,
            queue,
            material_layout,
            sampler,
            &format!("{label}-default"),
            &Material::default(),
            [&TextureImage::fallback_diffuse(), &TextureImage::fallback_specular()],
        ));
    }

    let parts = meshes
        .into_iter()
        .enumerate()
        .map(|(index, (mesh, material))| ModelPart {
            mesh: MeshBuffers::from_mesh(device, &mesh, &format!("{label}-{index}")),
            material,
        })
        .collect();
    LoadedModel { parts, materials }
}

fn material_bind_group(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    label: &str,
    material: &Material,
    [diffuse, specular]: [&TextureImage; 2],
) -> wgpu::BindGroup {
    let diffuse = GpuTexture::from_image(device, queue, diffuse, true, &format!("{label}-diffuse"));
    let specular =
        GpuTexture::from_image(device, queue, specular, false, &format!("{label}-specular"));
    let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label}-uniform")),
        contents: bytes_of(&MaterialUniform::new(material.diffuse_color)),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&diffuse.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&specular.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: uniform.as_entire_binding(),
            },
        ],
    })
}

fn load_texture(assets: &AssetRoot, path: &Path, fallback: fn() -> TextureImage) -> TextureImage {
    assets.load_texture(path).unwrap_or_else(|err| {
        warn!("using fallback for texture {}: {err:#}", path.display());
        fallback()
    })
}
