use super::helpers::{self, ADDITIVE};
use super::targets::RenderTargets;
use crate::constants::{CLEAR_COLOR, DEPTH_FORMAT, HDR_FORMAT};
use pulse_core::{Mesh, ParticleInstance, SceneState, SceneUniforms, TraceVertex};
use wgpu::util::DeviceExt;

struct CoreBuffers {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

/// Draws the energy core, the particle field and the light traces into the
/// HDR target.
pub(crate) struct ScenePass {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    core_pipeline: wgpu::RenderPipeline,
    particle_pipeline: wgpu::RenderPipeline,
    trace_pipeline: wgpu::RenderPipeline,
    particle_vb: wgpu::Buffer,
    particle_capacity: usize,
    trace_vb: wgpu::Buffer,
    trace_capacity: usize,
    // Uploaded from the first scene, which carries the mesh.
    core: Option<CoreBuffers>,
}

impl ScenePass {
    pub(crate) fn new(device: &wgpu::Device, particle_capacity: usize, trace_capacity: usize) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(pulse_core::SCENE_WGSL.into()),
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene_uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_bgl"),
            entries: &[helpers::uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_bg"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let core_layout = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 3]>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 0,
            }],
        }];
        let particle_layout = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32,
                    offset: 12,
                    shader_location: 1,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x4,
                    offset: 16,
                    shader_location: 2,
                },
            ],
        }];
        let trace_layout = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TraceVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 12,
                    shader_location: 1,
                },
            ],
        }];

        let core_pipeline = make_pipeline(
            device,
            &layout,
            &shader,
            ("vs_core", "fs_core"),
            &core_layout,
            wgpu::PrimitiveTopology::TriangleList,
            Some(wgpu::BlendState::REPLACE),
            true,
        );
        let particle_pipeline = make_pipeline(
            device,
            &layout,
            &shader,
            ("vs_particle", "fs_particle"),
            &particle_layout,
            wgpu::PrimitiveTopology::TriangleList,
            Some(ADDITIVE),
            false,
        );
        let trace_pipeline = make_pipeline(
            device,
            &layout,
            &shader,
            ("vs_trace", "fs_trace"),
            &trace_layout,
            wgpu::PrimitiveTopology::LineList,
            Some(ADDITIVE),
            false,
        );

        let particle_vb = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particle_vb"),
            size: (std::mem::size_of::<ParticleInstance>() * particle_capacity.max(1)) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let trace_vb = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("trace_vb"),
            size: (std::mem::size_of::<TraceVertex>() * 2 * trace_capacity.max(1)) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            uniform_buffer,
            bind_group,
            core_pipeline,
            particle_pipeline,
            trace_pipeline,
            particle_vb,
            particle_capacity,
            trace_vb,
            trace_capacity,
            core: None,
        }
    }

    fn upload_core(device: &wgpu::Device, mesh: &Mesh) -> CoreBuffers {
        CoreBuffers {
            vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("core_vb"),
                contents: bytemuck::cast_slice(&mesh.positions),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("core_ib"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: mesh.indices.len() as u32,
        }
    }

    pub(crate) fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        scene: &SceneState,
    ) {
        if self.core.is_none() {
            self.core = Some(Self::upload_core(device, &scene.core_mesh));
        }
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&scene.uniforms()));

        let particles = &scene.particles[..scene.particles.len().min(self.particle_capacity)];
        queue.write_buffer(&self.particle_vb, 0, bytemuck::cast_slice(particles));

        // The whole store goes up so zeroed tail slots replace stale ones.
        let trace_vertices = scene.traces.vertices();
        let trace_vertices = &trace_vertices[..trace_vertices.len().min(self.trace_capacity * 2)];
        queue.write_buffer(&self.trace_vb, 0, bytemuck::cast_slice(trace_vertices));
        let trace_vertex_count = (scene.traces.live_count() * 2).min(trace_vertices.len()) as u32;

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.hdr_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_bind_group(0, &self.bind_group, &[]);

        if let Some(core) = &self.core {
            rpass.set_pipeline(&self.core_pipeline);
            rpass.set_vertex_buffer(0, core.vertices.slice(..));
            rpass.set_index_buffer(core.indices.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..core.index_count, 0, 0..1);
        }

        if !particles.is_empty() {
            rpass.set_pipeline(&self.particle_pipeline);
            rpass.set_vertex_buffer(0, self.particle_vb.slice(..));
            rpass.draw(0..6, 0..particles.len() as u32);
        }

        if trace_vertex_count > 0 {
            rpass.set_pipeline(&self.trace_pipeline);
            rpass.set_vertex_buffer(0, self.trace_vb.slice(..));
            rpass.draw(0..trace_vertex_count, 0..1);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn make_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    (vs, fs): (&str, &str),
    buffers: &[wgpu::VertexBufferLayout],
    topology: wgpu::PrimitiveTopology,
    blend: Option<wgpu::BlendState>,
    depth_write: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(vs),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(vs),
            buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs),
            targets: &[Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        cache: None,
        multiview: None,
    })
}
