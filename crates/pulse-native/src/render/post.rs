use super::helpers;
use super::targets::RenderTargets;
use crate::constants::{CLEAR_COLOR, HDR_FORMAT};
use pulse_core::constants::{BLOOM_RADIUS, BLOOM_THRESHOLD};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct PostUniforms {
    texel: [f32; 2],
    blur_dir: [f32; 2],
    bloom_strength: f32,
    bloom_radius: f32,
    threshold: f32,
    _pad: f32,
}

/// Which uniform block a pass reads; each gets its own buffer because all
/// writes land before the encoder is submitted.
#[derive(Clone, Copy)]
enum Stage {
    Base,
    BlurH,
    BlurV,
}

impl Stage {
    const ALL: [Stage; 3] = [Stage::Base, Stage::BlurH, Stage::BlurV];

    fn blur_dir(self) -> [f32; 2] {
        match self {
            Stage::Base => [0.0, 0.0],
            Stage::BlurH => [1.0, 0.0],
            Stage::BlurV => [0.0, 1.0],
        }
    }
}

pub(crate) struct PostResources {
    bgl0: wgpu::BindGroupLayout, // tex+sampler+uniform
    bgl1: wgpu::BindGroupLayout, // tex+sampler
    sampler: wgpu::Sampler,
    uniforms: [wgpu::Buffer; 3],
    bright_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
}

/// Bind groups that reference the current [`RenderTargets`]; rebuilt on
/// resize.
pub(crate) struct PostBindings {
    hdr: wgpu::BindGroup,
    from_bloom_a: wgpu::BindGroup,
    from_bloom_b: wgpu::BindGroup,
    bloom_a_only: wgpu::BindGroup,
}

impl PostResources {
    pub(crate) fn new(device: &wgpu::Device, swap_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("post_shader"),
            source: wgpu::ShaderSource::Wgsl(pulse_core::POST_WGSL.into()),
        });
        let bgl0 = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post_bgl0"),
            entries: &[
                helpers::texture_entry(0),
                helpers::sampler_entry(1),
                helpers::uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let bgl1 = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post_bgl1"),
            entries: &[helpers::texture_entry(0), helpers::sampler_entry(1)],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post_linear"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let make_uniform = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<PostUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let uniforms = [
            make_uniform("post_uniforms"),
            make_uniform("post_uniforms_h"),
            make_uniform("post_uniforms_v"),
        ];

        let pl_single = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pl_post_0"),
            bind_group_layouts: &[&bgl0],
            push_constant_ranges: &[],
        });
        let pl_composite = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pl_post_comp"),
            bind_group_layouts: &[&bgl0, &bgl1],
            push_constant_ranges: &[],
        });
        let bright_pipeline =
            helpers::make_post_pipeline(device, &pl_single, &shader, "fs_bright", HDR_FORMAT);
        let blur_pipeline =
            helpers::make_post_pipeline(device, &pl_single, &shader, "fs_blur", HDR_FORMAT);
        let composite_pipeline = helpers::make_post_pipeline(
            device,
            &pl_composite,
            &shader,
            "fs_composite",
            swap_format,
        );

        Self {
            bgl0,
            bgl1,
            sampler,
            uniforms,
            bright_pipeline,
            blur_pipeline,
            composite_pipeline,
        }
    }

    pub(crate) fn bind(&self, device: &wgpu::Device, targets: &RenderTargets) -> PostBindings {
        let with_uniform = |label: &str, view: &wgpu::TextureView, stage: Stage| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.bgl0,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.uniforms[stage as usize].as_entire_binding(),
                    },
                ],
            })
        };
        PostBindings {
            hdr: with_uniform("bg_hdr", &targets.hdr_view, Stage::Base),
            from_bloom_a: with_uniform("bg_from_bloom_a", &targets.bloom_a_view, Stage::BlurH),
            from_bloom_b: with_uniform("bg_from_bloom_b", &targets.bloom_b_view, Stage::BlurV),
            bloom_a_only: device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("bg_bloom_a_only"),
                layout: &self.bgl1,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&targets.bloom_a_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            }),
        }
    }

    /// Bright pass, two blur passes and the composite onto `swap_view`.
    pub(crate) fn encode(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        bindings: &PostBindings,
        swap_view: &wgpu::TextureView,
        bloom_strength: f32,
    ) {
        let (bw, bh) = targets.bloom_size;
        for stage in Stage::ALL {
            let u = PostUniforms {
                texel: [1.0 / bw as f32, 1.0 / bh as f32],
                blur_dir: stage.blur_dir(),
                bloom_strength,
                bloom_radius: BLOOM_RADIUS,
                threshold: BLOOM_THRESHOLD,
                _pad: 0.0,
            };
            queue.write_buffer(&self.uniforms[stage as usize], 0, bytemuck::bytes_of(&u));
        }

        blit(
            encoder,
            "bright_pass",
            &targets.bloom_a_view,
            &self.bright_pipeline,
            &bindings.hdr,
            None,
        );
        blit(
            encoder,
            "blur_h",
            &targets.bloom_b_view,
            &self.blur_pipeline,
            &bindings.from_bloom_a,
            None,
        );
        blit(
            encoder,
            "blur_v",
            &targets.bloom_a_view,
            &self.blur_pipeline,
            &bindings.from_bloom_b,
            None,
        );
        blit(
            encoder,
            "composite",
            swap_view,
            &self.composite_pipeline,
            &bindings.hdr,
            Some(&bindings.bloom_a_only),
        );
    }
}

fn blit(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bg0: &wgpu::BindGroup,
    bg1: Option<&wgpu::BindGroup>,
) {
    let mut r = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    r.set_pipeline(pipeline);
    r.set_bind_group(0, bg0, &[]);
    if let Some(g1) = bg1 {
        r.set_bind_group(1, g1, &[]);
    }
    r.draw(0..3, 0..1);
}
