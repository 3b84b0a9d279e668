use super::helpers;
use crate::constants::{DEPTH_FORMAT, HDR_FORMAT};

/// Offscreen targets for one frame.
///
/// - `hdr` holds the scene color in Rgba16Float for post-processing.
/// - `depth` is the scene depth buffer; the core writes it, additive
///   particles and traces only test against it.
/// - `bloom_a`/`bloom_b` are half-res ping-pong buffers for bright pass
///   and blur.
pub(crate) struct RenderTargets {
    pub(crate) hdr_view: wgpu::TextureView,
    pub(crate) depth_view: wgpu::TextureView,
    pub(crate) bloom_a_view: wgpu::TextureView,
    pub(crate) bloom_b_view: wgpu::TextureView,
    pub(crate) bloom_size: (u32, u32),
    _textures: [wgpu::Texture; 4],
}

impl RenderTargets {
    pub(crate) fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let sampled = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let (hdr_tex, hdr_view) =
            helpers::create_texture(device, "hdr_tex", width, height, HDR_FORMAT, sampled);
        let (depth_tex, depth_view) = helpers::create_texture(
            device,
            "depth_tex",
            width,
            height,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let bw = (width.max(1) / 2).max(1);
        let bh = (height.max(1) / 2).max(1);
        let (bloom_a, bloom_a_view) =
            helpers::create_texture(device, "bloom_a", bw, bh, HDR_FORMAT, sampled);
        let (bloom_b, bloom_b_view) =
            helpers::create_texture(device, "bloom_b", bw, bh, HDR_FORMAT, sampled);
        Self {
            hdr_view,
            depth_view,
            bloom_a_view,
            bloom_b_view,
            bloom_size: (bw, bh),
            _textures: [hdr_tex, depth_tex, bloom_a, bloom_b],
        }
    }
}
