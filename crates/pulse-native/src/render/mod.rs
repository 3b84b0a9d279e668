//! wgpu implementation of [`RenderSurface`]: scene pass into an HDR target,
//! then the bloom chain onto the swapchain.

mod helpers;
mod post;
mod scene_pass;
mod targets;

use post::{PostBindings, PostResources};
use pulse_core::{RenderSurface, SceneState, SurfaceError, Viewport};
use scene_pass::ScenePass;
use std::sync::Arc;
use targets::RenderTargets;
use winit::window::Window;

struct Gpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    targets: RenderTargets,
    scene: ScenePass,
    post: PostResources,
    post_bindings: PostBindings,
}

impl Gpu {
    async fn new(
        window: Arc<Window>,
        size: Viewport,
        particle_capacity: usize,
        trace_capacity: usize,
    ) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No GPU adapter"))?;
        log::info!("[gpu] adapter {:?}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            desired_maximum_frame_latency: 2,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let targets = RenderTargets::new(&device, config.width, config.height);
        let scene = ScenePass::new(&device, particle_capacity, trace_capacity);
        let post = PostResources::new(&device, format);
        let post_bindings = post.bind(&device, &targets);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            targets,
            scene,
            post,
            post_bindings,
        })
    }

    fn reconfigure(&mut self, size: Viewport) {
        self.config.width = size.width.max(1);
        self.config.height = size.height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.targets = RenderTargets::new(&self.device, self.config.width, self.config.height);
        self.post_bindings = self.post.bind(&self.device, &self.targets);
    }

    fn render(&mut self, scene: &SceneState) -> Result<(), SurfaceError> {
        let frame = self.surface.get_current_texture().map_err(|e| match e {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceError::Lost,
            other => SurfaceError::Submit(other.to_string()),
        })?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        self.scene
            .encode(&self.device, &self.queue, &mut encoder, &self.targets, scene);
        self.post.encode(
            &self.queue,
            &mut encoder,
            &self.targets,
            &self.post_bindings,
            &view,
            scene.bloom,
        );

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

/// Window-backed surface. The GPU side is created in
/// [`RenderSurface::create_surface`] and dropped in
/// [`RenderSurface::destroy_surface`].
pub struct GpuSurface {
    window: Arc<Window>,
    particle_capacity: usize,
    trace_capacity: usize,
    gpu: Option<Gpu>,
}

impl GpuSurface {
    pub fn new(window: Arc<Window>, particle_capacity: usize, trace_capacity: usize) -> Self {
        Self {
            window,
            particle_capacity,
            trace_capacity,
            gpu: None,
        }
    }
}

impl RenderSurface for GpuSurface {
    fn create_surface(&mut self, size: Viewport) -> Result<(), SurfaceError> {
        let gpu = pollster::block_on(Gpu::new(
            self.window.clone(),
            size,
            self.particle_capacity,
            self.trace_capacity,
        ))
        .map_err(|e| SurfaceError::Unavailable(format!("{e:#}")))?;
        self.gpu = Some(gpu);
        Ok(())
    }

    fn resize(&mut self, size: Viewport) -> Result<(), SurfaceError> {
        let gpu = self
            .gpu
            .as_mut()
            .ok_or_else(|| SurfaceError::Unavailable("surface not created".into()))?;
        gpu.reconfigure(size);
        Ok(())
    }

    fn submit(&mut self, scene: &SceneState) -> Result<(), SurfaceError> {
        match self.gpu.as_mut() {
            Some(gpu) => gpu.render(scene),
            None => Err(SurfaceError::Unavailable("surface not created".into())),
        }
    }

    fn destroy_surface(&mut self) {
        if self.gpu.take().is_some() {
            log::info!("[gpu] surface released");
        }
    }
}
