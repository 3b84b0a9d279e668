use std::time::Duration;

// Window
pub const WINDOW_TITLE: &str = "pulsefield";
pub const WINDOW_WIDTH: u32 = 1280;
pub const WINDOW_HEIGHT: u32 = 720;

// Feed polling
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const POLL_THREAD_NAME: &str = "feed-poller";
/// Silence between demo tracks, reported as "no track".
pub const DEMO_GAP: Duration = Duration::from_secs(4);

// Render targets
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};
