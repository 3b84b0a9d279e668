mod constants;
mod poller;
mod render;
mod scheduler;

use constants::{WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH};
use poller::{demo_tracks, DemoPlaylist, FeedPoller};
use pulse_core::{EngineConfig, FeedCell, TrackInfo, Viewport, Visualizer, WallClock};
use render::GpuSurface;
use scheduler::RedrawScheduler;
use std::sync::Arc;
use winit::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::{Window, WindowBuilder},
};

/// Keeps the window title in step with the playing track.
struct TitleBar {
    tracks: Vec<TrackInfo>,
    shown: Option<String>,
}

impl TitleBar {
    fn update(&mut self, window: &Window, now_playing: Option<&str>) {
        if self.shown.as_deref() == now_playing {
            return;
        }
        self.shown = now_playing.map(str::to_string);
        let title = match now_playing {
            Some(id) => {
                let name = self
                    .tracks
                    .iter()
                    .find(|t| t.id == id)
                    .map_or(id, |t| t.name.as_str());
                format!("{WINDOW_TITLE} - {name}")
            }
            None => format!("{WINDOW_TITLE} - nothing playing"),
        };
        window.set_title(&title);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("pulse-native starting");

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .build(&event_loop)?,
    );

    let config = EngineConfig::default();
    let feed = Arc::new(FeedCell::new());
    let surface = GpuSurface::new(window.clone(), config.particle_count, config.trace_capacity);
    let scheduler = RedrawScheduler::new(window.clone());
    let mut vis = Visualizer::new(config, surface, scheduler, feed.clone());

    let size = window.inner_size();
    vis.start(Viewport::new(size.width, size.height))?;

    let tracks = demo_tracks();
    let poller = FeedPoller::spawn(DemoPlaylist::new(tracks.clone()), feed)?;
    vis.attach_poll(Box::new(poller));

    let clock = WallClock::new();
    let mut title = TitleBar {
        tracks,
        shown: None,
    };

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        let Event::WindowEvent { event, window_id } = event else {
            return;
        };
        if window_id != window.id() {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                vis.stop();
                elwt.exit();
            }
            WindowEvent::Resized(size) => {
                if let Err(e) = vis.resize(Viewport::new(size.width, size.height)) {
                    log::error!("[window] {}", e);
                    elwt.exit();
                }
            }
            WindowEvent::RedrawRequested => {
                vis.tick(clock.now_secs());
                title.update(&window, vis.now_playing());
            }
            _ => {}
        }
    })?;
    Ok(())
}
