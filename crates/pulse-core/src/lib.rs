pub mod clock;
pub mod color;
pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod feed;
pub mod field;
pub mod geometry;
pub mod scene;
pub mod state;
pub mod traces;

pub static SCENE_WGSL: &str = include_str!("../shaders/scene.wgsl");
pub static POST_WGSL: &str = include_str!("../shaders/post.wgsl");

pub use clock::*;
pub use color::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use feed::*;
pub use field::*;
pub use geometry::*;
pub use scene::*;
pub use state::*;
pub use traces::*;
