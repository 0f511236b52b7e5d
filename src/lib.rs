pub mod config;
pub mod error;

// Pipeline stages
pub mod record;
pub mod aggregate;
pub mod encoding;
pub mod mesh;
pub mod summit;
pub mod scene;

pub mod dataset;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use config::TerrainConfig;
pub use error::PipelineError;
pub use record::{NormalizedRecord, RawRecord};
pub use scene::TerrainScene;
