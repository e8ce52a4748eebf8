//! Inkwash - ink-wash brush painting on a raster canvas
//!
//! Pointer events go through the [`StrokeController`], which stamps brush
//! masks along the path and, once a wet stroke ends, lets the ink bleed into
//! the paper with an edge-preserving diffusion pass.

pub mod brush;
pub mod canvas;
pub mod config;
pub mod controller;
pub mod diffusion;
pub mod error;
pub mod stroke;
pub mod worker;

pub use brush::{AngleMode, BrushMaskLibrary, BrushParameters, BrushType};
pub use canvas::{ExportFormat, PixelCanvas, Rect, ViewportTransform};
pub use config::InkConfig;
pub use controller::{HistoryFlags, StrokeController, StrokeOutcome};
pub use diffusion::DiffusionEngine;
pub use error::{InkError, InkResult};
pub use stroke::{StrokePoint, StrokeRasterizer, StrokeSession, Tool};
pub use worker::SharedController;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkwash=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    tracing::info!("Inkwash initializing...");
}
