//! Media extraction engine adapters
//!
//! The job manager never talks to a media site itself. Everything that needs
//! to understand a URL (probing metadata, picking streams, transferring bytes)
//! goes through the [`ExtractionEngine`] trait.
//!
//! ## Architecture
//!
//! - [`CliEngine`]: drives an installed `yt-dlp` binary through `tokio::process`
//! - [`NoOpEngine`]: stand-in when no binary is available; every call fails
//!   with a "not installed" error
//!
//! Stream selection for a requested quality lives in [`select_formats`] so it
//! can be tested without a binary.
//!
//! ## Usage
//!
//! ```no_run
//! use media_dl::engine::{CliEngine, ExtractionEngine, FetchRequest, ProgressSink};
//! use media_dl::QualitySpec;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = CliEngine::from_path().expect("yt-dlp binary not found");
//!
//!     let (sink, mut updates) = ProgressSink::channel();
//!     tokio::spawn(async move {
//!         while let Some(update) = updates.recv().await {
//!             println!("{update:?}");
//!         }
//!     });
//!
//!     let output = engine
//!         .fetch(
//!             FetchRequest {
//!                 url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
//!                 quality: QualitySpec::MaxHeight(720),
//!                 output_dir: PathBuf::from("./downloads"),
//!                 tag: "demo".into(),
//!             },
//!             sink,
//!         )
//!         .await?;
//!     println!("saved to {}", output.path.display());
//!
//!     Ok(())
//! }
//! ```

mod cli;
mod noop;
mod parser;
mod selection;
mod traits;

pub use cli::CliEngine;
pub use noop::NoOpEngine;
pub use parser::{OutputLine, classify_failure, parse_output_line, parse_probe_json};
pub use selection::{FormatSelection, fallback_selector, select_formats};
pub use traits::{
    EngineCapabilities, EngineUpdate, ExtractionEngine, FetchOutput, FetchRequest, ProgressSink,
};
