// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod frames;
pub mod observability;
pub mod orchestrator;
pub mod reconcile;
pub mod render;
pub mod session;
pub mod types;

// Re-exports
pub use client::{ByteStream, ChatApi, Composer};
pub use client_logger::ClientLogger;
pub use error::{Error, Result};
pub use frames::{FrameDecoder, Frames, process_frames};
pub use observability::register_biometrics;
pub use orchestrator::{SendOrchestrator, SendOutcome, SendReport};
pub use reconcile::{ConversationState, FrameEffect, reconcile};
pub use render::{ConversationView, PlainTextRenderer};
pub use session::SessionManager;
pub use types::*;
