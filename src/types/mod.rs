// Public modules
pub mod chat_message;
pub mod chat_session;
pub mod message_create_params;
pub mod stream_frame;

// Re-exports
pub use chat_message::{ChatMessage, MessageRole, MessageStatus};
pub use chat_session::ChatSession;
pub use message_create_params::MessageCreateParams;
pub use stream_frame::StreamFrame;
