pub mod config;
pub mod conversation;
pub mod lifecycle;
pub mod markdown;
pub mod message;
pub mod sanitize;
pub mod transport;

// Re-export main types for convenience
pub use config::{Config, ConfigError};
pub use conversation::Conversation;
pub use lifecycle::{ChatState, Completion, PendingQuery, RequestState, FALLBACK_MESSAGE};
pub use markdown::{Block, Document, Inline};
pub use message::{IdGenerator, Message, MessageId, Sender};
pub use sanitize::{sanitize, SanitizedDocument};
pub use transport::{HttpTransport, Transport, TransportError};
