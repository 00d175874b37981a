//! Stream module - Streaming code analysis
//!
//! It handles:
//! - Framing the analysis event stream (`decoder`)
//! - Applying events to the visible analysis text (`consumer`)
//! - Opening the stream over HTTP (`transport`)
//!
//! The stream module does NOT:
//! - Retry or resume broken streams
//! - Render anything; renderers subscribe to `AnalysisView` updates

pub mod consumer;
pub mod decoder;
pub mod transport;

// Re-exports
pub use consumer::{
    AnalysisEnd, AnalysisRequest, AnalysisStreamConsumer, AnalysisTransport, AnalysisView,
    ByteStream,
};
pub use decoder::{Feed, StreamEventDecoder, StructuredEvent};
pub use transport::HttpAnalysisTransport;
