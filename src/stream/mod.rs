//! Stream resolution pipeline
//!
//! - Probe: first-success probing over ordered candidates
//! - Normalize: upstream shape rules into canonical sources
//! - Rewrite: segmented playlists routed through the rewriting proxy
//! - Language: keyword filter over source labels
//! - Resolver: the whole pipeline plus the canned fallback

pub mod language;
pub mod normalize;
pub mod probe;
pub mod resolver;
pub mod rewrite;

pub use resolver::{InputError, StreamQuery, StreamRequest, StreamResolver};
pub use rewrite::ProxyRewriter;
