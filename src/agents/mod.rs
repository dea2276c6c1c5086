//! Domain agents dispatched by the capability registry.
//!
//! Every agent consumes an [`AgentMessage`] whose content is the resolved step
//! input and produces one variant of the closed [`AgentOutput`] union.

pub mod deps;
pub mod librarian;
pub mod researcher;
pub mod sanitize;
pub mod summarizer;
pub mod traits;
pub mod types;
pub mod writer;

pub use deps::{BoundDependencies, Dependency, Namespaces, SharedDependencies};
pub use librarian::LibrarianAgent;
pub use researcher::ResearcherAgent;
pub use summarizer::SummarizerAgent;
pub use traits::{Agent, InputSpec, parse_input};
pub use types::{AgentMessage, AgentOutput, PROTOCOL_VERSION, TextSource};
pub use writer::WriterAgent;
