// ── Infrastructure ───────────────────────────────────────────────────────────
pub mod http_client;
pub mod scrub;
pub mod traits;

// ── Decorator layers ────────────────────────────────────────────────────────
pub mod reliable;

// ── Provider implementations ────────────────────────────────────────────────
pub mod openai;

// ── Infrastructure re-exports ───────────────────────────────────────────────
pub use http_client::{build_provider_client, build_provider_client_with_timeout};
pub use scrub::{api_error, sanitize_api_error, scrub_secret_patterns};
pub use traits::{Provider, ResponseFormat};

// ── Provider re-exports ─────────────────────────────────────────────────────
pub use openai::OpenAiProvider;
pub use reliable::{BackoffPolicy, ReliableProvider};
