// Attribution judges: trait-based abstraction for swappable backends.
//
// NliJudge classifies locally against {"yes", "no"} with a zero-shot NLI
// model. LlmJudge hands the question to a remote chat-completions service.
// The backend is chosen once at startup; the pipeline only sees the trait.

pub mod chat;
pub mod classifier;
pub mod llm;
pub mod nli;
pub mod traits;

pub use chat::{ChatClient, ChatMessage, ChatRequest, OpenAiChatClient};
pub use classifier::{LabelScore, OnnxNliClassifier, ZeroShotClassifier};
pub use llm::{LlmJudge, LlmSettings};
pub use nli::NliJudge;
pub use traits::{AttributionJudge, Verdict};
