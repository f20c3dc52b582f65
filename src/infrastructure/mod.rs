pub mod llm_client;
pub mod throttle;

pub use llm_client::LlmClient;
pub use throttle::CallThrottle;
