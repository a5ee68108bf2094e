use serde::{Deserialize, Serialize};

pub mod openai;

/// Plain-text transcript returned by a hosted speech-to-text API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub language: Option<String>,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
