//! Narration providers and the service that selects between them.

pub mod credentials;
pub mod elevenlabs;
pub mod local;
pub mod native;
pub mod openai;
pub mod progress;
pub mod provider;
pub mod service;
pub mod wav;

pub use credentials::{ApiKeys, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use progress::{ProgressEvent, ProgressHub};
pub use provider::{ProviderDescriptor, ProviderId, SpeakOptions, Voice, VoiceProvider};
pub use service::{VoiceService, VoiceServiceOpts};
