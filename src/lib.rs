pub mod builder;
pub mod client;
pub mod digest;
pub mod error;
pub mod fetcher;
pub mod manifest;
pub mod models;
pub mod reference;
pub mod runtime;
pub mod spec;
pub mod store;

// Re-export the main types for convenience
pub use builder::ArtifactBuilder;
pub use client::{BasicCredentials, ClientOptions, RegistryClient};
pub use digest::OciDigest;
pub use error::{Error, Result};
pub use fetcher::ArtifactFetcher;
pub use manifest::{ArtifactManifest, BuildOptions};
pub use models::{Artifact, Descriptor, Layer};
pub use reference::Reference;
pub use spec::RuntimeSpec;
pub use store::MemoryStore;
