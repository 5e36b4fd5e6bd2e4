//! LLM連携モジュール

pub mod adapter;
pub mod auth;
pub mod client;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{AdapterFactory, ChatCompletion, HttpAdapterFactory};
pub use auth::{mask_secret, ApiKey, CredentialStore, KeyEdit};
pub use client::{ExtractionClient, Target};
pub use registry::{ModelPreset, Provider};
