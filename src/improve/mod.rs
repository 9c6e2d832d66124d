//! Text improvement subsystem.
//!
//! A transcript never depends on this subsystem succeeding: [`TextImprover`]
//! is infallible and every failure path yields the raw text tagged
//! [`Provenance::Fallback`].  [`OllamaImprover`] is the production backend.

pub mod improver;
pub mod prompt;

pub use improver::{ImprovedResult, OllamaImprover, Provenance, TextImprover};
pub use prompt::{PromptTemplate, TemplateError, TEXT_PLACEHOLDER};

#[cfg(test)]
pub use improver::MockImprover;
