//! remedy: one photo of failing equipment plus a knowledge excerpt in, a
//! prioritized remediation plan out.
//!
//! Flow: [`workbench`] collects the inputs (file or [`capture`] still),
//! [`analysis`] composes one multimodal request and validates the answer,
//! [`llm`] carries it to the provider, and [`render`] lays out the plan.
//! Suggested commands are only displayed, never executed.

pub mod analysis;
pub mod capture;
pub mod error;
pub mod llm;
pub mod payload;
pub mod render;
pub mod workbench;

#[cfg(test)]
mod test_support;
