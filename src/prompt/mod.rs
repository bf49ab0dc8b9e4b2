//! Prompt construction for the profile analysis pipeline.

pub mod builder;
pub mod personas;

pub use builder::{build_prompt, render_profile, PROFILE_ANALYSIS_TEMPLATE};
pub use personas::{random_persona, ANALYST_PERSONAS};
