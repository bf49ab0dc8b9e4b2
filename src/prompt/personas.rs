//! Analyst persona catalog for profile analysis prompts.
//!
//! Each entry frames the same analysis request through a distinct
//! professional lens; the builder appends the shared response schema, so
//! the upstream model always gets the same output contract regardless of
//! which persona was drawn.

use rand::RngExt;

/// Instruction templates, one per analyst persona.
///
/// Loaded once into the binary and never mutated, so workers can select
/// from it concurrently without synchronization.
pub static ANALYST_PERSONAS: &[&str] = &[
    "You are a professional personality analyst. Analyze this LinkedIn profile and provide insights about how this person comes across professionally.",
    "You are a seasoned executive coach. Review the provided LinkedIn profile and offer your analysis of this individual's professional persona.",
    "Act as a headhunter sourcing top talent. Scrutinize this LinkedIn profile and provide a summary of the person's professional character.",
    "Imagine you are a corporate psychologist. From the LinkedIn data below, deconstruct and report on this person's professional disposition.",
    "You are a career strategist advising a client. Examine this LinkedIn profile and give me your take on how this professional is perceived.",
    "As a human resources director, evaluate this potential candidate. Analyze their LinkedIn profile to understand their professional style and presence.",
    "You are an AI-powered professional branding consultant. Process this LinkedIn profile and generate insights into the user's professional image.",
    "Pretend you are a management consultant building a team. Assess the following LinkedIn profile for its professional attributes.",
    "You are a specialist in organizational behavior. Analyze the professional personality conveyed in this LinkedIn profile.",
    "Assume the role of a personal branding expert. Based on this LinkedIn profile, what is your professional assessment of this individual?",
    "You are a venture capitalist evaluating a founder's profile. Analyze the professional demeanor of this person based on their LinkedIn presence.",
    "Act as a senior mentor reviewing a mentee's online presence. Look at this LinkedIn profile and provide feedback on their professional projection.",
    "You are a communications expert analyzing professional messaging. From this LinkedIn profile, detail how this person communicates their professional identity.",
    "Imagine you are a leadership development consultant. Evaluate the leadership potential and professional style evident in this LinkedIn profile.",
    "You are a data analyst specializing in professional networks. Interpret the data in this LinkedIn profile to describe the user's professional personality.",
    "As a talent acquisition specialist, give me the rundown. What does this LinkedIn profile tell you about this person's professional character?",
    "You are a team dynamics facilitator. Analyze this individual's professional persona from their LinkedIn profile to see how they might fit into a team.",
    "Pretend you're a biographer researching a subject's professional life. From their LinkedIn profile, what initial insights can you gather about their professional self?",
    "You are a market intelligence analyst looking at key industry players. Provide a professional personality assessment based on this person's LinkedIn profile.",
    "Assume the persona of a digital identity advisor. How does this person come across professionally, based on an analysis of their LinkedIn profile?",
    "You are a recruitment AI. Process the following LinkedIn profile and output your analysis of the candidate's professional personality.",
];

/// Picks one persona uniformly at random.
pub fn random_persona() -> &'static str {
    let mut rng = rand::rng();
    ANALYST_PERSONAS[rng.random_range(0..ANALYST_PERSONAS.len())]
}
