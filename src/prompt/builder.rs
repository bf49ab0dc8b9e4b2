//! Prompt assembly for profile analysis requests.
//!
//! Combines a persona instruction with the shared response schema and the
//! profile payload. Keeping the schema in one template means every request
//! sent upstream demands the same JSON output contract.

/// Template for the full analysis prompt.
///
/// The `{persona}` and `{profile}` placeholders are the only substitution
/// points; everything else, including the literal braces of the response
/// schema, is sent verbatim.
pub const PROFILE_ANALYSIS_TEMPLATE: &str = r#"{persona}

Based on the profile data below, analyze their professional personality and return ONLY a valid JSON response with this exact structure:

{
  "personality_traits": ["trait1", "trait2", "trait3", "trait4", "trait5"],
  "communication_style": "Formal|Casual|Inspiring|Analytical|Collaborative|Strategic|Visionary|Methodical|Approachable|Direct|Results-Driven|Detail-Oriented|Creative|Supportive|Diplomatic|Energetic|Pragmatic|Authoritative|Technical|Nurturing",
  "vibe_category": "Leader|Innovator|Collaborator|Expert|Strategist|Mentor|Builder|Connector|Problem-Solver|Communicator|Organizer|Visionary|Executor|Analyst|Mediator|Pioneer|Motivator|Guardian|Architect|Advocate",
  "confidence_score": 93,
  "key_strength": "one sentence describing their main professional strength",
  "growth_area": "one sentence describing an area for potential growth",
  "radar_data": [
    {"trait": "Leadership", "score": 83},
    {"trait": "Innovation", "score": 76},
    {"trait": "Empathy", "score": 89},
    {"trait": "Analytics", "score": 74},
    {"trait": "Communication", "score": 82}
  ]
}
You should use data from the profile below to inform your analysis.
Profile Data:
{profile}
"#;

/// Builds the analysis prompt for one profile.
///
/// # Arguments
///
/// * `persona` - Analyst persona instruction framing the request
/// * `profile_json` - Profile payload rendered as JSON text
///
/// # Examples
///
/// ```
/// use profile_forge::prompt::build_prompt;
///
/// let prompt = build_prompt(
///     "You are a professional personality analyst.",
///     r#"{"name": "Ada"}"#,
/// );
/// assert!(prompt.starts_with("You are a professional personality analyst."));
/// assert!(prompt.contains("personality_traits"));
/// ```
pub fn build_prompt(persona: &str, profile_json: &str) -> String {
    PROFILE_ANALYSIS_TEMPLATE
        .replace("{persona}", persona)
        .replace("{profile}", profile_json)
}

/// Renders a profile payload as indented JSON for prompt embedding.
pub fn render_profile(profile: &serde_json::Value) -> String {
    serde_json::to_string_pretty(profile).unwrap_or_else(|_| profile.to_string())
}
