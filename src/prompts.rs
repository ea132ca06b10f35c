//! Built-in analysis prompts.

use serde::{Deserialize, Serialize};

/// Asks the model for a prompt that would let a video generator recreate the clip.
pub const RECREATION_PROMPT: &str = "Analyze this TikTok video and write a video generation prompt that captures its visual essence. This prompt should be detailed enough that feeding it to a video generation AI would recreate a similar video.

DO NOT include any text overlays or on-screen text in your prompt, as video generation models cannot reliably create text.

Focus on:
- The core visual concept and format
- Visual progression (what happens and when)
- Camera movements and shot types
- Subject actions and transformations
- Pacing and timing
- Mood and emotional tone
- Audio/music cues
- How the story is told through visuals alone

Write the output as a single, detailed video generation prompt that someone could use as-is with a video AI tool.

Format your output as:

VIDEO GENERATION PROMPT:
[Your detailed prompt here - write it as if you're instructing a video generation AI]";

/// General-purpose breakdown with a timestamped timeline.
pub const COMPREHENSIVE_PROMPT: &str = "Analyze this video comprehensively. Please provide:
1. Overall description of the video content
2. Key themes, topics, or narrative
3. Notable objects, people, actions, or events
4. Setting, context, and atmosphere
5. Any interesting, unusual, or significant elements
6. Timeline of major events with timestamps (use MM:SS format)

Be specific and detailed in your analysis.";

/// Which built-in prompt to fall back on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    #[default]
    Recreation,
    Comprehensive,
}

impl PromptStyle {
    pub fn text(&self) -> &'static str {
        match self {
            PromptStyle::Recreation => RECREATION_PROMPT,
            PromptStyle::Comprehensive => COMPREHENSIVE_PROMPT,
        }
    }
}

impl std::str::FromStr for PromptStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recreation" => Ok(PromptStyle::Recreation),
            "comprehensive" => Ok(PromptStyle::Comprehensive),
            other => Err(format!("unknown prompt style '{}' (expected recreation or comprehensive)", other)),
        }
    }
}
