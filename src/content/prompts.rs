//! Prompt templates for the content endpoints

use super::client::GenerationRequest;

const LITE_MODEL: &str = "gemini-flash-lite-latest";
const SUMMARY_MODEL: &str = "gemini-2.5-flash";

/// Writing guidance per social platform
pub fn platform_guide(platform: &str) -> &'static str {
    match platform.to_ascii_lowercase().as_str() {
        "instagram" => "Use emojis and hashtags and keep it engaging. Point to the link in bio for URLs. Stay under 2200 characters.",
        "twitter" | "x" => "Stay under 280 characters. Use relevant hashtags. Make it punchy and shareable.",
        "facebook" => "It can be longer and more descriptive. Invite engagement with a question or a call to action.",
        "tiktok" => "Use trendy, casual language with emojis and relevant hashtags. Keep it fun.",
        "linkedin" => "Use a professional tone focused on value and insight. Add relevant industry hashtags.",
        _ => "Write an engaging caption suitable for social media.",
    }
}

pub fn similarity_request(content_1: &str, content_2: &str) -> GenerationRequest {
    let prompt = format!(
        r#"Compare the two texts below for originality and similarity.

Text 1 (content being checked):
{content_1}

Text 2 (reference content):
{content_2}

Reply with a JSON object containing exactly these fields:
- "is_similar": boolean, true when the texts share significant meaning, topic or phrasing.
- "similarity_level": one of "identical", "very_similar", "similar", "somewhat_similar", "different".
- "originality_assessment": two or three sentences on whether Text 1 is original, paraphrased, inspired by, or copied from Text 2.
- "detailed_analysis": three or four sentences naming concrete similarities and differences, the main themes of each text, and a conclusion.

Reply with the JSON object only, without markdown or code fences."#
    );

    GenerationRequest {
        model: LITE_MODEL.to_string(),
        prompt,
        temperature: 0.2,
        max_output_tokens: 1024,
    }
}

pub fn caption_request(platform: &str, title: &str, description: &str) -> GenerationRequest {
    let guide = platform_guide(platform);
    let prompt = format!(
        "Write a social media caption for {platform}.\n\n\
         Title: {title}\n\
         Description: {description}\n\n\
         Platform guidelines: {guide}\n\n\
         Reply with the caption text only, without explanations or metadata."
    );

    GenerationRequest {
        model: LITE_MODEL.to_string(),
        prompt,
        temperature: 0.7,
        max_output_tokens: 500,
    }
}

pub fn summary_request(content: &str) -> GenerationRequest {
    let prompt = format!(
        "Summarize the content below. Keep it brief but informative and focus on the key points and main takeaways.\n\n\
         Content:\n{content}\n\n\
         Reply with the summary only."
    );

    GenerationRequest {
        model: SUMMARY_MODEL.to_string(),
        prompt,
        temperature: 0.3,
        max_output_tokens: 300,
    }
}

/// Remove a surrounding markdown code fence (```json ... ```) if present
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string on the opening fence line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}
