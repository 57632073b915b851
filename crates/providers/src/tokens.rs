//! Token budget estimation.
//!
//! Uses a character-based heuristic: ~4 characters per token, which is close
//! enough for BPE tokenizers on English text to size a completion so that
//! prompt plus output fit the model's context window.

/// Normalize dated or suffixed model names to their family name.
pub fn model_family(model: &str) -> &str {
    // Strip router prefixes like "openai/gpt-4o".
    let model = model.rsplit('/').next().unwrap_or(model);
    if model.starts_with("gpt-3.5-turbo") {
        "gpt-3.5-turbo"
    } else if model.starts_with("gpt-4-32k") {
        "gpt-4-32k"
    } else if model.starts_with("gpt-4o") {
        "gpt-4o"
    } else if model.starts_with("gpt-4") {
        "gpt-4"
    } else {
        model
    }
}

/// Context window size in tokens for a model.
pub fn model_context_size(model: &str) -> usize {
    match model_family(model) {
        "text-davinci-003" => 4097,
        "text-curie-001" | "text-babbage-001" | "text-ada-001" => 2048,
        "code-davinci-002" => 8000,
        "code-cushman-001" => 2048,
        "gpt-3.5-turbo" => 4096,
        "gpt-4" => 8192,
        "gpt-4-32k" => 32768,
        "gpt-4o" => 128_000,
        _ => 4097,
    }
}

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Tokens left for the completion after `prompt`, never negative.
pub fn calculate_max_tokens(prompt: &str, model: &str) -> usize {
    model_context_size(model).saturating_sub(estimate_tokens(prompt))
}
