//! Suggested-actions prompt
//!
//! Asks the model for exactly three on-topic micro-actions as a bare JSON
//! array of `{label, searchQuery, url?}` objects. User-provided seed actions
//! come first, in order, with their URLs preserved.

use crate::providers::Message;
use crate::storage::SeedAction;

const SYSTEM_PROMPT: &str = r#"You are a concise productivity assistant that returns micro-actions aligned with the user's stated goal.

Rules:
1) Every suggestion stays on the topic of the user's goal.
2) Start each label with a specific verb such as "Watch", "Draft", "Practice", "Search for" or "Read".
3) Give each suggestion a focused searchQuery that surfaces immediately useful resources.
4) Output valid JSON only: an array of exactly three objects.
5) If the user lists seed actions, include ALL of them first, in the given order, keeping each label and its url.
6) Fill any remaining slots with actions derived from the goal alone.
7) Never invent unrelated tasks.

Schema:
[{"label": "action description", "searchQuery": "specific search term", "url": "optional"}]

Output ONLY the final JSON array. No reasoning, no commentary.

Example
User goal: "Learn Spanish"
Seed actions: [{"label":"Sign up for Duolingo","url":"https://www.duolingo.com/"}]
Response:
[
  {"label":"Sign up for Duolingo (5-min setup)","searchQuery":"duolingo sign up beginner","url":"https://www.duolingo.com/"},
  {"label":"Complete a 10-min Duolingo lesson","searchQuery":"duolingo 10 minute lesson beginners"},
  {"label":"Practice 10 high-frequency words","searchQuery":"most common spanish words list beginners"}
]"#;

/// Builds the actions conversation for a goal and its seed actions
///
/// # Examples
///
/// ```
/// use mindful_social::prompts::actions_prompt::generate_actions_prompt;
/// use mindful_social::storage::SeedAction;
///
/// let seeds = vec![SeedAction {
///     label: "Open Duolingo".into(),
///     url: "https://duolingo.com".into(),
/// }];
/// let messages = generate_actions_prompt("Learn Spanish", &seeds);
/// assert!(messages[1].content.contains("duolingo.com"));
/// ```
pub fn generate_actions_prompt(goal: &str, seeds: &[SeedAction]) -> Vec<Message> {
    let seeds_json = serde_json::to_string(seeds).unwrap_or_else(|_| "[]".to_string());

    let user = format!(
        r#"User goal: "{goal}"
Seed actions: {seeds_json}

Generate 3 micro-actions the user can take right now to make progress on this goal.
Put the seed actions first (with their url), then fill the rest from the goal.
Each action needs a short, specific searchQuery.
Output only the JSON array."#
    );

    vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
}
