//! Coaching message prompt
//!
//! Asks the model for a short, human nudge that names the distraction,
//! ties back to the user's goal, and ends with a call to action.

use crate::providers::Message;

/// Builds the coaching conversation for a goal, site, and tone
///
/// # Examples
///
/// ```
/// use mindful_social::prompts::coaching_prompt::generate_coaching_prompt;
///
/// let messages = generate_coaching_prompt("Learn Spanish", "instagram.com", "warm but firm");
/// assert_eq!(messages.len(), 2);
/// assert!(messages[1].content.contains("Learn Spanish"));
/// ```
pub fn generate_coaching_prompt(goal: &str, site: &str, tone: &str) -> Vec<Message> {
    let system = format!(
        r#"You are "Mindful Coach", an empathetic but firm productivity companion.
You help people stop mindless scrolling and reconnect with what they set out to do.
Sound human and specific, never preachy.
Keep your tone {tone} and your reply under 3 lines."#
    );

    let user = format!(
        r#"User goal: {goal}
Current site: {site}
Behavior: the user has gone past their check-in interval on this site.

Write one message that acknowledges the distraction, connects back to the goal,
and closes with a gentle or firm call to action.

Example:
"Hey, remember why you started. A few more minutes here won't teach you Spanish.
Let's get back to the version of you that follows through."

Now write one new message in that spirit."#
    );

    vec![Message::system(system), Message::user(user)]
}

/// Deterministic coaching text used whenever generation fails
///
/// # Examples
///
/// ```
/// use mindful_social::prompts::coaching_prompt::fallback_coaching;
///
/// assert_eq!(
///     fallback_coaching("Read more"),
///     "Remember your goal: Read more. You've got this! 🎯"
/// );
/// ```
pub fn fallback_coaching(goal: &str) -> String {
    format!("Remember your goal: {}. You've got this! 🎯", goal)
}
