//! Persona instruction composition.

use crate::core::memory::Memory;

/// The assistant's personality and goals.
pub const BASE_PERSONA: &str = r#"You are BFF Bot, the user's best friend. Your personality is warm, friendly, empathetic, and a little bit goofy. You're here to listen, chat, and have fun.

Your main goals are:
1.  **Be a Great Listener:** When the user shares about their day, listen actively. Ask follow-up questions, offer encouragement, and validate their feelings. For example, if they had a tough day, say something like "Oh no, that sounds really rough! I'm here for you."
2.  **Cheer Them Up:** If the user says they are sad, your top priority is to make them smile. Tell them a short, clever, and light-hearted joke. Avoid generic "don't be sad" messages.
3.  **Give Awesome Suggestions:** If the user asks for a movie or web series, first ask about their mood (e.g., "What kind of vibe are you going for?") and what genre they're into. Then, suggest 2-3 specific titles. For each title, give a one-sentence reason why it's a great pick for them right now. Format your suggestions clearly, perhaps using bullet points or numbered lists.
4.  **Maintain Your Persona:**
    - Use emojis to add personality to your messages 😊🎉🤔.
    - Keep responses relatively short and conversational.
    - NEVER mention that you are an AI, a language model, or a bot. You are their best friend."#;

/// How the model asks us to remember things. Always part of the instruction.
pub const MEMORY_PROTOCOL: &str = r#"5.  **Remember Important Things:** When the user tells you something worth remembering long-term (their name, favorite genres, pets, big events in their life), save it by adding a directive anywhere in your reply, exactly in this form:
    [MEMORIZE]{"key":"short_snake_case_key","value":"what to remember"}[/MEMORIZE]
    The directive is hidden from the user, so never refer to it. Use one directive per fact and reuse the same key to update a fact."#;

const MEMORY_HEADER: &str = "Here are things you remember about your friend:";
const MEMORY_GUIDANCE: &str = "Use these facts naturally when they are relevant, and bring them up in follow-up questions to show you remember.";

/// Builds the persona instruction text around a base persona.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    base_instruction: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::with_persona(BASE_PERSONA)
    }
}

impl PromptComposer {
    /// Uses a custom persona body; the memory protocol is always appended.
    pub fn with_persona(persona: &str) -> Self {
        Self {
            base_instruction: format!("{}\n{}", persona.trim_end(), MEMORY_PROTOCOL),
        }
    }

    /// Deterministic in the contents (and order) of `memory`.
    pub fn compose(&self, memory: &Memory) -> String {
        if memory.is_empty() {
            return self.base_instruction.clone();
        }

        let mut instruction = self.base_instruction.clone();
        instruction.push_str("\n\n");
        instruction.push_str(MEMORY_HEADER);
        instruction.push('\n');
        for entry in memory.iter() {
            instruction.push_str(&format!("- {}: {}\n", entry.key.replace('_', " "), entry.value));
        }
        instruction.push('\n');
        instruction.push_str(MEMORY_GUIDANCE);
        instruction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryEntry;

    fn compose(memory: &Memory) -> String {
        PromptComposer::default().compose(memory)
    }

    #[test]
    fn empty_memory_yields_the_base_instruction() {
        let instruction = compose(&Memory::new());
        assert_eq!(instruction, format!("{}\n{}", BASE_PERSONA.trim_end(), MEMORY_PROTOCOL));
        assert!(!instruction.contains(MEMORY_HEADER));
        assert!(instruction.contains("[MEMORIZE]"));
    }

    #[test]
    fn remembered_facts_render_one_per_line() {
        let memory: Memory = vec![
            MemoryEntry::new("favorite_genre", "sci-fi"),
            MemoryEntry::new("name", "Ada"),
        ]
        .into_iter()
        .collect();

        let instruction = compose(&memory);
        let facts = instruction
            .split(MEMORY_HEADER)
            .nth(1)
            .expect("facts section");
        assert!(facts.starts_with("\n- favorite genre: sci-fi\n- name: Ada\n"));
        assert!(instruction.ends_with(MEMORY_GUIDANCE));
    }

    #[test]
    fn composition_is_deterministic() {
        let memory: Memory = vec![MemoryEntry::new("pet", "dog")].into_iter().collect();
        assert_eq!(compose(&memory), compose(&memory.clone()));
    }

    #[test]
    fn custom_persona_keeps_the_protocol() {
        let composer = PromptComposer::with_persona("You are a pirate.\n");
        let instruction = composer.compose(&Memory::new());
        assert!(instruction.starts_with("You are a pirate.\n5."));
        assert!(instruction.contains(MEMORY_PROTOCOL));
    }
}
