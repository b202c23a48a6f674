use crate::error::StudyError;

/// Summaries are cut to this many characters before they are sent.
pub const SUMMARIZE_MAX_CHARS: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Explain,
    Summarize,
    Quiz,
    Flashcards,
}

impl TemplateKind {
    /// Noun used in "Error generating ..." notices.
    pub fn product(&self) -> &'static str {
        match self {
            TemplateKind::Explain => "explanation",
            TemplateKind::Summarize => "summary",
            TemplateKind::Quiz => "quiz",
            TemplateKind::Flashcards => "flashcards",
        }
    }

    pub fn busy_label(&self) -> &'static str {
        match self {
            TemplateKind::Explain => "AI is thinking...",
            TemplateKind::Summarize => "AI is summarizing...",
            TemplateKind::Quiz => "AI is creating a quiz...",
            TemplateKind::Flashcards => "AI is making flashcards...",
        }
    }

    fn empty_input_warning(&self) -> &'static str {
        match self {
            TemplateKind::Explain => "Please enter a concept to explain.",
            TemplateKind::Summarize => "Please paste notes or upload a PDF document to summarize.",
            TemplateKind::Quiz => "Please enter a topic for the quiz.",
            TemplateKind::Flashcards => "Please enter a topic for flashcards.",
        }
    }

    fn render(&self, payload: &str) -> String {
        match self {
            TemplateKind::Explain => format!(
                "Explain the following concept in simple terms for a student, focusing on clarity and easy understanding: {}",
                payload
            ),
            TemplateKind::Summarize => format!(
                "Summarize the following study notes concisely, highlighting the main points and key takeaways. Aim for a summary that captures the essence of the notes: {}",
                payload
            ),
            TemplateKind::Quiz => format!(
                "Generate a short quiz (3-4 questions) with answers on the topic of '{}'. Include various question types like multiple-choice, true/false, and short answer. Clearly label questions and answers.",
                payload
            ),
            TemplateKind::Flashcards => format!(
                "Generate 3-4 flashcards for studying '{}'. For each flashcard, provide a clear question/term on the \"front\" and its answer/definition on the \"back\". Format each flashcard clearly, for example:
                **Flashcard 1 - Front:** [Question]
                **Flashcard 1 - Back:** [Answer]",
                payload
            ),
        }
    }
}

/// A fully rendered instruction, ready for the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: TemplateKind,
    pub text: String,
    /// The user content that went into `text`, after any truncation.
    pub payload: String,
    /// Set when the payload was cut; holds the length before cutting.
    pub original_chars: Option<usize>,
}

impl Prompt {
    pub fn truncation_warning(&self) -> Option<String> {
        self.original_chars.map(|original| {
            format!(
                "Your input is very long ({} characters). Summarizing the first {} characters to fit AI limits. For very long documents, consider summarizing in chunks.",
                original, SUMMARIZE_MAX_CHARS
            )
        })
    }
}

pub fn build_prompt(kind: TemplateKind, user_text: &str) -> Result<Prompt, StudyError> {
    if user_text.trim().is_empty() {
        return Err(StudyError::Validation(kind.empty_input_warning().to_string()));
    }

    let (payload, original_chars) = match kind {
        TemplateKind::Summarize => truncate_chars(user_text, SUMMARIZE_MAX_CHARS),
        _ => (user_text, None),
    };

    Ok(Prompt {
        kind,
        text: kind.render(payload),
        payload: payload.to_string(),
        original_chars,
    })
}

/// Cuts `text` to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> (&str, Option<usize>) {
    match text.char_indices().nth(max) {
        Some((cut, _)) => (&text[..cut], Some(text.chars().count())),
        None => (text, None),
    }
}
