//! Per-feature input and output slots, and the transitions between them.
//!
//! Nothing in here touches the network or the GUI. `press` and `extracted`
//! return a `Dispatch` describing the side effect the caller should run; the
//! result is fed back through `extracted` or `finish`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StudyError;
use crate::extract::{self, Upload};
use crate::prompt::{self, Prompt, TemplateKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    Explain,
    Summarize,
    Quiz,
}

impl Feature {
    pub fn all() -> [Feature; 3] {
        [Feature::Explain, Feature::Summarize, Feature::Quiz]
    }

    pub fn templates(&self) -> &'static [TemplateKind] {
        match self {
            Feature::Explain => &[TemplateKind::Explain],
            Feature::Summarize => &[TemplateKind::Summarize],
            Feature::Quiz => &[TemplateKind::Quiz, TemplateKind::Flashcards],
        }
    }

    pub fn output_label(&self) -> &'static str {
        match self {
            Feature::Explain => "Explanation Output",
            Feature::Summarize => "Summary Output",
            Feature::Quiz => "Quiz / Flashcard Output",
        }
    }
}

impl From<TemplateKind> for Feature {
    fn from(kind: TemplateKind) -> Self {
        match kind {
            TemplateKind::Explain => Feature::Explain,
            TemplateKind::Summarize => Feature::Summarize,
            TemplateKind::Quiz | TemplateKind::Flashcards => Feature::Quiz,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    ReadingPdf,
    Generating(TemplateKind),
}

impl Activity {
    pub fn label(&self) -> &'static str {
        match self {
            Activity::ReadingPdf => "Processing PDF...",
            Activity::Generating(kind) => kind.busy_label(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Busy(Activity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// Banner shown above a feature's output, next to whatever the slot holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn warning(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureState {
    pub input: String,
    pub output: String,
    pub upload: Option<Upload>,
    pub phase: Phase,
    pub notice: Option<Notice>,
}

impl FeatureState {
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Busy(_))
    }

    /// `(characters, words)` of the current input.
    pub fn input_stats(&self) -> (usize, usize) {
        (self.input.chars().count(), self.input.split_whitespace().count())
    }
}

/// The side effect a transition asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing to run; the state already holds the outcome.
    None,
    /// The feature already has a request in flight.
    Ignored,
    Extract { feature: Feature, bytes: Arc<Vec<u8>> },
    Generate(Prompt),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    features: BTreeMap<Feature, FeatureState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            features: Feature::all()
                .into_iter()
                .map(|feature| (feature, FeatureState::default()))
                .collect(),
        }
    }

    pub fn feature(&self, feature: Feature) -> &FeatureState {
        &self.features[&feature]
    }

    fn feature_mut(&mut self, feature: Feature) -> &mut FeatureState {
        self.features.entry(feature).or_default()
    }

    pub fn set_input(&mut self, feature: Feature, input: String) {
        self.feature_mut(feature).input = input;
    }

    pub fn set_upload(&mut self, feature: Feature, upload: Option<Upload>) {
        self.feature_mut(feature).upload = upload;
    }

    /// An action button was pressed.
    pub fn press(&mut self, kind: TemplateKind) -> Dispatch {
        let feature = Feature::from(kind);
        let state = self.feature_mut(feature);

        if state.is_busy() {
            tracing::debug!(?feature, "press ignored, request in flight");
            return Dispatch::Ignored;
        }
        state.notice = None;

        if let Some(upload) = state.upload.as_ref().filter(|_| kind == TemplateKind::Summarize) {
            tracing::info!(?feature, file = %upload.file_name, "reading uploaded PDF");
            let bytes = upload.bytes.clone();
            state.phase = Phase::Busy(Activity::ReadingPdf);
            return Dispatch::Extract { feature, bytes };
        }

        let input = state.input.clone();
        self.dispatch_prompt(kind, &input)
    }

    /// Text came back from the PDF parser.
    pub fn extracted(&mut self, feature: Feature, result: Result<String, StudyError>) -> Dispatch {
        let state = self.feature_mut(feature);
        if state.phase != Phase::Busy(Activity::ReadingPdf) {
            return Dispatch::Ignored;
        }
        state.phase = Phase::Idle;

        match result {
            Ok(text) if extract::has_readable_text(&text) => {
                self.dispatch_prompt(TemplateKind::Summarize, &text)
            }
            Ok(_) => {
                tracing::warn!(?feature, "PDF has no extractable text");
                state.notice = Some(Notice::warning(
                    "Could not extract readable text from the PDF. Please try pasting notes directly.",
                ));
                state.output = format!("Error: {}", StudyError::NoReadableText);
                Dispatch::None
            }
            Err(e) => {
                tracing::warn!(?feature, error = %e, "PDF extraction failed");
                state.notice = Some(Notice::error(format!(
                    "Error reading PDF: {}. Please ensure it's a valid PDF or try pasting text.",
                    e
                )));
                state.output = format!("Error reading PDF: {}", e);
                Dispatch::None
            }
        }
    }

    /// The model call for `kind` returned.
    pub fn finish(&mut self, kind: TemplateKind, result: Result<String, StudyError>) {
        let feature = Feature::from(kind);
        let state = self.feature_mut(feature);
        if state.phase != Phase::Busy(Activity::Generating(kind)) {
            tracing::debug!(?feature, "dropping response with no pending request");
            return;
        }
        state.phase = Phase::Idle;

        match result {
            Ok(text) => state.output = text,
            Err(e) => {
                tracing::warn!(?feature, error = %e, "generation failed");
                state.notice = Some(Notice::error(format!(
                    "Error generating {}: {}",
                    kind.product(),
                    e
                )));
                state.output = format!("Error: {}", e);
            }
        }
    }

    /// Wipes one feature back to its first-render state. Refused while the
    /// feature has a request in flight.
    pub fn clear(&mut self, feature: Feature) -> bool {
        if self.feature(feature).is_busy() {
            return false;
        }
        tracing::debug!(?feature, "clearing");
        self.features.insert(feature, FeatureState::default());
        true
    }

    fn dispatch_prompt(&mut self, kind: TemplateKind, text: &str) -> Dispatch {
        let state = self.feature_mut(Feature::from(kind));

        match prompt::build_prompt(kind, text) {
            Ok(prompt) => {
                tracing::info!(
                    ?kind,
                    payload_chars = prompt.payload.chars().count(),
                    truncated = prompt.original_chars.is_some(),
                    "prompt built"
                );
                if let Some(warning) = prompt.truncation_warning() {
                    state.notice = Some(Notice::warning(warning));
                }
                state.phase = Phase::Busy(Activity::Generating(kind));
                Dispatch::Generate(prompt)
            }
            Err(e) => {
                state.output = e.to_string();
                Dispatch::None
            }
        }
    }
}
