mod config;
mod error;
mod extract;
mod gemini;
mod markdown;
mod prompt;
mod session;
mod view;

use iced::{
    widget::text_editor,
    Size, Subscription, Task, Theme,
    time, clipboard,
    window,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::error::StudyError;
use crate::extract::Upload;
use crate::gemini::GeminiClient;
use crate::prompt::TemplateKind;
use crate::session::{Dispatch, Feature, Session};

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STUDY_BUDDY_LOG")
        .unwrap_or_else(|_| EnvFilter::new("study_buddy=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> iced::Result {
    init_tracing();
    config::Config::load_env_files();
    let config = config::Config::load();

    iced::application("AI-Powered Study Buddy", App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window::Settings {
            size: Size::new(config.window.width as f32, config.window.height as f32),
            min_size: Some(Size::new(
                config.window.min_width as f32,
                config.window.min_height as f32,
            )),
            position: window::Position::Centered,
            ..Default::default()
        })
        .run_with(move || App::new(config))
}

/// Editor contents as typed. `Content::text` always ends with a newline the
/// user never entered.
fn editor_text(content: &text_editor::Content) -> String {
    let text = content.text();
    match text.strip_suffix('\n') {
        Some(typed) => typed.to_string(),
        None => text,
    }
}

#[derive(Debug, Clone)]
enum Message {
    InputChanged(Feature, String),
    NotesEdited(text_editor::Action),
    PickPdf,
    PdfPicked(Option<Upload>),
    RemovePdf,
    Run(TemplateKind),
    Extracted(Feature, Result<String, StudyError>),
    Generated(TemplateKind, Result<String, StudyError>),
    Clear(Feature),
    OutputAction(Feature, text_editor::Action),
    ToggleFullOutput(Feature),
    CopyOutput(Feature),
    Tick,
}

/// Widget state for one output slot. Both views are rebuilt from the same
/// string whenever the slot changes.
struct OutputPane {
    shown: String,
    content: text_editor::Content,
    blocks: Vec<markdown::Block>,
    expanded: bool,
}

impl OutputPane {
    fn new() -> Self {
        OutputPane {
            shown: String::new(),
            content: text_editor::Content::new(),
            blocks: Vec::new(),
            expanded: false,
        }
    }

    fn sync(&mut self, output: &str) {
        if self.shown == output {
            return;
        }
        self.shown = output.to_string();
        self.content = text_editor::Content::with_text(output);
        self.blocks = markdown::parse(output);
    }
}

struct App {
    client: Result<Arc<GeminiClient>, StudyError>,
    session: Session,
    notes_editor: text_editor::Content,
    outputs: BTreeMap<Feature, OutputPane>,
    loading_frame: usize,
}

impl App {
    fn new(config: config::Config) -> (Self, Task<Message>) {
        let client = config
            .api_key()
            .and_then(|key| GeminiClient::with_config(&config.gemini, key))
            .map(Arc::new);

        match &client {
            Ok(client) => tracing::info!(model = client.get_model(), "ready"),
            Err(e) => tracing::error!("startup halted: {}", e),
        }

        let app = App {
            client,
            session: Session::new(),
            notes_editor: text_editor::Content::new(),
            outputs: Feature::all()
                .into_iter()
                .map(|feature| (feature, OutputPane::new()))
                .collect(),
            loading_frame: 0,
        };

        (app, Task::none())
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        let Ok(client) = self.client.clone() else {
            return Task::none();
        };

        let task = match message {
            Message::InputChanged(feature, value) => {
                self.session.set_input(feature, value);
                Task::none()
            }
            Message::NotesEdited(action) => {
                self.notes_editor.perform(action);
                self.session.set_input(Feature::Summarize, editor_text(&self.notes_editor));
                Task::none()
            }
            Message::PickPdf => Task::future(async {
                let handle = rfd::AsyncFileDialog::new()
                    .set_title("Upload a PDF document")
                    .add_filter("PDF", &["pdf"])
                    .pick_file()
                    .await;

                match handle {
                    Some(handle) => {
                        let bytes = handle.read().await;
                        Message::PdfPicked(Some(Upload::new(handle.file_name(), bytes)))
                    }
                    None => Message::PdfPicked(None),
                }
            }),
            Message::PdfPicked(upload) => {
                if let Some(upload) = upload {
                    tracing::info!(
                        file = %upload.file_name,
                        bytes = upload.bytes.len(),
                        "PDF selected"
                    );
                    self.session.set_upload(Feature::Summarize, Some(upload));
                }
                Task::none()
            }
            Message::RemovePdf => {
                self.session.set_upload(Feature::Summarize, None);
                Task::none()
            }
            Message::Run(kind) => {
                let dispatch = self.session.press(kind);
                Self::dispatch(dispatch, client)
            }
            Message::Extracted(feature, result) => {
                let dispatch = self.session.extracted(feature, result);
                Self::dispatch(dispatch, client)
            }
            Message::Generated(kind, result) => {
                self.session.finish(kind, result);
                Task::none()
            }
            Message::Clear(feature) => {
                if self.session.clear(feature) {
                    if feature == Feature::Summarize {
                        self.notes_editor = text_editor::Content::new();
                    }
                    if let Some(pane) = self.outputs.get_mut(&feature) {
                        pane.expanded = false;
                    }
                }
                Task::none()
            }
            Message::OutputAction(feature, action) => {
                // read-only: selection and scrolling only
                if !matches!(action, text_editor::Action::Edit(_)) {
                    if let Some(pane) = self.outputs.get_mut(&feature) {
                        pane.content.perform(action);
                    }
                }
                Task::none()
            }
            Message::ToggleFullOutput(feature) => {
                if let Some(pane) = self.outputs.get_mut(&feature) {
                    pane.expanded = !pane.expanded;
                }
                Task::none()
            }
            Message::CopyOutput(feature) => {
                clipboard::write(self.session.feature(feature).output.clone())
            }
            Message::Tick => {
                self.loading_frame = (self.loading_frame + 1) % 80;
                Task::none()
            }
        };

        self.sync_outputs();
        task
    }

    fn dispatch(dispatch: Dispatch, client: Arc<GeminiClient>) -> Task<Message> {
        match dispatch {
            Dispatch::None | Dispatch::Ignored => Task::none(),
            Dispatch::Extract { feature, bytes } => Task::future(async move {
                Message::Extracted(feature, extract::extract_pdf_text(bytes).await)
            }),
            Dispatch::Generate(prompt) => Task::future(async move {
                let result = client.generate(&prompt.text).await;
                Message::Generated(prompt.kind, result)
            }),
        }
    }

    fn sync_outputs(&mut self) {
        for (feature, pane) in self.outputs.iter_mut() {
            pane.sync(&self.session.feature(*feature).output);
        }
    }

    fn is_busy(&self) -> bool {
        Feature::all()
            .into_iter()
            .any(|feature| self.session.feature(feature).is_busy())
    }

    fn subscription(&self) -> Subscription<Message> {
        if self.is_busy() {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn theme(&self) -> Theme {
        Theme::TokyoNight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_app() -> App {
        let config = config::Config {
            gemini: config::GeminiConfig {
                api_key: Some("test-key".to_string()),
                ..config::GeminiConfig::default()
            },
            ..config::Config::default()
        };
        let (app, _) = App::new(config);
        assert!(app.client.is_ok());
        app
    }

    #[test]
    fn test_output_views_share_text() {
        let mut app = ready_app();
        app.session.set_input(Feature::Explain, "Photosynthesis".to_string());
        let _ = app.update(Message::Run(TemplateKind::Explain));
        let _ = app.update(Message::Generated(
            TemplateKind::Explain,
            Ok("## Photosynthesis\n\nPlants make sugar.".to_string()),
        ));

        let pane = &app.outputs[&Feature::Explain];
        assert_eq!(pane.shown, app.session.feature(Feature::Explain).output);
        assert_eq!(pane.content.text().trim_end(), pane.shown);
        assert_eq!(pane.blocks, markdown::parse(&pane.shown));
    }

    #[test]
    fn test_clear_resets_notes_editor() {
        let mut app = ready_app();
        app.notes_editor = text_editor::Content::with_text("lecture notes");
        app.session.set_input(Feature::Summarize, "lecture notes".to_string());
        app.session.set_input(Feature::Explain, "Entropy".to_string());

        let _ = app.update(Message::Clear(Feature::Summarize));

        assert!(app.notes_editor.text().trim().is_empty());
        assert!(app.session.feature(Feature::Summarize).input.is_empty());
        assert_eq!(app.session.feature(Feature::Explain).input, "Entropy");
    }

    #[test]
    fn test_output_pane_ignores_edits() {
        let mut app = ready_app();
        app.session.set_input(Feature::Quiz, "Cells".to_string());
        let _ = app.update(Message::Run(TemplateKind::Quiz));
        let _ = app.update(Message::Generated(TemplateKind::Quiz, Ok("Q1".to_string())));

        let _ = app.update(Message::OutputAction(
            Feature::Quiz,
            text_editor::Action::Edit(text_editor::Edit::Insert('x')),
        ));

        assert_eq!(app.outputs[&Feature::Quiz].content.text().trim_end(), "Q1");
    }

    #[test]
    fn test_pasted_notes_at_limit_sent_whole() {
        let mut app = ready_app();
        let notes = "a".repeat(prompt::SUMMARIZE_MAX_CHARS);
        let _ = app.update(Message::NotesEdited(text_editor::Action::Edit(
            text_editor::Edit::Paste(Arc::new(notes.clone())),
        )));

        let state = app.session.feature(Feature::Summarize);
        assert_eq!(state.input, notes);
        assert_eq!(state.input_stats(), (prompt::SUMMARIZE_MAX_CHARS, 1));

        match app.session.press(TemplateKind::Summarize) {
            Dispatch::Generate(sent) => {
                assert_eq!(sent.payload.chars().count(), prompt::SUMMARIZE_MAX_CHARS);
                assert!(sent.original_chars.is_none());
            }
            other => panic!("expected a model call, got {:?}", other),
        }
        assert!(app.session.feature(Feature::Summarize).notice.is_none());
    }

    #[test]
    fn test_notes_erased_count_zero() {
        let mut app = ready_app();
        let _ = app.update(Message::NotesEdited(text_editor::Action::Edit(
            text_editor::Edit::Insert('x'),
        )));
        assert_eq!(app.session.feature(Feature::Summarize).input, "x");

        let _ = app.update(Message::NotesEdited(text_editor::Action::Edit(
            text_editor::Edit::Backspace,
        )));
        let state = app.session.feature(Feature::Summarize);
        assert!(state.input.is_empty());
        assert_eq!(state.input_stats(), (0, 0));
    }

    #[test]
    fn test_editor_text_drops_one_trailing_newline() {
        let content = text_editor::Content::with_text("line one\nline two");
        assert_eq!(editor_text(&content), "line one\nline two");
        assert_eq!(editor_text(&text_editor::Content::new()), "");
    }

    #[test]
    fn test_missing_key_halts_every_feature() {
        let mut app = ready_app();
        app.client = Err(StudyError::Configuration("GEMINI_API_KEY not found".to_string()));

        app.session.set_input(Feature::Explain, "Gravity".to_string());
        let _ = app.update(Message::Run(TemplateKind::Explain));
        assert!(!app.session.feature(Feature::Explain).is_busy());
    }
}
