use iced::{
    font,
    widget::{
        button, column, container, horizontal_rule, row, scrollable, text, text_editor,
        text_input, Column,
    },
    alignment, Color, Element, Font, Length, Padding,
};

use crate::markdown::Block;
use crate::prompt::TemplateKind;
use crate::session::{FeatureState, Feature, NoticeLevel, Phase};
use crate::{App, Message, OutputPane};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const WARNING: Color = Color { r: 0.96, g: 0.76, b: 0.35, a: 1.0 };
const DANGER: Color = Color { r: 0.97, g: 0.42, b: 0.42, a: 1.0 };
const MUTED: Color = Color { r: 0.6, g: 0.62, b: 0.7, a: 1.0 };

fn bold() -> Font {
    Font {
        weight: font::Weight::Bold,
        ..Font::DEFAULT
    }
}

fn action_label(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::Explain => "Explain Concept",
        TemplateKind::Summarize => "Summarize Content",
        TemplateKind::Quiz => "Generate Quiz",
        TemplateKind::Flashcards => "Generate Flashcards",
    }
}

impl App {
    pub(crate) fn view(&self) -> Element<Message> {
        if let Err(e) = &self.client {
            return halted(e.to_string());
        }

        let model = self.client.as_ref().map(|c| c.get_model()).unwrap_or_default();

        let page = column![
            text("AI-Powered Study Buddy").size(32).font(bold()),
            text("Your intelligent companion for simplified learning, summaries, and quick quizzes!")
                .size(16),
            horizontal_rule(1),
            self.explain_section(),
            horizontal_rule(1),
            self.summarize_section(),
            horizontal_rule(1),
            self.quiz_section(),
            horizontal_rule(1),
            text(format!("Powered by Google Gemini ({}) and iced", model)).size(12).color(MUTED),
        ]
        .spacing(18)
        .padding(25);

        scrollable(page).height(Length::Fill).into()
    }

    fn explain_section(&self) -> Element<Message> {
        let state = self.session.feature(Feature::Explain);

        let input = text_input(
            "e.g., Quantum Entanglement, Supply Chain Management, Photosynthesis",
            &state.input,
        )
        .on_input(|value| Message::InputChanged(Feature::Explain, value))
        .on_submit(Message::Run(TemplateKind::Explain))
        .padding(12)
        .size(16);

        let body = column![
            header(
                "Explain a Concept",
                "Enter any complex concept, and the AI will explain it in simple, easy-to-understand terms.",
            ),
            subheader("Input"),
            text("What concept would you like to understand better?").size(14),
            input,
            action_row(Feature::Explain, state),
        ]
        .spacing(10);

        self.finish_section(Feature::Explain, state, body)
    }

    fn summarize_section(&self) -> Element<Message> {
        let state = self.session.feature(Feature::Summarize);
        let (chars, words) = state.input_stats();

        let notes = text_editor(&self.notes_editor)
            .placeholder("e.g., [Paste a paragraph or two of your lecture notes]")
            .on_action(Message::NotesEdited)
            .height(200.0)
            .padding(12);

        let upload_row = match &state.upload {
            Some(upload) => row![
                text(format!("PDF: {}", upload.file_name)).size(14),
                button(text("Remove").size(14))
                    .on_press_maybe((!state.is_busy()).then_some(Message::RemovePdf))
                    .padding(6),
            ],
            None => row![
                button(text("Upload a PDF document...").size(14))
                    .on_press_maybe((!state.is_busy()).then_some(Message::PickPdf))
                    .padding(8),
                text("No file selected").size(14).color(MUTED),
            ],
        }
        .spacing(12)
        .align_y(alignment::Vertical::Center);

        let body = column![
            header(
                "Summarize Notes",
                "Paste your study notes below, or upload a PDF document, and the AI will provide a concise summary.",
            ),
            subheader("Input"),
            text("Paste your study notes here:").size(14),
            notes,
            text(format!("Characters: {} | Words: {}", chars, words)).size(12).color(MUTED),
            text("--- OR ---").size(14),
            upload_row,
            action_row(Feature::Summarize, state),
        ]
        .spacing(10);

        self.finish_section(Feature::Summarize, state, body)
    }

    fn quiz_section(&self) -> Element<Message> {
        let state = self.session.feature(Feature::Quiz);

        let input = text_input(
            "e.g., Cell Biology, World War II, Calculus Integration",
            &state.input,
        )
        .on_input(|value| Message::InputChanged(Feature::Quiz, value))
        .padding(12)
        .size(16);

        let body = column![
            header(
                "Generate Quizzes/Flashcards",
                "Get practice questions or flashcards on any topic to test your knowledge.",
            ),
            subheader("Input"),
            text("Enter a topic for your quiz or flashcards:").size(14),
            input,
            action_row(Feature::Quiz, state),
        ]
        .spacing(10);

        self.finish_section(Feature::Quiz, state, body)
    }

    /// Appends the busy indicator, notice and output display.
    fn finish_section<'a>(
        &'a self,
        feature: Feature,
        state: &'a FeatureState,
        mut body: Column<'a, Message>,
    ) -> Element<'a, Message> {
        if let Phase::Busy(activity) = state.phase {
            let frame = SPINNER_FRAMES[self.loading_frame % SPINNER_FRAMES.len()];
            body = body.push(
                row![text(frame).size(22), text(activity.label()).size(15)]
                    .spacing(10)
                    .align_y(alignment::Vertical::Center),
            );
        }

        if let Some(notice) = &state.notice {
            let color = match notice.level {
                NoticeLevel::Warning => WARNING,
                NoticeLevel::Error => DANGER,
            };
            body = body.push(text(notice.text.as_str()).size(14).color(color));
        }

        body = body.push(subheader(feature.output_label()));
        body = body.push(match self.outputs.get(&feature) {
            Some(pane) if !pane.shown.is_empty() => output_display(feature, pane),
            _ => text("AI output will appear here.").size(14).color(MUTED).into(),
        });

        body.into()
    }
}

fn header<'a>(title: &'a str, description: &'a str) -> Element<'a, Message> {
    column![text(title).size(26).font(bold()), text(description).size(15)]
        .spacing(6)
        .into()
}

fn subheader(label: &str) -> Element<'_, Message> {
    text(label).size(19).font(bold()).into()
}

fn action_row(feature: Feature, state: &FeatureState) -> Element<'static, Message> {
    let idle = !state.is_busy();

    let mut actions = row![].spacing(10);
    for kind in feature.templates() {
        actions = actions.push(
            button(
                text(action_label(*kind))
                    .width(Length::Fill)
                    .align_x(alignment::Horizontal::Center),
            )
            .on_press_maybe(idle.then_some(Message::Run(*kind)))
            .width(Length::Fill)
            .padding(10),
        );
    }

    actions
        .push(
            button(text("Clear"))
                .on_press_maybe(idle.then_some(Message::Clear(feature)))
                .padding(10),
        )
        .into()
}

/// The same output twice: a selectable plain field and a collapsible
/// rendered view.
fn output_display(feature: Feature, pane: &OutputPane) -> Element<'_, Message> {
    let copy_field = text_editor(&pane.content)
        .on_action(move |action| Message::OutputAction(feature, action))
        .height(150.0)
        .padding(10);

    let toggle_label = if pane.expanded {
        "▾ Read Full Output"
    } else {
        "▸ Read Full Output"
    };

    let toolbar = row![
        button(text(toggle_label).size(14))
            .on_press(Message::ToggleFullOutput(feature))
            .padding(8),
        container(
            button(text("[Copy]").size(14))
                .on_press(Message::CopyOutput(feature))
                .padding(8),
        )
        .width(Length::Fill)
        .align_x(alignment::Horizontal::Right),
    ]
    .align_y(alignment::Vertical::Center);

    let mut display = column![
        text("Copy to Clipboard:").size(14),
        copy_field,
        text("Select the text above and press Ctrl+C (Cmd+C) to copy.").size(12).color(MUTED),
        toolbar,
    ]
    .spacing(8);

    if pane.expanded {
        let rendered = pane
            .blocks
            .iter()
            .fold(Column::new().spacing(10), |col, block| col.push(render_block(block)));

        display = display.push(
            container(rendered)
                .padding(15)
                .width(Length::Fill)
                .style(container::rounded_box),
        );
    }

    display.into()
}

fn render_block(block: &Block) -> Element<'_, Message> {
    match block {
        Block::Heading { level, text: body } => {
            let size = match level {
                1 => 26.0,
                2 => 22.0,
                3 => 19.0,
                _ => 17.0,
            };
            text(body.as_str()).size(size).font(bold()).into()
        }
        Block::Paragraph(body) => text(body.as_str()).size(15).into(),
        Block::Item { depth, marker, text: body } => row![
            text(marker.as_str()).size(15),
            text(body.as_str()).size(15),
        ]
        .spacing(8)
        .padding(Padding {
            left: *depth as f32 * 20.0,
            ..Padding::ZERO
        })
        .into(),
        Block::Code(code) => container(text(code.as_str()).size(14).font(Font::MONOSPACE))
            .padding(10)
            .width(Length::Fill)
            .style(container::rounded_box)
            .into(),
        Block::Rule => horizontal_rule(1).into(),
    }
}

fn halted(reason: String) -> Element<'static, Message> {
    container(
        column![
            text("AI-Powered Study Buddy").size(28).font(bold()),
            text(reason).size(16).color(DANGER),
        ]
        .spacing(12)
        .align_x(alignment::Horizontal::Center),
    )
    .width(Length::Fill)
    .height(Length::Fill)
    .align_x(alignment::Horizontal::Center)
    .align_y(alignment::Vertical::Center)
    .into()
}
