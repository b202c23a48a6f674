use pulldown_cmark::{Event, HeadingLevel, Parser, Tag};

/// One displayable chunk of model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    Item { depth: usize, marker: String, text: String },
    Code(String),
    Rule,
}

enum Pending {
    Heading(u8),
    Paragraph,
    Item { depth: usize, marker: String },
}

#[derive(Default)]
struct Builder {
    blocks: Vec<Block>,
    pending: Option<(Pending, String)>,
    // next number for each open list; None for bullets
    lists: Vec<Option<u64>>,
    code: Option<String>,
}

impl Builder {
    fn flush(&mut self) {
        let Some((kind, text)) = self.pending.take() else {
            return;
        };
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        self.blocks.push(match kind {
            Pending::Heading(level) => Block::Heading { level, text },
            Pending::Paragraph => Block::Paragraph(text),
            Pending::Item { depth, marker } => Block::Item { depth, marker, text },
        });
    }

    fn start(&mut self, kind: Pending) {
        self.flush();
        self.pending = Some((kind, String::new()));
    }

    fn push_text(&mut self, fragment: &str) {
        if let Some(code) = self.code.as_mut() {
            code.push_str(fragment);
            return;
        }
        self.pending
            .get_or_insert_with(|| (Pending::Paragraph, String::new()))
            .1
            .push_str(fragment);
    }

    fn in_empty_item(&self) -> bool {
        matches!(&self.pending, Some((Pending::Item { .. }, text)) if text.trim().is_empty())
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Flattens markdown into blocks; inline emphasis is dropped, the words stay.
pub fn parse(markdown: &str) -> Vec<Block> {
    let mut builder = Builder::default();

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading(level, _, _)) => {
                builder.start(Pending::Heading(heading_level(level)))
            }
            Event::Start(Tag::Paragraph) => {
                if !builder.in_empty_item() {
                    builder.start(Pending::Paragraph);
                }
            }
            Event::Start(Tag::List(first)) => {
                builder.flush();
                builder.lists.push(first);
            }
            Event::End(Tag::List(_)) => {
                builder.flush();
                builder.lists.pop();
            }
            Event::Start(Tag::Item) => {
                let depth = builder.lists.len().saturating_sub(1);
                let marker = match builder.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}.", n);
                        *n += 1;
                        marker
                    }
                    _ => "•".to_string(),
                };
                builder.start(Pending::Item { depth, marker });
            }
            Event::Start(Tag::CodeBlock(_)) => {
                builder.flush();
                builder.code = Some(String::new());
            }
            Event::End(Tag::CodeBlock(_)) => {
                if let Some(code) = builder.code.take() {
                    builder.blocks.push(Block::Code(code.trim_end_matches('\n').to_string()));
                }
            }
            Event::End(Tag::Heading(..)) | Event::End(Tag::Paragraph) | Event::End(Tag::Item) => {
                builder.flush()
            }
            Event::Text(text) | Event::Code(text) | Event::Html(text) => builder.push_text(&text),
            Event::SoftBreak => builder.push_text(" "),
            Event::HardBreak => builder.push_text("\n"),
            Event::Rule => {
                builder.flush();
                builder.blocks.push(Block::Rule);
            }
            _ => {}
        }
    }

    builder.flush();
    builder.blocks
}
