use std::cell::Cell;
use std::io::stdout;
use std::time::{Duration, Instant};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use unicode_width::UnicodeWidthStr;

use fxbar_engine::formula::build_expression;
use fxbar_engine::token::format_number;
use fxbar_engine::{EditorEvent, FormulaEditor, FormulaStore, Key, TagKind, Token};
use fxbar_suggest::{FeedState, Suggestion, SuggestionFeed};

/// Rows shown in the suggestion dropdown before it scrolls.
const DROPDOWN_ROWS: usize = 8;

/// Two clicks on the same token within this window start an inline edit.
const DOUBLE_CLICK: Duration = Duration::from_millis(400);

const INSTRUCTIONS: &[&str] = &[
    "Type to search for variables (fetched from the suggestion endpoint)",
    "Type numbers directly to add them to the formula",
    "Use operators (+, -, *, /, ^, (, )) between tags and numbers",
    "Press Space to turn typed text into a plain text item",
    "Press Backspace to delete the item left of the cursor",
    "Click a gap in the formula to position the cursor",
    "Double-click text or numbers (or Ctrl+E) to edit them inline",
    "Use Left/Right to move between items",
    "Press Ctrl+R to refetch suggestions from the endpoint",
    "Right-click a tag (or Delete) to remove the item after the cursor",
];

/// What a column in the formula line belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Hit {
    /// Gap before token i (i == len is the trailing gap)
    Gap(usize),
    Token(usize),
    Input,
}

struct Segment {
    hit: Hit,
    text: String,
    style: Style,
}

struct EditorApp {
    editor: FormulaEditor,
    /// None when no endpoint is configured
    feed: Option<SuggestionFeed>,
    /// Dropdown row that Tab or a click would insert
    highlighted: usize,
    show_instructions: bool,
    show_help: bool,
    should_quit: bool,
    /// One-line feedback for rejected actions
    status: Option<String>,
    last_click: Option<(usize, Instant)>,
    /// Areas from the last draw, for mouse hit testing
    formula_area: Cell<Rect>,
    dropdown_area: Cell<Rect>,
    /// Suggestion index of the first visible dropdown row
    dropdown_offset: Cell<usize>,
}

/// Translate a terminal key press into an editor key.
fn map_key(key: &KeyEvent) -> Option<Key> {
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return None;
    }
    match key.code {
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Esc => Some(Key::Escape),
        KeyCode::Char(c) => Key::from_char(c),
        _ => None,
    }
}

fn visible_suggestions(feed: &Option<SuggestionFeed>, store: &FormulaStore) -> Vec<Suggestion> {
    match feed {
        Some(feed) if store.show_suggestions() && store.inline_edit_index().is_none() => {
            feed.suggestions().to_vec()
        }
        _ => Vec::new(),
    }
}

fn tag_icon(kind: TagKind) -> &'static str {
    match kind {
        TagKind::Date => "~",
        TagKind::Category => "#",
        TagKind::Amount => "$",
    }
}

fn tag_color(kind: TagKind) -> Color {
    match kind {
        TagKind::Date => Color::Magenta,
        TagKind::Category => Color::Blue,
        TagKind::Amount => Color::Green,
    }
}

impl EditorApp {
    fn new(initial: Vec<Token>, feed: Option<SuggestionFeed>, show_instructions: bool) -> Self {
        let mut store = FormulaStore::new();
        store.set_items(initial);
        let mut editor = FormulaEditor::with_store(store);
        editor.focus();

        let mut app = Self {
            editor,
            feed,
            highlighted: 0,
            show_instructions,
            show_help: false,
            should_quit: false,
            status: None,
            last_click: None,
            formula_area: Cell::new(Rect::default()),
            dropdown_area: Cell::new(Rect::default()),
            dropdown_offset: Cell::new(0),
        };
        app.sync_feed();
        app
    }

    fn store(&self) -> &FormulaStore {
        self.editor.store()
    }

    /// Keep the feed on the current input while the list is open.
    fn sync_feed(&mut self) {
        let store = self.editor.store();
        if !store.show_suggestions() || store.inline_edit_index().is_some() {
            return;
        }
        if let Some(feed) = self.feed.as_mut() {
            feed.request(store.input_value());
        }
    }

    fn tick(&mut self) {
        if let Some(feed) = self.feed.as_mut() {
            if feed.poll() {
                self.highlighted = 0;
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.show_help {
            // Any key dismisses help
            self.show_help = false;
            return;
        }
        self.status = None;

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let inline = self.store().inline_edit_index().is_some();
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
                self.should_quit = true;
                return;
            }
            KeyCode::F(1) => {
                self.show_help = true;
                return;
            }
            KeyCode::Char('e') if ctrl && !inline => {
                if let Some(active) = self.store().active_index().filter(|&a| a > 0) {
                    self.start_inline_edit(active - 1);
                }
                return;
            }
            KeyCode::Char('r') if ctrl && !inline => {
                if let Some(feed) = self.feed.as_mut() {
                    feed.invalidate();
                }
                self.highlighted = 0;
                self.sync_feed();
                return;
            }
            KeyCode::Delete if !inline => {
                if let Some(active) = self.store().active_index() {
                    if active < self.store().len() {
                        self.delete_token(active);
                    }
                }
                return;
            }
            KeyCode::Up if !inline => {
                self.highlighted = self.highlighted.saturating_sub(1);
                return;
            }
            KeyCode::Down if !inline => {
                let count = visible_suggestions(&self.feed, self.editor.store()).len();
                if self.highlighted + 1 < count {
                    self.highlighted += 1;
                }
                return;
            }
            KeyCode::Tab if !inline => {
                self.pick(self.highlighted);
                return;
            }
            _ => {}
        }

        let Some(key) = map_key(&key) else { return };
        let shown = visible_suggestions(&self.feed, self.editor.store());
        match self.editor.handle_key(key, &shown) {
            Ok(EditorEvent::InputChanged) => {
                self.highlighted = 0;
                self.sync_feed();
            }
            Ok(EditorEvent::Inserted(_)) | Ok(EditorEvent::InlineCommitted) | Ok(EditorEvent::InlineCancelled) => {
                self.sync_feed();
            }
            Ok(_) => {}
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let MouseEventKind::Down(button) = mouse.kind else { return };
        let position = Position::new(mouse.column, mouse.row);
        self.status = None;

        let dropdown = self.dropdown_area.get();
        if dropdown.contains(position) {
            // Borders pick nothing
            let inside = mouse.row > dropdown.y && mouse.row + 1 < dropdown.bottom();
            if inside && button == MouseButton::Left {
                let row = (mouse.row - dropdown.y - 1) as usize;
                self.pick(self.dropdown_offset.get() + row);
            }
            return;
        }

        let area = self.formula_area.get();
        if !area.contains(position) {
            // Clicking away from an inline edit commits it
            if let Err(e) = self.editor.blur_inline() {
                self.status = Some(e.to_string());
            }
            return;
        }

        let hit = self.hit_at(mouse.column.saturating_sub(area.x));
        if self.store().inline_edit_index().is_some() && hit != self.store().inline_edit_index().map(Hit::Token) {
            if let Err(e) = self.editor.blur_inline() {
                self.status = Some(e.to_string());
                return;
            }
            self.sync_feed();
            return;
        }

        match (hit, button) {
            (Some(Hit::Gap(i)), MouseButton::Left) => self.editor.click_gap(i),
            (Some(Hit::Token(i)), MouseButton::Right) => {
                if matches!(self.store().items().get(i), Some(Token::Tag { .. })) {
                    self.delete_token(i);
                }
            }
            (Some(Hit::Token(i)), MouseButton::Left) => {
                let now = Instant::now();
                let double = matches!(self.last_click, Some((last, at)) if last == i && now.duration_since(at) < DOUBLE_CLICK);
                if double {
                    self.last_click = None;
                    self.start_inline_edit(i);
                } else {
                    self.last_click = Some((i, now));
                    self.editor.click_gap(i + 1);
                }
            }
            (None, MouseButton::Left) => {
                let end = self.store().len();
                self.editor.click_gap(end);
            }
            _ => {}
        }
    }

    fn start_inline_edit(&mut self, index: usize) {
        if let Err(e) = self.editor.start_inline_edit(index) {
            log::debug!("inline edit refused: {}", e);
            self.status = Some("only numbers and text can be edited in place".to_string());
        }
    }

    fn delete_token(&mut self, index: usize) {
        if let Err(e) = self.editor.delete_token(index) {
            self.status = Some(e.to_string());
        }
    }

    fn pick(&mut self, row: usize) {
        let shown = visible_suggestions(&self.feed, self.editor.store());
        if let Some(suggestion) = shown.get(row) {
            self.editor.select_suggestion(suggestion);
            self.highlighted = 0;
        }
    }

    /// Formula line as styled segments; draw and hit testing share this.
    fn segments(&self) -> Vec<Segment> {
        let store = self.store();
        let mut segments = Vec::with_capacity(store.len() * 2 + 2);
        let inline = store.inline_edit_index();

        for i in 0..=store.len() {
            let at_cursor = store.active_index() == Some(i) && inline.is_none();
            segments.push(Segment {
                hit: Hit::Gap(i),
                text: if at_cursor { "\u{2502}".to_string() } else { " ".to_string() },
                style: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            });
            if at_cursor && !store.input_value().is_empty() {
                segments.push(Segment {
                    hit: Hit::Input,
                    text: store.input_value().to_string(),
                    style: Style::default().add_modifier(Modifier::UNDERLINED),
                });
            }

            let Some(token) = store.items().get(i) else { break };
            let segment = if inline == Some(i) {
                Segment {
                    hit: Hit::Token(i),
                    text: format!(" {}\u{258f}", store.inline_text()),
                    style: Style::default().fg(Color::Black).bg(Color::Yellow),
                }
            } else {
                match token {
                    Token::Tag { tag } => Segment {
                        hit: Hit::Token(i),
                        text: format!(" {} {} ", tag_icon(tag.kind()), tag.name),
                        style: Style::default().fg(Color::Black).bg(tag_color(tag.kind())),
                    },
                    Token::Number { value } => Segment {
                        hit: Hit::Token(i),
                        text: format_number(*value),
                        style: Style::default().add_modifier(Modifier::BOLD),
                    },
                    Token::Text { text } => Segment {
                        hit: Hit::Token(i),
                        text: text.clone(),
                        style: Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
                    },
                    Token::Operator { operator } => Segment {
                        hit: Hit::Token(i),
                        text: operator.glyph().to_string(),
                        style: Style::default().fg(Color::Cyan),
                    },
                }
            };
            segments.push(segment);
        }
        segments
    }

    /// What sits at `column` (relative to the formula line start).
    fn hit_at(&self, column: u16) -> Option<Hit> {
        let mut x = 0usize;
        for segment in self.segments() {
            let width = segment.text.width();
            if (column as usize) < x + width {
                return Some(segment.hit);
            }
            x += width;
        }
        None
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let shown = visible_suggestions(&self.feed, self.store());
        let dropdown_open = self.store().show_suggestions() && self.store().inline_edit_index().is_none();
        let dropdown_height = if dropdown_open {
            shown.len().clamp(1, DROPDOWN_ROWS) as u16 + 2
        } else {
            0
        };

        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(dropdown_height),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

        self.draw_title(frame, chunks[0]);
        self.draw_formula(frame, chunks[1]);
        if dropdown_open {
            self.draw_dropdown(frame, chunks[2], &shown);
        } else {
            self.dropdown_area.set(Rect::default());
        }
        self.draw_result(frame, chunks[3]);
        if self.show_instructions {
            self.draw_instructions(frame, chunks[4]);
        }
        self.draw_status(frame, chunks[5]);

        if self.show_help {
            self.draw_help(frame, area);
        }
    }

    fn draw_title(&self, frame: &mut Frame, area: Rect) {
        let endpoint = match &self.feed {
            Some(_) => "suggestions on",
            None => "no suggestion endpoint",
        };
        let line = Line::from(vec![
            Span::styled(" fxbar ", Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw("  formula editor  "),
            Span::styled(endpoint, Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_formula(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Formula ");
        let inner = block.inner(area);
        self.formula_area.set(inner);

        let spans: Vec<Span> = self
            .segments()
            .into_iter()
            .map(|s| Span::styled(s.text, s.style))
            .collect();
        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
    }

    fn draw_dropdown(&self, frame: &mut Frame, area: Rect, shown: &[Suggestion]) {
        self.dropdown_area.set(area);
        self.dropdown_offset.set(0);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Suggestions ");

        let placeholder = |text: String, color: Color| vec![Line::from(Span::styled(text, Style::default().fg(color)))];
        let lines = match self.feed.as_ref().map(SuggestionFeed::state) {
            None => placeholder("No suggestion endpoint configured".to_string(), Color::DarkGray),
            Some(FeedState::Idle) | Some(FeedState::Loading) => placeholder("Loading...".to_string(), Color::DarkGray),
            Some(FeedState::Failed(msg)) => placeholder(format!("Error: {}", msg), Color::Red),
            Some(FeedState::Ready(_)) if shown.is_empty() => {
                placeholder("No suggestions".to_string(), Color::DarkGray)
            }
            Some(FeedState::Ready(_)) => {
                // Keep the highlighted row in view
                let skip = (self.highlighted + 1).saturating_sub(DROPDOWN_ROWS);
                self.dropdown_offset.set(skip);
                shown
                    .iter()
                    .enumerate()
                    .skip(skip)
                    .take(DROPDOWN_ROWS)
                    .map(|(i, s)| {
                        let kind = s.kind();
                        let mut style = Style::default();
                        if i == self.highlighted {
                            style = style.add_modifier(Modifier::REVERSED);
                        }
                        Line::from(vec![
                            Span::styled(format!(" {} ", tag_icon(kind)), style.fg(tag_color(kind))),
                            Span::styled(s.name.clone(), style.add_modifier(Modifier::BOLD)),
                            Span::styled(format!("  {}", s.category), style.fg(Color::DarkGray)),
                            Span::styled(format!("  {}", s.value), style.fg(Color::Gray)),
                        ])
                    })
                    .collect()
            }
        };

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_result(&self, frame: &mut Frame, area: Rect) {
        let store = self.store();
        let expression = build_expression(store.items());
        let value = match store.result() {
            Some(v) => Span::styled(format_number(v), Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            None => Span::styled("(incomplete)", Style::default().fg(Color::DarkGray)),
        };
        let line = Line::from(vec![
            Span::raw(" = "),
            value,
            Span::styled(format!("    {}", expression), Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_instructions(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(" Instructions:", Style::default().add_modifier(Modifier::BOLD))),
        ];
        lines.extend(
            INSTRUCTIONS
                .iter()
                .map(|s| Line::from(Span::styled(format!("  - {}", s), Style::default().fg(Color::Gray)))),
        );
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let store = self.store();
        let left = match &self.status {
            Some(msg) => format!(" {}", msg),
            None => format!(
                " {} items  cursor {}",
                store.len(),
                store.active_index().map_or("-".to_string(), |a| a.to_string())
            ),
        };
        let right = "F1: help  Ctrl+C: quit ";
        let padding = (area.width as usize).saturating_sub(left.width() + right.width());
        let status = format!("{}{:pad$}{}", left, "", right, pad = padding);

        let para = Paragraph::new(Line::from(vec![Span::styled(
            status,
            Style::default().fg(Color::Black).bg(Color::DarkGray),
        )]))
        .style(Style::default().bg(Color::DarkGray));
        frame.render_widget(para, area);
    }

    fn draw_help(&self, frame: &mut Frame, area: Rect) {
        let help_lines = [
            "",
            "  Formula",
            "  -------",
            "  0-9               Add a number",
            "  + - * / ( ) ^     Add an operator",
            "  letters           Search suggestions",
            "  Space             Commit typed text",
            "  Enter             Insert first suggestion",
            "  Tab / Up / Down   Insert / move highlight",
            "  Backspace         Delete left of cursor",
            "  Delete            Delete right of cursor",
            "  Left / Right      Move cursor",
            "  Ctrl+E            Edit item left of cursor",
            "  Ctrl+R            Refetch suggestions",
            "  Esc               Close suggestions",
            "",
            "  General",
            "  -------",
            "  Ctrl+C / Ctrl+Q   Quit",
            "  F1                Toggle this help",
            "",
        ];
        let help_width: u16 = 46;
        let help_height: u16 = help_lines.len() as u16 + 2;

        let x = area.width.saturating_sub(help_width) / 2;
        let y = area.height.saturating_sub(help_height) / 2;
        let popup = Rect::new(
            area.x + x,
            area.y + y,
            help_width.min(area.width),
            help_height.min(area.height),
        );

        let lines: Vec<Line> = help_lines
            .iter()
            .map(|s| Line::from(Span::styled(*s, Style::default().fg(Color::White))))
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Keybindings ")
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(Color::Black));

        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(lines).block(block), popup);
    }
}

/// Run the interactive editor until the user quits. Returns the final store.
pub fn run(initial: Vec<Token>, feed: Option<SuggestionFeed>, show_instructions: bool) -> Result<FormulaStore, String> {
    let app = EditorApp::new(initial, feed, show_instructions);
    run_app(app)
}

fn run_app(mut app: EditorApp) -> Result<FormulaStore, String> {
    terminal::enable_raw_mode()
        .map_err(|e| format!("failed to enable raw mode: {}", e))?;

    struct Cleanup;
    impl Drop for Cleanup {
        fn drop(&mut self) {
            let _ = stdout().execute(DisableMouseCapture);
            let _ = stdout().execute(LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
        }
    }
    let _cleanup = Cleanup;

    stdout()
        .execute(EnterAlternateScreen)
        .map_err(|e| format!("failed to enter alternate screen: {}", e))?;
    stdout()
        .execute(EnableMouseCapture)
        .map_err(|e| format!("failed to enable mouse capture: {}", e))?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| format!("failed to create terminal: {}", e))?;

    loop {
        app.tick();

        terminal
            .draw(|frame| app.draw(frame))
            .map_err(|e| format!("draw error: {}", e))?;

        if event::poll(Duration::from_millis(100))
            .map_err(|e| format!("event poll error: {}", e))?
        {
            match event::read().map_err(|e| format!("event read error: {}", e))? {
                Event::Key(key) => app.handle_key(key),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    // Quitting mid-edit keeps the draft
    if let Err(e) = app.editor.blur_inline() {
        log::warn!("could not commit inline edit on exit: {}", e);
    }
    Ok(app.editor.into_store())
}
