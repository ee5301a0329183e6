//! Interactive kubeconfig picker
//!
//! Rendered on stderr so stdout stays free for the selected path. Typing
//! filters the list by fuzzy subsequence match; the preview pane shows the
//! highlighted kubeconfig, fetched lazily.

use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use kubeswitch::{Candidate, Picker, Previewer, Selection};
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use std::io::{self, Stderr};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// What a key press asks the picker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerAction {
    Continue,
    /// Index into the full candidate list.
    Select(usize),
    Abort,
}

/// Pure picker state; no terminal access.
#[derive(Debug)]
pub struct PickerState {
    names: Vec<String>,
    query: String,
    /// Candidate indices matching `query`, best match first.
    filtered: Vec<usize>,
    highlighted: usize,
}

impl PickerState {
    pub fn new(candidates: &[Candidate]) -> Self {
        let mut state = Self {
            names: candidates.iter().map(|c| c.display_name.clone()).collect(),
            query: String::new(),
            filtered: Vec::new(),
            highlighted: 0,
        };
        state.refilter();
        state
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn filtered(&self) -> &[usize] {
        &self.filtered
    }

    /// Index of the highlighted candidate in the full list.
    pub fn current(&self) -> Option<usize> {
        self.filtered.get(self.highlighted).copied()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PickerAction {
        if key.kind == KeyEventKind::Release {
            return PickerAction::Continue;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => return PickerAction::Abort,
            KeyCode::Char('c') if ctrl => return PickerAction::Abort,
            KeyCode::Enter => {
                if let Some(index) = self.current() {
                    return PickerAction::Select(index);
                }
            }
            KeyCode::Up => self.move_by(-1),
            KeyCode::Char('p') | KeyCode::Char('k') if ctrl => self.move_by(-1),
            KeyCode::Down => self.move_by(1),
            KeyCode::Char('n') | KeyCode::Char('j') if ctrl => self.move_by(1),
            KeyCode::PageUp => self.move_by(-10),
            KeyCode::PageDown => self.move_by(10),
            KeyCode::Char('u') if ctrl => {
                self.query.clear();
                self.refilter();
            }
            KeyCode::Backspace => {
                if self.query.pop().is_some() {
                    self.refilter();
                }
            }
            KeyCode::Char(c) if !ctrl => {
                self.query.push(c);
                self.refilter();
            }
            _ => {}
        }
        PickerAction::Continue
    }

    fn move_by(&mut self, delta: isize) {
        if self.filtered.is_empty() {
            return;
        }
        let last = self.filtered.len() as isize - 1;
        self.highlighted = (self.highlighted as isize + delta).clamp(0, last) as usize;
    }

    fn refilter(&mut self) {
        let mut scored: Vec<(i64, usize)> = self
            .names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| fuzzy_score(&self.query, name).map(|score| (score, i)))
            .collect();
        // Stable: equal scores keep discovery order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        self.filtered = scored.into_iter().map(|(_, i)| i).collect();
        self.highlighted = 0;
    }
}

/// Case-insensitive subsequence match. Higher is better; `None` is no match.
///
/// Consecutive matches and matches at word starts score extra; later first
/// matches score less.
pub fn fuzzy_score(query: &str, name: &str) -> Option<i64> {
    if query.is_empty() {
        return Some(0);
    }

    let name: Vec<char> = name.chars().flat_map(char::to_lowercase).collect();
    let mut score: i64 = 0;
    let mut position = 0;
    let mut previous: Option<usize> = None;

    for q in query.chars().flat_map(char::to_lowercase) {
        let found = (position..name.len()).find(|&i| name[i] == q)?;
        score += 1;
        if previous.is_some_and(|p| p + 1 == found) {
            score += 5;
        }
        if found == 0 || matches!(name[found - 1], '/' | '-' | '_' | '.' | ' ') {
            score += 3;
        }
        if previous.is_none() {
            score -= found as i64;
        }
        previous = Some(found);
        position = found + 1;
    }
    Some(score)
}

/// Draw the picker. `preview` is `None` when previews are disabled.
pub fn draw(frame: &mut Frame, state: &PickerState, candidates: &[Candidate], preview: Option<&str>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let prompt = Paragraph::new(format!("> {}", state.query())).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" kubeconfigs {}/{} ", state.filtered().len(), candidates.len())),
    );
    frame.render_widget(prompt, chunks[0]);

    let body = if preview.is_some() {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[1])
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(100)])
            .split(chunks[1])
    };

    let items: Vec<ListItem> = state
        .filtered()
        .iter()
        .map(|&i| ListItem::new(format!("{}  [{}]", candidates[i].display_name, candidates[i].kind)))
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("▶ ");
    let mut list_state = ListState::default().with_selected(state.current().map(|_| state.highlighted));
    frame.render_stateful_widget(list, body[0], &mut list_state);

    if let Some(preview) = preview {
        let title = state
            .current()
            .map(|i| format!(" {} ", candidates[i].display_name))
            .unwrap_or_default();
        let pane = Paragraph::new(preview.to_string())
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(pane, body[1]);
    }

    let footer = Paragraph::new(" [type] filter  [↑↓/Ctrl-N/P] move  [Enter] select  [Esc] abort ")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[2]);
}

/// Picker backed by the real terminal.
#[derive(Debug, Default)]
pub struct TerminalPicker;

impl TerminalPicker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Picker for TerminalPicker {
    async fn select(
        &mut self,
        candidates: &[Candidate],
        previewer: &mut Previewer<'_>,
    ) -> io::Result<Selection> {
        enable_raw_mode()?;
        let mut stderr = io::stderr();
        if let Err(err) = execute!(stderr, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        let mut terminal = Terminal::new(CrosstermBackend::new(stderr))?;

        let result = run_picker(&mut terminal, candidates, previewer).await;

        // Restore even when the loop failed.
        let restore_raw = disable_raw_mode();
        let restore_screen = execute!(terminal.backend_mut(), LeaveAlternateScreen);
        let restore_cursor = terminal.show_cursor();
        let selection = result?;
        restore_raw?;
        restore_screen?;
        restore_cursor?;
        Ok(selection)
    }
}

async fn run_picker(
    terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    candidates: &[Candidate],
    previewer: &mut Previewer<'_>,
) -> io::Result<Selection> {
    let mut state = PickerState::new(candidates);
    let mut preview: Option<String> = None;
    let mut previewed: Option<usize> = None;

    loop {
        if previewer.enabled() && state.current() != previewed {
            previewed = state.current();
            preview = match previewed {
                Some(i) => Some(previewer.preview(&candidates[i]).await),
                None => Some(String::new()),
            };
        }

        let preview_text = if previewer.enabled() {
            Some(preview.as_deref().unwrap_or(""))
        } else {
            None
        };
        terminal.draw(|frame| draw(frame, &state, candidates, preview_text))?;

        let Some(key) = next_key().await? else {
            continue;
        };
        match state.handle_key(key) {
            PickerAction::Continue => {}
            PickerAction::Select(i) => return Ok(Selection::Selected(candidates[i].clone())),
            PickerAction::Abort => return Ok(Selection::Aborted),
        }
    }
}

/// Wait up to one poll interval for a key press without blocking the runtime.
async fn next_key() -> io::Result<Option<KeyEvent>> {
    tokio::task::spawn_blocking(|| {
        if !event::poll(POLL_INTERVAL)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(Some(key)),
            _ => Ok(None),
        }
    })
    .await
    .map_err(io::Error::other)?
}
