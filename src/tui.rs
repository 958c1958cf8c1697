//! Terminal user interface: two tabs of form elements driven entirely by
//! the keyboard. Operations run on background tasks and report back over
//! a channel so the event loop never blocks on key derivation.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use crate::element::{AlertKind, Element, ElementId, ElementKind};
use crate::pipeline::{
    self, DecryptError, DecryptOutcome, EncryptError, EncryptOutcome,
};
use crate::provider::CryptoProvider;
use crate::screens::{self, Screens};
use crate::tabs::TabList;

const READY_STATUS: &str = "Ready - Tab to switch tabs, ↑/↓ to navigate, Enter to activate, Esc to quit";

/// Completion notice from a background operation.
enum OpMessage {
    EncryptDone(Result<EncryptOutcome, EncryptError>),
    DecryptDone(Result<DecryptOutcome, DecryptError>),
}

/// Text-edit action applied to the focused element.
enum Edit {
    Push(char),
    Pop,
}

/// TUI application state
pub struct App {
    tabs: TabList,
    screens: Screens,
    /// Index into the active form's visible elements.
    focus: usize,
    status: String,
    should_quit: bool,
    op_tx: mpsc::UnboundedSender<OpMessage>,
    op_rx: mpsc::UnboundedReceiver<OpMessage>,
}

impl App {
    /// Creates the application with both tabs built and the encryption
    /// tab active.
    pub fn new() -> crate::Result<Self> {
        let mut tabs = TabList::new();
        let screens = screens::build(&mut tabs)?;
        let (op_tx, op_rx) = mpsc::unbounded_channel();
        Ok(Self {
            tabs,
            screens,
            focus: 0,
            status: READY_STATUS.to_string(),
            should_quit: false,
            op_tx,
            op_rx,
        })
    }

    /// Run the TUI application
    pub async fn run(&mut self) -> crate::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_app(&mut terminal).await;

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    /// Main application loop: draw, drain finished operations, poll for
    /// input with a timeout so completions surface without a keypress.
    async fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> crate::Result<()> {
        loop {
            let visible = self.visible_ids().len();
            if visible > 0 && self.focus >= visible {
                self.focus = visible - 1;
            }
            terminal.draw(|f| self.ui(f))?;

            if self.should_quit {
                break;
            }

            while let Ok(message) = self.op_rx.try_recv() {
                self.handle_op_message(message)?;
            }

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key_event(key)?;
                }
            }
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> crate::Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => {
                self.tabs.activate_next()?;
                self.focus = 0;
            }
            KeyCode::Up => self.move_focus(-1),
            KeyCode::Down => self.move_focus(1),
            KeyCode::Left => self.adjust_choice(-1)?,
            KeyCode::Right => self.adjust_choice(1)?,
            KeyCode::Enter => self.activate_focused()?,
            KeyCode::Backspace => self.edit_focused(Edit::Pop)?,
            KeyCode::Char(ch) => self.edit_focused(Edit::Push(ch))?,
            _ => {}
        }
        Ok(())
    }

    fn handle_op_message(&mut self, message: OpMessage) -> crate::Result<()> {
        match message {
            OpMessage::EncryptDone(result) => {
                let form_id = self.screens.encrypt.form;
                self.tabs.form_mut(form_id)?.set_busy(false);
                match result {
                    Ok(outcome) => {
                        self.screens.encrypt.apply_outcome(&mut self.tabs, &outcome)?;
                        self.status = "Message encrypted.".to_string();
                    }
                    Err(error) => {
                        self.screens.encrypt.apply_error(&mut self.tabs, &error)?;
                        self.status = "Encryption failed.".to_string();
                    }
                }
            }
            OpMessage::DecryptDone(result) => {
                let form_id = self.screens.decrypt.form;
                self.tabs.form_mut(form_id)?.set_busy(false);
                match result {
                    Ok(outcome) => {
                        self.screens.decrypt.apply_outcome(&mut self.tabs, &outcome)?;
                        self.status = "Message decrypted.".to_string();
                    }
                    Err(error) => {
                        self.screens.decrypt.apply_error(&mut self.tabs, &error)?;
                        self.status = "Decryption failed.".to_string();
                    }
                }
            }
        }
        Ok(())
    }

    // ---- focus ---------------------------------------------------------

    /// Visible elements of the active form, in display order.
    fn visible_ids(&self) -> Vec<ElementId> {
        match self.tabs.active_form() {
            Some(form) => form
                .ids()
                .filter(|id| form.element(*id).map(|el| !el.is_hidden()).unwrap_or(false))
                .collect(),
            None => Vec::new(),
        }
    }

    fn focused_element(&self) -> Option<ElementId> {
        self.visible_ids().get(self.focus).copied()
    }

    fn move_focus(&mut self, delta: i32) {
        let count = self.visible_ids().len();
        if count == 0 {
            return;
        }
        self.focus = (self.focus as i32 + delta).rem_euclid(count as i32) as usize;
    }

    // ---- element interaction -------------------------------------------

    fn adjust_choice(&mut self, delta: i32) -> crate::Result<()> {
        let Some(id) = self.focused_element() else {
            return Ok(());
        };
        if let Some(form) = self.tabs.active_form_mut() {
            if form.element(id)?.kind() == ElementKind::DropDown {
                form.cycle_choice(id, delta)?;
            }
        }
        Ok(())
    }

    fn activate_focused(&mut self) -> crate::Result<()> {
        let Some(id) = self.focused_element() else {
            return Ok(());
        };
        let kind = {
            let Some(form) = self.tabs.active_form() else {
                return Ok(());
            };
            let element = form.element(id)?;
            if !element.is_enabled() || element.is_hidden() {
                return Ok(());
            }
            element.kind()
        };
        match kind {
            ElementKind::Button => self.press_button(id)?,
            ElementKind::CheckBox => {
                if let Some(form) = self.tabs.active_form_mut() {
                    form.toggle_check_box(id)?;
                }
            }
            ElementKind::TextArea => {
                if let Some(form) = self.tabs.active_form_mut() {
                    form.push_char(id, '\n')?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn edit_focused(&mut self, edit: Edit) -> crate::Result<()> {
        let Some(id) = self.focused_element() else {
            return Ok(());
        };
        let Some(form) = self.tabs.active_form_mut() else {
            return Ok(());
        };
        let kind = form.element(id)?.kind();
        match (kind, edit) {
            (ElementKind::CheckBox, Edit::Push(' ')) => form.toggle_check_box(id)?,
            (_, Edit::Push(ch)) => form.push_char(id, ch)?,
            (_, Edit::Pop) => form.pop_char(id)?,
        }
        Ok(())
    }

    fn press_button(&mut self, id: ElementId) -> crate::Result<()> {
        let active = self.tabs.active();
        if active == self.screens.encrypt.form && id == self.screens.encrypt.button {
            self.start_encrypt()
        } else if active == self.screens.decrypt.form && id == self.screens.decrypt.button {
            self.start_decrypt()
        } else {
            Ok(())
        }
    }

    fn start_encrypt(&mut self) -> crate::Result<()> {
        let Some(request) = self.screens.encrypt.collect_request(&mut self.tabs)? else {
            self.status = "Fix the highlighted field and try again.".to_string();
            return Ok(());
        };
        self.tabs.form_mut(self.screens.encrypt.form)?.set_busy(true);
        self.status = "Encrypting...".to_string();
        let tx = self.op_tx.clone();
        tokio::spawn(async move {
            let provider = CryptoProvider::new();
            let result = pipeline::run_encrypt(&provider, request).await;
            let _ = tx.send(OpMessage::EncryptDone(result));
        });
        Ok(())
    }

    fn start_decrypt(&mut self) -> crate::Result<()> {
        let Some(request) = self.screens.decrypt.collect_request(&mut self.tabs)? else {
            self.status = "Fix the highlighted field and try again.".to_string();
            return Ok(());
        };
        self.tabs.form_mut(self.screens.decrypt.form)?.set_busy(true);
        self.status = "Decrypting...".to_string();
        let tx = self.op_tx.clone();
        tokio::spawn(async move {
            let provider = CryptoProvider::new();
            let result = pipeline::run_decrypt(&provider, request).await;
            let _ = tx.send(OpMessage::DecryptDone(result));
        });
        Ok(())
    }

    // ---- rendering -----------------------------------------------------

    /// Draw the UI
    fn ui(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints(
                [
                    Constraint::Length(3), // Tab bar
                    Constraint::Min(1),    // Active form
                    Constraint::Length(3), // Status
                ]
                .as_ref(),
            )
            .split(f.size());

        let titles: Vec<Line> = self.tabs.titles().into_iter().map(Line::from).collect();
        let tab_bar = Tabs::new(titles)
            .block(Block::default().title("msglock").borders(Borders::ALL))
            .select(self.tabs.active().0)
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        f.render_widget(tab_bar, chunks[0]);

        self.draw_form(f, chunks[1]);

        let status_line = Line::from(Span::styled(
            &self.status,
            Style::default().fg(Color::Green),
        ));
        let status = Paragraph::new(status_line).block(Block::default().borders(Borders::ALL));
        f.render_widget(status, chunks[2]);
    }

    /// Draw the active form's visible elements with their alerts.
    fn draw_form(&self, f: &mut Frame, area: Rect) {
        let Some(form) = self.tabs.active_form() else {
            return;
        };
        let mut lines: Vec<Line> = Vec::new();
        for (index, id) in self.visible_ids().into_iter().enumerate() {
            let Ok(element) = form.element(id) else {
                continue;
            };
            lines.push(element_line(element, index == self.focus));
            if element.kind() == ElementKind::TextArea {
                for extra in element.raw_text().split('\n').skip(1) {
                    lines.push(Line::from(format!("    {}", extra)));
                }
            }
            for alert in element.alerts() {
                let style = match alert.kind {
                    AlertKind::Error => Style::default().fg(Color::Red),
                    AlertKind::Info => Style::default().fg(Color::Yellow),
                };
                lines.push(Line::from(Span::styled(
                    format!("    {}{}", alert.title, alert.message),
                    style,
                )));
            }
            lines.push(Line::from(""));
        }

        let body = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(form.title().to_string())
                    .borders(Borders::ALL),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(body, area);
    }
}

/// One display line for an element: label plus a kind-appropriate
/// rendering of its current state. Passwords are masked, disabled
/// elements dimmed, the focused element reversed.
fn element_line(element: &Element, focused: bool) -> Line<'static> {
    let mut style = if element.is_enabled() {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    if focused {
        style = style.add_modifier(Modifier::REVERSED);
    }
    let text = match element.kind() {
        ElementKind::CheckBox => format!(
            "[{}] {}",
            if element.is_checked() { "x" } else { " " },
            element.label()
        ),
        ElementKind::Button => format!("[ {} ]", element.label()),
        ElementKind::DropDown => format!(
            "{}: < {} >",
            element.label(),
            element.selected_name().unwrap_or("-")
        ),
        ElementKind::PasswordBox => format!(
            "{}: {}",
            element.label(),
            "*".repeat(element.raw_text().chars().count())
        ),
        _ => {
            let raw = element.raw_text().split('\n').next().unwrap_or("");
            if raw.is_empty() {
                match element.placeholder() {
                    Some(hint) => format!("{}: ({})", element.label(), hint),
                    None => format!("{}: ", element.label()),
                }
            } else {
                format!("{}: {}", element.label(), raw)
            }
        }
    };
    Line::from(Span::styled(text, style))
}
