use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum ViewMode {
    #[default]
    Dashboard,
    Map,
}

impl ViewMode {
    /// Parses the `ui.default_view` config value; unknown names fall back to
    /// the dashboard.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("map") {
            ViewMode::Map
        } else {
            ViewMode::Dashboard
        }
    }

    fn next(self) -> Self {
        match self {
            ViewMode::Dashboard => ViewMode::Map,
            ViewMode::Map => ViewMode::Dashboard,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Searching,
}

/// Requests the main loop forwards to the controller.
#[derive(Debug, PartialEq, Clone)]
pub enum Action {
    Search(String),
    Refresh,
    Locate,
}

/// Terminal-side UI state. Everything about hotspots lives in the controller.
#[derive(Debug, Default)]
pub struct App {
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub search_input: String,
    pub selected_index: usize,
    pub tick_count: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(view_mode: ViewMode) -> Self {
        Self {
            view_mode,
            ..Self::default()
        }
    }

    pub fn on_tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
    }

    /// Keeps the selection inside a list that may have just shrunk.
    pub fn clamp_selection(&mut self, len: usize) {
        if len == 0 {
            self.selected_index = 0;
        } else if self.selected_index >= len {
            self.selected_index = len - 1;
        }
    }

    /// `list_len` is the number of rows in the ranked list right now.
    pub fn handle_key(&mut self, key: KeyEvent, list_len: usize) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return None;
        }

        match self.input_mode {
            InputMode::Searching => self.handle_search_key(key),
            InputMode::Normal => self.handle_normal_key(key, list_len),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                let query = std::mem::take(&mut self.search_input);
                let query = query.trim();
                (!query.is_empty()).then(|| Action::Search(query.to_string()))
            }
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.search_input.clear();
                None
            }
            KeyCode::Backspace => {
                self.search_input.pop();
                None
            }
            KeyCode::Char(c) => {
                self.search_input.push(c);
                None
            }
            _ => None,
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent, list_len: usize) -> Option<Action> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('/') | KeyCode::Char('s') => {
                self.input_mode = InputMode::Searching;
                self.search_input.clear();
            }
            KeyCode::Char('r') => return Some(Action::Refresh),
            KeyCode::Char('l') => return Some(Action::Locate),
            KeyCode::Char('1') => self.view_mode = ViewMode::Dashboard,
            KeyCode::Char('2') => self.view_mode = ViewMode::Map,
            KeyCode::Tab => self.view_mode = self.view_mode.next(),
            KeyCode::Down | KeyCode::Char('j') => {
                if list_len > 0 {
                    self.selected_index = (self.selected_index + 1) % list_len;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if list_len > 0 {
                    self.selected_index = self
                        .selected_index
                        .checked_sub(1)
                        .unwrap_or(list_len - 1);
                }
            }
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            assert_eq!(app.handle_key(press(KeyCode::Char(c)), 0), None);
        }
    }

    #[test]
    fn test_search_prompt_submits_trimmed_query() {
        let mut app = App::default();
        app.handle_key(press(KeyCode::Char('/')), 0);
        assert_eq!(app.input_mode, InputMode::Searching);

        type_text(&mut app, " Boise ");
        let action = app.handle_key(press(KeyCode::Enter), 0);
        assert_eq!(action, Some(Action::Search("Boise".into())));
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.search_input.is_empty());
    }

    #[test]
    fn test_blank_search_is_not_submitted() {
        let mut app = App::default();
        app.handle_key(press(KeyCode::Char('/')), 0);
        type_text(&mut app, "   ");
        assert_eq!(app.handle_key(press(KeyCode::Enter), 0), None);
    }

    #[test]
    fn test_typing_q_in_search_does_not_quit() {
        let mut app = App::default();
        app.handle_key(press(KeyCode::Char('/')), 0);
        type_text(&mut app, "quebec");
        app.handle_key(press(KeyCode::Backspace), 0);
        assert!(!app.should_quit);
        assert_eq!(app.search_input, "quebe");

        app.handle_key(press(KeyCode::Esc), 0);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_selection_wraps_and_clamps() {
        let mut app = App::default();
        app.handle_key(press(KeyCode::Up), 5);
        assert_eq!(app.selected_index, 4);
        app.handle_key(press(KeyCode::Down), 5);
        assert_eq!(app.selected_index, 0);

        app.selected_index = 4;
        app.clamp_selection(2);
        assert_eq!(app.selected_index, 1);
        app.clamp_selection(0);
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn test_actions_and_views() {
        let mut app = App::new(ViewMode::from_name("map"));
        assert_eq!(app.view_mode, ViewMode::Map);
        assert_eq!(app.handle_key(press(KeyCode::Char('r')), 0), Some(Action::Refresh));
        assert_eq!(app.handle_key(press(KeyCode::Char('l')), 0), Some(Action::Locate));
        app.handle_key(press(KeyCode::Tab), 0);
        assert_eq!(app.view_mode, ViewMode::Dashboard);
        app.handle_key(press(KeyCode::Char('q')), 0);
        assert!(app.should_quit);
    }
}
