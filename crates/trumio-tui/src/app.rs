use std::path::PathBuf;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tracing::{info, warn};
use trumio_core::{
    service_or_unconfigured, static_models, Config, KeySource, Mode, OllamaClient, Provider, ServiceError,
    Session,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Load settings from `path`. A file that exists but cannot be read gives
/// defaults and no path, so the session never writes over it.
pub fn load_config(path: Option<PathBuf>) -> (Config, Option<PathBuf>) {
    let Some(path) = path else {
        warn!("no config directory; settings will not be saved");
        return (Config::new(), None);
    };

    match Config::load_from(&path) {
        Ok(config) => (config, Some(path)),
        Err(e) => {
            warn!(error = %e, "could not load config; using defaults and leaving the file untouched");
            (Config::new(), None)
        }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: Session,
    pub config: Config,
    pub config_path: Option<PathBuf>, // None: settings are kept in memory only

    // Draft editing
    pub input_cursor: usize, // cursor position in the draft, in chars

    // Transcript view
    pub chat_scroll: u16,
    pub follow_chat: bool, // stay pinned to the latest entry
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Model picker state
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,

    // Provider state
    pub show_provider_picker: bool,
    pub provider_picker_state: ListState,

    // API key input state
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_input_cursor: usize,
    pub api_key_target_provider: Option<Provider>,
}

impl App {
    pub fn new(session: Session, config: Config) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            session,
            config,
            config_path: None,

            input_cursor: 0,

            chat_scroll: 0,
            follow_chat: true,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            animation_frame: 0,

            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),

            show_provider_picker: false,
            provider_picker_state: ListState::default(),

            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_input_cursor: 0,
            api_key_target_provider: None,
        }
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn mode(&self) -> Mode {
        self.session.mode()
    }

    pub fn current_provider(&self) -> Provider {
        self.session.dispatcher().provider()
    }

    pub fn selected_model(&self) -> &str {
        self.session.dispatcher().model()
    }

    pub fn has_popup(&self) -> bool {
        self.session.notice().is_some()
            || self.show_api_key_input
            || self.show_provider_picker
            || self.show_model_picker
    }

    /// Send the draft. Validation failures surface as the notice popup.
    pub fn submit(&mut self) {
        if self.session.submit().is_ok() {
            self.scroll_chat_to_bottom();
        }
    }

    pub fn submit_example(&mut self, index: usize) {
        if self.session.submit_example(index).is_ok() {
            self.input_cursor = self.session.draft().chars().count();
            self.scroll_chat_to_bottom();
        }
    }

    /// Called by the event loop when a request has settled
    pub fn on_request_settled(&mut self, result: Result<(), ServiceError>) {
        match result {
            Ok(()) => self.input_cursor = 0,
            Err(e) => {
                warn!(kind = e.kind.label(), "reply failed, draft kept");
                self.input_cursor = self.input_cursor.min(self.session.draft().chars().count());
            }
        }
        self.scroll_chat_to_bottom();
    }

    pub fn new_chat(&mut self) {
        self.session.reset();
        self.chat_scroll = 0;
        self.follow_chat = true;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_awaiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Number of rows the transcript occupies once wrapped, including the
    /// "Thinking..." indicator while a request is in flight
    pub fn transcript_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };
        let rows = crate::ui::transcript(self).line_count(wrap_width);
        u16::try_from(rows).unwrap_or(u16::MAX)
    }

    fn max_chat_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.transcript_lines().saturating_sub(visible_height)
    }

    /// Keep the latest entry in view
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
        self.follow_chat = true;
    }

    pub fn scroll_chat_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_chat = self.max_chat_scroll() == 0;
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        let max = self.max_chat_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_chat = self.chat_scroll >= max;
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_chat = self.chat_scroll >= self.max_chat_scroll();
    }

    pub fn half_page(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }

    // Model picker methods
    pub async fn open_model_picker(&mut self) {
        let provider = self.current_provider();
        self.available_models = match provider {
            Provider::Ollama => {
                let ollama = OllamaClient::new(self.config.ollama_url());
                match ollama.list_models().await {
                    Ok(models) => models,
                    Err(e) => {
                        warn!(error = %e, "could not list Ollama models");
                        Vec::new()
                    }
                }
            }
            _ => static_models(provider),
        };
        let selected = self.selected_model().to_string();
        if self.available_models.is_empty() {
            self.available_models.push(selected.clone());
        }

        let current = self
            .available_models
            .iter()
            .position(|m| *m == selected)
            .unwrap_or(0);
        self.model_picker_state.select(Some(current));
        self.show_model_picker = true;
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_model(&mut self) {
        if let Some(i) = self.model_picker_state.selected() {
            if let Some(model) = self.available_models.get(i).cloned() {
                info!(model = %model, "model selected");
                self.session.dispatcher_mut().set_model(model.clone());
                self.config.default_model = Some(model);
                self.save_config();
            }
        }
        self.show_model_picker = false;
    }

    // Provider picker methods
    pub fn open_provider_picker(&mut self) {
        let current = Provider::all()
            .iter()
            .position(|p| *p == self.current_provider())
            .unwrap_or(0);
        self.provider_picker_state.select(Some(current));
        self.show_provider_picker = true;
    }

    pub fn provider_picker_nav_down(&mut self) {
        let len = Provider::all().len();
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn provider_picker_nav_up(&mut self) {
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some(i.saturating_sub(1)));
    }

    /// Pick the highlighted provider, asking for a key first when none is known
    pub fn confirm_provider(&mut self) {
        self.show_provider_picker = false;
        let Some(provider) = self
            .provider_picker_state
            .selected()
            .and_then(|i| Provider::all().get(i).copied())
        else {
            return;
        };

        if self.get_key_source(provider).is_none() {
            self.api_key_target_provider = Some(provider);
            self.api_key_input.clear();
            self.api_key_input_cursor = 0;
            self.show_api_key_input = true;
        } else {
            self.switch_provider(provider);
        }
    }

    pub fn switch_provider(&mut self, provider: Provider) {
        let service = service_or_unconfigured(provider, &self.config);
        let model = provider.default_model().to_string();
        self.session.dispatcher_mut().set_service(service, model.clone());

        self.config.provider = Some(provider.as_str().to_string());
        self.config.default_model = Some(model);
        self.save_config();
    }

    fn save_config(&self) {
        let Some(path) = &self.config_path else {
            return;
        };
        if let Err(e) = self.config.save_to(path) {
            warn!(error = %e, "could not save config");
        }
    }

    /// Store the typed key and switch to its provider
    pub fn save_api_key(&mut self) {
        let key = self.api_key_input.trim().to_string();
        if let Some(provider) = self.api_key_target_provider {
            if !key.is_empty() {
                self.config.set_api_key(provider, &key);
                self.switch_provider(provider);
            }
        }
        self.close_api_key_input();
    }

    pub fn close_api_key_input(&mut self) {
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
        self.api_key_target_provider = None;
    }

    pub fn get_key_source(&self, provider: Provider) -> Option<KeySource> {
        self.config.api_key(provider).map(|(_, source)| source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::TempDir;
    use trumio_core::{CompletionService, Dispatcher};

    struct Echo;

    #[async_trait]
    impl CompletionService for Echo {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn complete(&self, _model: &str, prompt: &str) -> Result<String, ServiceError> {
            Ok(format!("{prompt}\n{prompt}"))
        }
    }

    fn test_app() -> App {
        let session = Session::new(Dispatcher::new(Arc::new(Echo), "gemini-1.5-flash"));
        App::new(session, Config::new())
    }

    #[tokio::test]
    async fn counts_wrapped_transcript_lines() {
        let mut app = test_app();
        app.chat_width = 10;
        app.chat_height = 4;
        app.session.draft_mut().push_str("abcdefghijkl"); // 12 chars -> 2 lines at width 10
        app.submit();
        assert_eq!(app.transcript_lines(), 2); // Thinking indicator

        let result = app.session.wait().await.unwrap();
        app.on_request_settled(result);

        // user: role + 2 + blank, assistant: role + 2 + 2 + blank
        assert_eq!(app.transcript_lines(), 10);
        assert_eq!(app.chat_scroll, 6);
        assert_eq!(app.input_cursor, 0);
    }

    #[tokio::test]
    async fn scrolling_is_clamped() {
        let mut app = test_app();
        app.chat_height = 100;
        app.scroll_chat_down(5);
        assert_eq!(app.chat_scroll, 0);
        app.scroll_chat_up(5);
        assert_eq!(app.chat_scroll, 0);
    }

    #[tokio::test]
    async fn scrolling_up_stops_following_until_bottom() {
        let mut app = test_app();
        app.chat_width = 10;
        app.chat_height = 4;
        app.session.draft_mut().push_str("abcdefghijkl");
        app.submit();
        let result = app.session.wait().await.unwrap();
        app.on_request_settled(result);
        assert!(app.follow_chat);

        app.scroll_chat_up(2);
        assert!(!app.follow_chat);

        app.scroll_chat_down(10);
        assert_eq!(app.chat_scroll, 6);
        assert!(app.follow_chat);
    }

    #[test]
    fn picks_are_saved_to_the_loaded_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let (config, config_path) = load_config(Some(path.clone()));
        assert_eq!(config_path.as_deref(), Some(path.as_path()));

        let session = Session::new(Dispatcher::new(Arc::new(Echo), "gemini-1.5-flash"));
        let mut app = App::new(session, config).with_config_path(config_path);
        app.switch_provider(Provider::Ollama);

        let saved = Config::load_from(&path).unwrap();
        assert_eq!(saved.provider(), Provider::Ollama);
        assert_eq!(saved.default_model.as_deref(), Some(Provider::Ollama.default_model()));
    }

    #[test]
    fn unreadable_config_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let broken = "{ \"claude_api_key\": \"sk-keep-me\", ";
        std::fs::write(&path, broken).unwrap();

        let (config, config_path) = load_config(Some(path.clone()));
        assert!(config_path.is_none());

        let session = Session::new(Dispatcher::new(Arc::new(Echo), "gemini-1.5-flash"));
        let mut app = App::new(session, config).with_config_path(config_path);
        app.switch_provider(Provider::Ollama);
        app.available_models = vec!["llama3.2:latest".to_string()];
        app.model_picker_state.select(Some(0));
        app.select_model();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), broken);
        assert_eq!(app.selected_model(), "llama3.2:latest");
    }

    #[tokio::test]
    async fn new_chat_returns_to_landing() {
        let mut app = test_app();
        app.submit_example(2);
        let result = app.session.wait().await.unwrap();
        app.on_request_settled(result);
        assert_eq!(app.mode(), Mode::Chat);

        app.new_chat();

        assert_eq!(app.mode(), Mode::Landing);
        assert_eq!(app.chat_scroll, 0);
    }
}
