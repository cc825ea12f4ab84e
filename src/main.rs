mod bundle;
mod capture;
mod config;
mod gemini;
mod solve;
mod store;
mod study;

use std::sync::Arc;
use std::time::Duration;

use iced::{
    alignment, time,
    widget::{button, column, container, pick_list, row, scrollable, text, text_input},
    window, Element, Length, Subscription, Task, Theme,
};

use bundle::{grade_options, AppTheme, GenerationRequest, Preferences, StudyBundle, Subject};
use gemini::GeminiClient;
use store::Store;

fn main() -> iced::Result {
    let config = config::Config::load();

    iced::application("StudyGenie", App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window::Settings {
            size: iced::Size::new(config.window.width as f32, config.window.height as f32),
            min_size: Some(iced::Size::new(
                config.window.min_width as f32,
                config.window.min_height as f32,
            )),
            position: window::Position::Centered,
            ..Default::default()
        })
        .run_with(App::new)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Create,
    Solve,
    Saved,
    Settings,
}

#[derive(Debug, Clone)]
enum Message {
    Navigate(View),
    TopicChanged(String),
    SubjectSelected(Subject),
    GradeSelected(String),
    PublisherChanged(String),
    Generate,
    Generated(Result<StudyBundle, String>),
    Study(study::Event),
    Solve(solve::Event),
    OpenSaved(String),
    DeleteSaved(String),
    ThemeSelected(AppTheme),
    InstructionChanged(String),
    SaveSettings,
    Exported(Result<String, String>),
    Tick,
}

struct App {
    view: View,
    // create form
    topic: String,
    subject: Subject,
    grade: String,
    publisher: String,
    is_loading: bool,
    loading_frame: usize,
    error: Option<String>,
    // the currently displayed bundle and its interaction state
    bundle: Option<StudyBundle>,
    study: Option<study::StudyState>,
    solve: solve::SolveState,
    library: Vec<StudyBundle>,
    prefs: Preferences,
    store: Store,
    client: Arc<GeminiClient>,
}

impl App {
    fn new() -> (Self, Task<Message>) {
        let config = config::Config::load();

        let api_key = config.api_key().unwrap_or_else(|| {
            eprintln!("[Gemini] No API key configured. Set GEMINI_API_KEY or add api_key to config.toml");
            String::new()
        });
        let client = Arc::new(GeminiClient::with_config(
            config.gemini.base_url.clone(),
            config.gemini.model.clone(),
            api_key,
        ));

        let store = Store::open_default();
        let (library, prefs) = store.load();

        let app = App {
            view: View::Create,
            topic: String::new(),
            subject: Subject::Science,
            grade: "5".to_string(),
            publisher: String::new(),
            is_loading: false,
            loading_frame: 0,
            error: None,
            bundle: None,
            study: None,
            solve: solve::SolveState::new(),
            library,
            prefs,
            store,
            client,
        };

        (app, Task::none())
    }

    /// Membership test against the library, recomputed on every render.
    fn is_current_saved(&self) -> bool {
        match &self.bundle {
            Some(bundle) => self.library.iter().any(|b| b.id == bundle.id),
            None => false,
        }
    }

    fn show_bundle(&mut self, bundle: StudyBundle) {
        self.study = Some(study::StudyState::new(&bundle));
        self.bundle = Some(bundle);
    }

    fn clear_bundle(&mut self) {
        self.bundle = None;
        self.study = None;
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Navigate(view) => {
                // Navigation always drops the displayed bundle first.
                self.clear_bundle();
                self.view = view;
                Task::none()
            }
            Message::TopicChanged(topic) => {
                self.topic = topic;
                Task::none()
            }
            Message::SubjectSelected(subject) => {
                self.subject = subject;
                Task::none()
            }
            Message::GradeSelected(grade) => {
                self.grade = grade;
                Task::none()
            }
            Message::PublisherChanged(publisher) => {
                self.publisher = publisher;
                Task::none()
            }
            Message::Generate => {
                if self.topic.trim().is_empty() || self.is_loading {
                    return Task::none();
                }

                self.is_loading = true;
                self.error = None;
                self.clear_bundle();

                let request = GenerationRequest {
                    topic: self.topic.clone(),
                    grade: self.grade.clone(),
                    subject: self.subject,
                    publisher: self.publisher.clone(),
                };
                let client = self.client.clone();
                let instruction = self.prefs.custom_instruction.clone();

                Task::future(async move {
                    let result = client.create_study_bundle(&request, &instruction).await;
                    Message::Generated(result.map_err(|e| e.to_string()))
                })
            }
            Message::Generated(Ok(bundle)) => {
                self.is_loading = false;
                self.show_bundle(bundle);
                Task::none()
            }
            Message::Generated(Err(e)) => {
                self.is_loading = false;
                self.error = Some(e);
                Task::none()
            }
            Message::Study(event) => self.handle_study_event(event),
            Message::Solve(event) => self
                .solve
                .update(event, &self.client, &self.prefs.custom_instruction)
                .map(Message::Solve),
            Message::OpenSaved(id) => {
                if let Some(bundle) = self.library.iter().find(|b| b.id == id).cloned() {
                    self.show_bundle(bundle);
                }
                Task::none()
            }
            Message::DeleteSaved(id) => {
                match self.store.delete(&id) {
                    Ok(library) => self.library = library,
                    Err(e) => eprintln!("[Store] Delete failed: {}", e),
                }
                Task::none()
            }
            Message::ThemeSelected(theme) => {
                self.prefs.theme = theme;
                Task::none()
            }
            Message::InstructionChanged(instruction) => {
                self.prefs.custom_instruction = instruction;
                Task::none()
            }
            Message::SaveSettings => {
                if let Err(e) = self.store.save_preferences(&self.prefs) {
                    eprintln!("[Store] Saving preferences failed: {}", e);
                }
                self.clear_bundle();
                self.view = View::Create;
                Task::none()
            }
            Message::Exported(Ok(path)) => {
                if !path.is_empty() {
                    eprintln!("[Export] Wrote {}", path);
                }
                Task::none()
            }
            Message::Exported(Err(e)) => {
                eprintln!("[Export] Failed: {}", e);
                Task::none()
            }
            Message::Tick => {
                if self.is_loading {
                    self.loading_frame = (self.loading_frame + 1) % 80; // 10 frames * 8 messages
                }
                Task::none()
            }
        }
    }

    fn handle_study_event(&mut self, event: study::Event) -> Task<Message> {
        match event {
            study::Event::Save => {
                if let Some(bundle) = &self.bundle {
                    match self.store.save(bundle) {
                        Ok(library) => self.library = library,
                        Err(e) => eprintln!("[Store] Save failed: {}", e),
                    }
                }
                Task::none()
            }
            study::Event::ExportTranscript => match &self.bundle {
                Some(bundle) => export_task(bundle.transcript_filename(), bundle.transcript()),
                None => Task::none(),
            },
            study::Event::ExportSummary => match &self.bundle {
                Some(bundle) => export_task(bundle.summary_filename(), bundle.printable_summary()),
                None => Task::none(),
            },
            study::Event::Close => {
                self.clear_bundle();
                Task::none()
            }
            other => {
                if let (Some(bundle), Some(state)) = (&self.bundle, &mut self.study) {
                    state.update(&other, bundle);
                }
                Task::none()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        if self.is_loading {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let nav = row![
            nav_button("Genie", View::Create, self.view),
            nav_button("Deepmind", View::Solve, self.view),
            nav_button("Library", View::Saved, self.view),
            nav_button("Settings", View::Settings, self.view),
        ]
        .spacing(10);

        let content: Element<Message> = match (&self.bundle, &self.study) {
            (Some(bundle), Some(state)) => {
                study::view(bundle, state, self.is_current_saved()).map(Message::Study)
            }
            _ => match self.view {
                View::Create => self.create_view(),
                View::Solve => self.solve.view().map(Message::Solve),
                View::Saved => self.saved_view(),
                View::Settings => self.settings_view(),
            },
        };

        container(column![nav, content].spacing(15).padding(10))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn create_view(&self) -> Element<'_, Message> {
        let header = column![
            text("The Ultimate Study Guide Generator.").size(28),
            text("Skip the reading. Get the knowledge.").size(15),
        ]
        .spacing(5)
        .align_x(alignment::Horizontal::Center);

        let topic = text_input("Topic, e.g. Photosynthesis", &self.topic)
            .on_input(Message::TopicChanged)
            .on_submit(Message::Generate)
            .padding(15)
            .size(16);

        let selectors = row![
            pick_list(&Subject::ALL[..], Some(self.subject), Message::SubjectSelected).padding(10),
            pick_list(grade_options(), Some(self.grade.clone()), Message::GradeSelected).padding(10),
        ]
        .spacing(10);

        let publisher = text_input("Publisher, e.g. Oxford", &self.publisher)
            .on_input(Message::PublisherChanged)
            .padding(15)
            .size(16);

        let can_generate = !self.topic.trim().is_empty() && !self.is_loading;
        let generate = button(text("Generate Study Guide").size(16))
            .on_press_maybe(can_generate.then_some(Message::Generate))
            .padding(15);

        let mut content = column![header, topic, selectors, publisher, generate]
            .spacing(15)
            .padding(10)
            .align_x(alignment::Horizontal::Center);

        if self.is_loading {
            content = content.push(self.loading_view());
        }

        if let Some(error) = &self.error {
            content = content.push(text(error).size(14));
        }

        content.into()
    }

    fn loading_view(&self) -> Element<'_, Message> {
        // Animated unicode spinner with rotating status lines
        let loading_frames = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        let loading_messages = [
            "Consulting the curriculum...",
            "Writing a simple summary...",
            "Drafting flashcards...",
            "Hiding words in sentences...",
            "Inventing tricky statements...",
            "Dreaming up scenarios...",
            "Grading the difficulty...",
            "Stapling the study guide...",
        ];

        let message_idx = (self.loading_frame / 10) % loading_messages.len();
        let spinner_idx = self.loading_frame % loading_frames.len();

        container(
            column![
                text(loading_frames[spinner_idx]).size(32),
                text(loading_messages[message_idx]).size(15)
            ]
            .spacing(10)
            .align_x(alignment::Horizontal::Center),
        )
        .width(Length::Fill)
        .align_x(alignment::Horizontal::Center)
        .padding(20)
        .into()
    }

    fn saved_view(&self) -> Element<'_, Message> {
        if self.library.is_empty() {
            return container(text("Library is empty").size(18))
                .width(Length::Fill)
                .height(Length::Fill)
                .align_x(alignment::Horizontal::Center)
                .align_y(alignment::Vertical::Center)
                .into();
        }

        let mut cards = column![text("Saved for later").size(20)]
            .spacing(15)
            .padding(10);

        for saved in &self.library {
            let preview: String = saved.summary.chars().take(120).collect();
            let card = column![
                text(&saved.topic).size(17),
                text(format!("{} | Grade {} | {}", saved.subject, saved.grade, saved.created_date()))
                    .size(13),
                text(preview).size(13),
                row![
                    button(text("Study").size(14))
                        .on_press(Message::OpenSaved(saved.id.clone()))
                        .padding(8),
                    button(text("Delete").size(14))
                        .on_press(Message::DeleteSaved(saved.id.clone()))
                        .padding(8),
                ]
                .spacing(10),
            ]
            .spacing(5);
            cards = cards.push(card);
        }

        scrollable(cards.width(Length::Fill)).height(Length::Fill).into()
    }

    fn settings_view(&self) -> Element<'_, Message> {
        let theme_row = row![
            theme_button("Light Mode", AppTheme::Light, self.prefs.theme),
            theme_button("Dark Mode", AppTheme::Dark, self.prefs.theme),
        ]
        .spacing(10);

        let instruction = text_input(
            "e.g. Always include a joke, use simpler language, or focus on real-world engineering examples...",
            &self.prefs.custom_instruction,
        )
        .on_input(Message::InstructionChanged)
        .padding(15)
        .size(14);

        column![
            text("App Settings").size(24),
            text("Appearance").size(15),
            theme_row,
            text("AI Personality & Instructions").size(15),
            text("These instructions will be appended to every request made to the model.").size(12),
            instruction,
            button(text("Save Settings").size(16))
                .on_press(Message::SaveSettings)
                .padding(15),
        ]
        .spacing(15)
        .padding(10)
        .align_x(alignment::Horizontal::Center)
        .into()
    }

    fn theme(&self) -> Theme {
        match self.prefs.theme {
            AppTheme::Light => Theme::Light,
            AppTheme::Dark => Theme::TokyoNight,
        }
    }
}

fn nav_button(label: &str, target: View, active: View) -> Element<'_, Message> {
    let b = button(text(label).size(15)).padding(10);
    if target == active {
        b.style(button::primary).into()
    } else {
        b.style(button::text).on_press(Message::Navigate(target)).into()
    }
}

fn theme_button(label: &str, target: AppTheme, active: AppTheme) -> Element<'_, Message> {
    let b = button(text(label).size(14)).padding(10);
    if target == active {
        b.style(button::primary).into()
    } else {
        b.style(button::secondary)
            .on_press(Message::ThemeSelected(target))
            .into()
    }
}

/// Ask for a destination, then write the projection out. Cancelling the
/// dialog is not an error.
fn export_task(filename: String, contents: String) -> Task<Message> {
    Task::future(async move {
        match rfd::AsyncFileDialog::new().set_file_name(filename).save_file().await {
            Some(handle) => match std::fs::write(handle.path(), contents.as_bytes()) {
                Ok(()) => Message::Exported(Ok(handle.path().display().to_string())),
                Err(e) => Message::Exported(Err(e.to_string())),
            },
            None => Message::Exported(Ok(String::new())),
        }
    })
}
