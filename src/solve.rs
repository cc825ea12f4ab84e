use std::path::PathBuf;
use std::sync::Arc;

use iced::{
    alignment, clipboard,
    widget::{button, column, container, image as photo, pick_list, row, scrollable, text, text_input},
    Element, Length, Task,
};

use crate::bundle::{grade_options, Subject};
use crate::capture;
use crate::gemini::GeminiClient;

#[derive(Debug, Clone)]
pub enum Event {
    SubjectSelected(Subject),
    GradeSelected(String),
    QuestionChanged(String),
    CapturePressed,
    CaptureFinished(Result<Vec<u8>, String>),
    UploadPressed,
    FileChosen(Option<PathBuf>),
    FileLoaded(Result<Vec<u8>, String>),
    ClearImage,
    Submit,
    Answered(String),
    Failed(String),
    CopyAnswer,
}

/// The solve session. At most one image is held at a time; a new capture or
/// upload replaces it, and it can be cleared without ever submitting.
pub struct SolveState {
    subject: Subject,
    grade: String,
    question: String,
    image: Option<Vec<u8>>,
    capturing: bool,
    solving: bool,
    answer: Option<String>,
}

impl SolveState {
    pub fn new() -> Self {
        SolveState {
            subject: Subject::Science,
            grade: "5".to_string(),
            question: String::new(),
            image: None,
            capturing: false,
            solving: false,
            answer: None,
        }
    }

    /// Submission needs a non-blank question or a held image.
    pub fn can_submit(&self) -> bool {
        !self.question.trim().is_empty() || self.image.is_some()
    }

    pub fn update(
        &mut self,
        event: Event,
        client: &Arc<GeminiClient>,
        custom_instruction: &str,
    ) -> Task<Event> {
        match event {
            Event::SubjectSelected(subject) => {
                self.subject = subject;
                Task::none()
            }
            Event::GradeSelected(grade) => {
                self.grade = grade;
                Task::none()
            }
            Event::QuestionChanged(question) => {
                self.question = question;
                Task::none()
            }
            Event::CapturePressed => {
                if self.capturing {
                    return Task::none();
                }
                self.capturing = true;
                Task::future(async move {
                    let result = tokio::task::spawn_blocking(capture::capture_photo).await;
                    match result {
                        Ok(Ok(bytes)) => Event::CaptureFinished(Ok(bytes)),
                        Ok(Err(e)) => Event::CaptureFinished(Err(e.to_string())),
                        Err(e) => Event::CaptureFinished(Err(e.to_string())),
                    }
                })
            }
            Event::CaptureFinished(result) => {
                self.capturing = false;
                match result {
                    Ok(bytes) => self.image = Some(bytes),
                    Err(e) => alert("Could not access camera. Please check permissions.", &e),
                }
                Task::none()
            }
            Event::UploadPressed => Task::perform(
                rfd::AsyncFileDialog::new()
                    .add_filter("Images", &["png", "jpg", "jpeg", "webp", "bmp"])
                    .pick_file(),
                |handle| Event::FileChosen(handle.map(|h| h.path().to_path_buf())),
            ),
            Event::FileChosen(None) => Task::none(),
            Event::FileChosen(Some(path)) => Task::future(async move {
                let result = tokio::task::spawn_blocking(move || capture::load_photo(&path)).await;
                match result {
                    Ok(Ok(bytes)) => Event::FileLoaded(Ok(bytes)),
                    Ok(Err(e)) => Event::FileLoaded(Err(e.to_string())),
                    Err(e) => Event::FileLoaded(Err(e.to_string())),
                }
            }),
            Event::FileLoaded(result) => {
                match result {
                    Ok(bytes) => self.image = Some(bytes),
                    Err(e) => alert("Could not read image", &e),
                }
                Task::none()
            }
            Event::ClearImage => {
                self.image = None;
                Task::none()
            }
            Event::Submit => {
                if !self.can_submit() || self.solving {
                    return Task::none();
                }
                self.solving = true;
                self.answer = None;

                let client = client.clone();
                let subject = self.subject;
                let grade = self.grade.clone();
                let question = self.question.clone();
                let image = self.image.clone();
                let instruction = custom_instruction.to_string();

                Task::future(async move {
                    let result = client
                        .solve_question(subject, &grade, &question, image.as_deref(), &instruction)
                        .await;
                    match result {
                        Ok(answer) => Event::Answered(answer),
                        Err(e) => Event::Failed(e.to_string()),
                    }
                })
            }
            Event::Answered(answer) => {
                self.solving = false;
                self.answer = Some(answer);
                Task::none()
            }
            Event::Failed(e) => {
                // Back to idle; no partial output is kept.
                self.solving = false;
                self.answer = None;
                alert("Failed to solve the question. Try again.", &e);
                Task::none()
            }
            Event::CopyAnswer => match &self.answer {
                Some(answer) => clipboard::write(answer.clone()),
                None => Task::none(),
            },
        }
    }

    pub fn view(&self) -> Element<'_, Event> {
        let header = column![
            text("Deepmind").size(24),
            text("Capture a problem or ask a complex topic for a deep dive.").size(14),
        ]
        .spacing(5)
        .align_x(alignment::Horizontal::Center);

        let selectors = row![
            pick_list(&Subject::ALL[..], Some(self.subject), Event::SubjectSelected)
                .padding(10),
            pick_list(grade_options(), Some(self.grade.clone()), Event::GradeSelected)
                .padding(10),
        ]
        .spacing(10);

        let question = text_input(
            "Type your question, paste text from a book, or describe a problem...",
            &self.question,
        )
        .on_input(Event::QuestionChanged)
        .on_submit(Event::Submit)
        .padding(15)
        .size(15);

        let capture_button = if self.capturing {
            button(text("Capturing...").size(14)).padding(10)
        } else {
            button(text("Camera").size(14))
                .on_press(Event::CapturePressed)
                .padding(10)
        };

        let mut attachments = row![
            capture_button,
            button(text("Upload").size(14))
                .on_press(Event::UploadPressed)
                .padding(10),
        ]
        .spacing(10)
        .align_y(alignment::Vertical::Center);

        if let Some(bytes) = &self.image {
            attachments = attachments
                .push(photo(photo::Handle::from_bytes(bytes.clone())).height(Length::Fixed(90.0)))
                .push(
                    button(text("Remove Photo").size(14))
                        .on_press(Event::ClearImage)
                        .padding(10),
                );
        }

        let submit_label = if self.solving { "Thinking..." } else { "Get Deep Answer" };
        let submit = button(text(submit_label).size(16))
            .on_press_maybe((self.can_submit() && !self.solving).then_some(Event::Submit))
            .padding(15);

        let mut content = column![header, selectors, question, attachments, submit]
            .spacing(15)
            .padding(10)
            .align_x(alignment::Horizontal::Center);

        if let Some(answer) = &self.answer {
            let answer_pane = column![
                row![
                    text("AI Tutor Analysis").size(14),
                    button(text("[Copy]").size(13)).on_press(Event::CopyAnswer).padding(8),
                ]
                .spacing(10)
                .align_y(alignment::Vertical::Center),
                scrollable(container(text(answer).size(15)).padding(15).width(Length::Fill))
                    .height(Length::Fill),
            ]
            .spacing(10);
            content = content.push(answer_pane);
        }

        content.into()
    }
}

fn alert(summary: &str, body: &str) {
    eprintln!("[Solve] {}: {}", summary, body);
    if let Err(e) = notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .show()
    {
        eprintln!("[Solve] Could not show notification: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Arc<GeminiClient> {
        Arc::new(GeminiClient::with_config(
            "http://localhost:0".to_string(),
            "test-model".to_string(),
            "test-key".to_string(),
        ))
    }

    #[test]
    fn submission_needs_text_or_image() {
        let mut state = SolveState::new();
        assert!(!state.can_submit());

        state.question = "   ".to_string();
        assert!(!state.can_submit());

        state.question = "why is the sky blue?".to_string();
        assert!(state.can_submit());

        state.question.clear();
        state.image = Some(vec![1, 2, 3]);
        assert!(state.can_submit());
    }

    #[test]
    fn a_new_capture_replaces_the_held_image() {
        let mut state = SolveState::new();
        let c = client();

        let _ = state.update(Event::CaptureFinished(Ok(vec![1])), &c, "");
        assert_eq!(state.image.as_deref(), Some(&[1u8][..]));

        let _ = state.update(Event::FileLoaded(Ok(vec![2, 2])), &c, "");
        assert_eq!(state.image.as_deref(), Some(&[2u8, 2u8][..]));
    }

    #[test]
    fn clearing_the_image_returns_to_idle() {
        let mut state = SolveState::new();
        let c = client();

        let _ = state.update(Event::CaptureFinished(Ok(vec![1])), &c, "");
        let _ = state.update(Event::ClearImage, &c, "");
        assert!(state.image.is_none());
        assert!(!state.can_submit());
    }

    #[test]
    fn failed_capture_never_holds_an_image() {
        let mut state = SolveState::new();
        let c = client();

        let _ = state.update(Event::CapturePressed, &c, "");
        assert!(state.capturing);

        let _ = state.update(Event::CaptureFinished(Err("no device".to_string())), &c, "");
        assert!(!state.capturing);
        assert!(state.image.is_none());
    }

    #[test]
    fn failure_returns_to_idle_without_partial_output() {
        let mut state = SolveState::new();
        let c = client();
        state.question = "q".to_string();

        let _ = state.update(Event::Submit, &c, "");
        assert!(state.solving);

        let _ = state.update(Event::Failed("boom".to_string()), &c, "");
        assert!(!state.solving);
        assert!(state.answer.is_none());
    }

    #[test]
    fn answer_lands_and_solving_clears() {
        let mut state = SolveState::new();
        let c = client();
        state.question = "q".to_string();

        let _ = state.update(Event::Submit, &c, "");
        let _ = state.update(Event::Answered("because physics".to_string()), &c, "");
        assert!(!state.solving);
        assert_eq!(state.answer.as_deref(), Some("because physics"));
    }
}
