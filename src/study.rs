use iced::{
    alignment,
    widget::{button, column, container, row, scrollable, text},
    Element, Length,
};

use crate::bundle::StudyBundle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Summary,
    Flashcards,
    Practice,
}

#[derive(Debug, Clone)]
pub enum Event {
    TabSelected(Tab),
    FlipCard,
    NextCard,
    PrevCard,
    ToggleBlank(usize),
    GuessTrueFalse(usize, bool),
    ResetTrueFalse(usize),
    ChooseOption(usize, usize),
    // Handled by the shell, not by StudyState.
    Save,
    ExportTranscript,
    ExportSummary,
    Close,
}

/// Ephemeral interaction state for one displayed bundle. Rebuilt whenever
/// the bundle changes; never mutates the bundle itself.
pub struct StudyState {
    tab: Tab,
    card_index: usize,
    card_flipped: bool,
    revealed: Vec<bool>,
    guesses: Vec<Option<bool>>,
    choices: Vec<Option<usize>>,
}

impl StudyState {
    pub fn new(bundle: &StudyBundle) -> Self {
        StudyState {
            tab: Tab::Summary,
            card_index: 0,
            card_flipped: false,
            revealed: vec![false; bundle.fill_in_the_blanks.len()],
            guesses: vec![None; bundle.true_false.len()],
            choices: vec![None; bundle.scenarios.len()],
        }
    }

    pub fn update(&mut self, event: &Event, bundle: &StudyBundle) {
        let card_count = bundle.flashcards.len();
        match event {
            Event::TabSelected(tab) => self.tab = *tab,
            Event::FlipCard => self.card_flipped = !self.card_flipped,
            Event::NextCard => {
                if card_count > 0 {
                    self.card_flipped = false;
                    self.card_index = (self.card_index + 1) % card_count;
                }
            }
            Event::PrevCard => {
                if card_count > 0 {
                    self.card_flipped = false;
                    self.card_index = (self.card_index + card_count - 1) % card_count;
                }
            }
            Event::ToggleBlank(i) => {
                if let Some(shown) = self.revealed.get_mut(*i) {
                    *shown = !*shown;
                }
            }
            Event::GuessTrueFalse(i, guess) => {
                if let Some(slot) = self.guesses.get_mut(*i) {
                    if slot.is_none() {
                        *slot = Some(*guess);
                    }
                }
            }
            Event::ResetTrueFalse(i) => {
                if let Some(slot) = self.guesses.get_mut(*i) {
                    *slot = None;
                }
            }
            // First selection wins; later attempts on the same item are ignored.
            Event::ChooseOption(i, option) => {
                if let Some(slot) = self.choices.get_mut(*i) {
                    if slot.is_none() && *option < 4 {
                        *slot = Some(*option);
                    }
                }
            }
            Event::Save | Event::ExportTranscript | Event::ExportSummary | Event::Close => {}
        }
    }
}

pub fn view<'a>(bundle: &'a StudyBundle, state: &'a StudyState, is_saved: bool) -> Element<'a, Event> {
    let save_button = if is_saved {
        button(text("Saved").size(14)).padding(10)
    } else {
        button(text("Save").size(14)).on_press(Event::Save).padding(10)
    };

    let toolbar = row![
        button(text("Export Text").size(14))
            .on_press(Event::ExportTranscript)
            .padding(10),
        button(text("Print Summary").size(14))
            .on_press(Event::ExportSummary)
            .padding(10),
        save_button,
        button(text("Back to Home").size(14)).on_press(Event::Close).padding(10),
    ]
    .spacing(10);

    let header = column![
        toolbar,
        text(&bundle.topic).size(28),
        text(format!("{} | Grade {}", bundle.subject, bundle.grade)).size(14),
    ]
    .spacing(8)
    .align_x(alignment::Horizontal::Center);

    let tabs = row![
        tab_button("Summary", Tab::Summary, state.tab),
        tab_button("Flashcards", Tab::Flashcards, state.tab),
        tab_button("Practice", Tab::Practice, state.tab),
    ]
    .spacing(10);

    let body: Element<Event> = match state.tab {
        Tab::Summary => summary_view(bundle),
        Tab::Flashcards => flashcards_view(bundle, state),
        Tab::Practice => practice_view(bundle, state),
    };

    column![header, tabs, body]
        .spacing(15)
        .padding(10)
        .align_x(alignment::Horizontal::Center)
        .into()
}

fn tab_button(label: &str, tab: Tab, active: Tab) -> Element<'_, Event> {
    let b = button(text(label).size(15)).padding(10);
    if tab == active {
        b.style(button::primary).into()
    } else {
        b.style(button::text).on_press(Event::TabSelected(tab)).into()
    }
}

fn summary_view(bundle: &StudyBundle) -> Element<'_, Event> {
    scrollable(
        container(text(&bundle.summary).size(15))
            .padding(15)
            .width(Length::Fill),
    )
    .height(Length::Fill)
    .into()
}

fn flashcards_view<'a>(bundle: &'a StudyBundle, state: &'a StudyState) -> Element<'a, Event> {
    let count = bundle.flashcards.len();
    if count == 0 {
        return container(text("No flashcards in this bundle.").size(15))
            .padding(15)
            .into();
    }

    let card = &bundle.flashcards[state.card_index.min(count - 1)];

    let face: Element<Event> = if state.card_flipped {
        let mut back = column![text("Back").size(12), text(&card.back).size(18)]
            .spacing(10)
            .align_x(alignment::Horizontal::Center);
        if let Some(note) = card.explanation.as_deref().filter(|n| !n.is_empty()) {
            back = back.push(text(format!("Note: {}", note)).size(13));
        }
        back.into()
    } else {
        column![
            text("Front").size(12),
            text(&card.front).size(18),
            text("Flip to reveal answer").size(12),
        ]
        .spacing(10)
        .align_x(alignment::Horizontal::Center)
        .into()
    };

    let card_area = container(face)
        .width(Length::Fill)
        .height(Length::Fixed(280.0))
        .align_x(alignment::Horizontal::Center)
        .align_y(alignment::Vertical::Center)
        .padding(20);

    let controls = row![
        button(text("< Prev").size(14)).on_press(Event::PrevCard).padding(10),
        button(text("Flip").size(14)).on_press(Event::FlipCard).padding(10),
        text(format!("{} / {}", state.card_index + 1, count)).size(14),
        button(text("Next >").size(14)).on_press(Event::NextCard).padding(10),
    ]
    .spacing(15)
    .align_y(alignment::Vertical::Center);

    column![card_area, controls]
        .spacing(10)
        .align_x(alignment::Horizontal::Center)
        .into()
}

fn practice_view<'a>(bundle: &'a StudyBundle, state: &'a StudyState) -> Element<'a, Event> {
    let mut blanks = column![text("Fill in the Blanks").size(18)].spacing(10);
    for (i, item) in bundle.fill_in_the_blanks.iter().enumerate() {
        let shown = state.revealed.get(i).copied().unwrap_or(false);
        let sentence = if shown {
            item.sentence.replace("_____", &item.answer)
        } else {
            item.sentence.clone()
        };
        let toggle = button(text(if shown { "Hide Answer" } else { "Reveal Answer" }).size(13))
            .on_press(Event::ToggleBlank(i))
            .padding(8);
        blanks = blanks.push(
            column![text(format!("{}. {}", i + 1, sentence)).size(15), toggle].spacing(5),
        );
    }

    let mut true_false = column![text("True or False").size(18)].spacing(10);
    for (i, q) in bundle.true_false.iter().enumerate() {
        let item: Element<Event> = match state.guesses.get(i).copied().flatten() {
            None => row![
                button(text("True").size(14))
                    .on_press(Event::GuessTrueFalse(i, true))
                    .padding(8),
                button(text("False").size(14))
                    .on_press(Event::GuessTrueFalse(i, false))
                    .padding(8),
            ]
            .spacing(10)
            .into(),
            Some(guess) => {
                let verdict = if guess == q.is_true { "Brilliant!" } else { "Not quite" };
                column![
                    text(verdict).size(15),
                    text(&q.explanation).size(13),
                    button(text("Retry").size(13))
                        .on_press(Event::ResetTrueFalse(i))
                        .padding(8),
                ]
                .spacing(5)
                .into()
            }
        };
        true_false = true_false.push(
            column![text(format!("{}. {}", i + 1, q.statement)).size(15), item].spacing(5),
        );
    }

    let mut scenarios = column![text("Scenario Challenges").size(18)].spacing(15);
    for (i, s) in bundle.scenarios.iter().enumerate() {
        let selected = state.choices.get(i).copied().flatten();
        let mut options = column![].spacing(5);
        for (j, opt) in s.options.iter().enumerate() {
            let label = match selected {
                Some(_) if j == s.correct_answer_index => format!("[correct] {}", opt),
                Some(chosen) if j == chosen => format!("[your pick] {}", opt),
                _ => opt.clone(),
            };
            // Once an option is chosen the buttons go dead.
            let on_press = if selected.is_none() {
                Some(Event::ChooseOption(i, j))
            } else {
                None
            };
            options = options.push(
                button(text(label).size(14))
                    .on_press_maybe(on_press)
                    .padding(8)
                    .width(Length::Fill),
            );
        }

        let mut block = column![
            text(format!("Scenario {}", i + 1)).size(13),
            text(&s.scenario).size(14),
            text(&s.question).size(16),
            options,
        ]
        .spacing(8);
        if selected.is_some() {
            block = block.push(text(format!("Explanation: {}", s.explanation)).size(13));
        }
        scenarios = scenarios.push(block);
    }

    scrollable(
        column![blanks, true_false, scenarios]
            .spacing(25)
            .padding(15)
            .width(Length::Fill),
    )
    .height(Length::Fill)
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_sizes_to_the_bundle() {
        let bundle = StudyBundle::sample();
        let state = StudyState::new(&bundle);
        assert_eq!(state.tab, Tab::Summary);
        assert_eq!(state.revealed.len(), bundle.fill_in_the_blanks.len());
        assert_eq!(state.guesses.len(), bundle.true_false.len());
        assert_eq!(state.choices.len(), bundle.scenarios.len());
    }

    #[test]
    fn flashcard_navigation_is_cyclic() {
        let bundle = StudyBundle::sample();
        let mut state = StudyState::new(&bundle);
        let count = bundle.flashcards.len();

        for _ in 0..count {
            state.update(&Event::NextCard, &bundle);
        }
        assert_eq!(state.card_index, 0);

        state.update(&Event::PrevCard, &bundle);
        assert_eq!(state.card_index, count - 1);
    }

    #[test]
    fn navigation_resets_the_flip() {
        let bundle = StudyBundle::sample();
        let mut state = StudyState::new(&bundle);

        state.update(&Event::FlipCard, &bundle);
        assert!(state.card_flipped);
        state.update(&Event::NextCard, &bundle);
        assert!(!state.card_flipped);

        state.update(&Event::FlipCard, &bundle);
        state.update(&Event::PrevCard, &bundle);
        assert!(!state.card_flipped);
    }

    #[test]
    fn scenario_selection_is_first_writer_wins() {
        let bundle = StudyBundle::sample();
        let mut state = StudyState::new(&bundle);

        // sample scenarios carry correct_answer_index = 2
        state.update(&Event::ChooseOption(0, 0), &bundle);
        assert_eq!(state.choices[0], Some(0));
        assert_ne!(state.choices[0], Some(bundle.scenarios[0].correct_answer_index));

        state.update(&Event::ChooseOption(0, 3), &bundle);
        assert_eq!(state.choices[0], Some(0));

        // Other items stay independent.
        state.update(&Event::ChooseOption(1, 2), &bundle);
        assert_eq!(state.choices[1], Some(2));
        assert_eq!(state.choices[1], Some(bundle.scenarios[1].correct_answer_index));
    }

    #[test]
    fn scenario_ignores_out_of_range_options() {
        let bundle = StudyBundle::sample();
        let mut state = StudyState::new(&bundle);
        state.update(&Event::ChooseOption(0, 4), &bundle);
        assert_eq!(state.choices[0], None);
    }

    #[test]
    fn true_false_reset_allows_reselection() {
        let bundle = StudyBundle::sample();
        let mut state = StudyState::new(&bundle);

        // sample item 0 is true; guess wrong first
        state.update(&Event::GuessTrueFalse(0, false), &bundle);
        assert_eq!(state.guesses[0], Some(false));
        assert_ne!(state.guesses[0], Some(bundle.true_false[0].is_true));

        state.update(&Event::ResetTrueFalse(0), &bundle);
        assert_eq!(state.guesses[0], None);

        state.update(&Event::GuessTrueFalse(0, true), &bundle);
        assert_eq!(state.guesses[0], Some(true));
        assert_eq!(state.guesses[0], Some(bundle.true_false[0].is_true));
    }

    #[test]
    fn answered_true_false_ignores_further_guesses() {
        let bundle = StudyBundle::sample();
        let mut state = StudyState::new(&bundle);

        state.update(&Event::GuessTrueFalse(2, true), &bundle);
        state.update(&Event::GuessTrueFalse(2, false), &bundle);
        assert_eq!(state.guesses[2], Some(true));
    }

    #[test]
    fn blank_reveal_toggles_independently() {
        let bundle = StudyBundle::sample();
        let mut state = StudyState::new(&bundle);

        state.update(&Event::ToggleBlank(1), &bundle);
        assert!(state.revealed[1]);
        assert!(!state.revealed[0]);

        state.update(&Event::ToggleBlank(1), &bundle);
        assert!(!state.revealed[1]);
    }
}
