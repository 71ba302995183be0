use iced::{
    Color, Element, Length, Theme, border,
    widget::{column, container, container::Style, container::bordered_box, row, text},
};

use crate::pipeline::RunPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Acquire,
    Recognize,
    Classify,
    Done,
}

impl Stage {
    const ALL: [Stage; 4] = [Stage::Acquire, Stage::Recognize, Stage::Classify, Stage::Done];

    fn label(self) -> &'static str {
        match self {
            Stage::Acquire => "Preview",
            Stage::Recognize => "Recognize",
            Stage::Classify => "Classify",
            Stage::Done => "Done",
        }
    }

    /// Furthest stage a run in `phase` has reached
    fn reached(phase: RunPhase) -> Option<Stage> {
        match phase {
            RunPhase::Idle => None,
            RunPhase::FileSelected | RunPhase::PreviewReady => Some(Stage::Acquire),
            RunPhase::Recognizing => Some(Stage::Recognize),
            RunPhase::Classifying => Some(Stage::Classify),
            RunPhase::Done | RunPhase::Error => Some(Stage::Done),
        }
    }

    fn style(self, reached: Option<Stage>, failed: bool) -> impl Fn(&Theme) -> Style {
        move |theme: &Theme| {
            let style = bordered_box(theme).border(border::width(2));
            let palette = theme.palette();
            match reached {
                Some(current) if failed && self == Stage::Done && current == Stage::Done => {
                    style.background(palette.danger)
                }
                // stages already passed are greyed out
                Some(current) if self < current => {
                    let mut color_rgba = palette.background.into_rgba8();
                    color_rgba[0] /= 2;
                    color_rgba[1] /= 2;
                    color_rgba[2] /= 2;
                    style.background(Color::from_rgb8(color_rgba[0], color_rgba[1], color_rgba[2]))
                }
                Some(current) if self == current => style.background(palette.primary),
                _ => style.background(palette.background),
            }
        }
    }
}

/// Row of boxes showing how far the current run has progressed
pub fn stage_indicator<'a, Message: 'a>(phase: RunPhase) -> Element<'a, Message> {
    let reached = Stage::reached(phase);
    let failed = phase == RunPhase::Error;
    let boxes = Stage::ALL.into_iter().map(|stage| {
        Element::from(
            container(text(stage.label()))
                .style(stage.style(reached, failed))
                .padding(8),
        )
    });
    row(boxes).spacing(6).into()
}

/// Titled block used for the result areas
pub fn section<'a, Message: 'a>(
    title: &'a str,
    body: impl Into<Element<'a, Message>>,
) -> Element<'a, Message> {
    container(column![text(title).size(22), body.into()].spacing(8))
        .width(Length::Fill)
        .padding(10)
        .style(bordered_box)
        .into()
}
