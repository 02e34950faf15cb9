//! Plain-text rendering backend drawing the grid north-up.

use std::io::Write;

use anyhow::{Context, Result as AnyResult};
use gridmerge_core::CellId;
use gridmerge_rendering::{Presentation, RenderingBackend, Scene};

/// Renders scenes as a fixed-width character grid.
///
/// Cells within reach are bracketed, the player's cell is marked with angle
/// brackets, and empty cells show a dot.
#[derive(Debug)]
pub struct TerminalBackend<W> {
    writer: W,
    half_extent: i32,
}

impl<W: Write> TerminalBackend<W> {
    /// Creates a backend showing `half_extent` cells around the player.
    pub fn new(writer: W, half_extent: u32) -> Self {
        Self {
            writer,
            half_extent: i32::try_from(half_extent).unwrap_or(i32::MAX),
        }
    }

    /// Consumes the backend, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn cell_glyph(scene: &Scene, cell: CellId) -> String {
        let Some(snapshot) = scene.cell(cell) else {
            return "     ".to_owned();
        };
        let content = match snapshot.state.token() {
            Some(token) => format!("{:>3}", token.value()),
            None if cell == scene.player_cell => "  @".to_owned(),
            None => "  .".to_owned(),
        };
        if cell == scene.player_cell {
            format!("<{content}>")
        } else if snapshot.in_range {
            format!("[{content}]")
        } else {
            format!(" {content} ")
        }
    }
}

impl<W: Write> RenderingBackend for TerminalBackend<W> {
    fn present(&mut self, presentation: &Presentation) -> AnyResult<()> {
        let scene = &presentation.scene;
        let center = scene.player_cell;
        let mut frame = String::new();

        frame.push_str(&presentation.title);
        frame.push('\n');
        let holding = scene
            .inventory
            .map_or_else(|| "nothing".to_owned(), |token| token.to_string());
        frame.push_str(&format!(
            "at {} in cell {}, holding {}\n",
            scene.player, center, holding
        ));

        for di in (-self.half_extent..=self.half_extent).rev() {
            for dj in -self.half_extent..=self.half_extent {
                let cell = CellId::new(
                    center.i().saturating_add(di),
                    center.j().saturating_add(dj),
                );
                frame.push_str(&Self::cell_glyph(scene, cell));
            }
            frame.push('\n');
        }

        if let Some(feedback) = scene.feedback {
            frame.push_str(&format!("{} at {}\n", feedback.outcome, feedback.cell));
        }
        if let Some(notice) = &scene.notice {
            frame.push_str(&format!("! {notice}\n"));
        }

        self.writer
            .write_all(frame.as_bytes())
            .context("failed to write frame")?;
        self.writer.flush().context("failed to flush frame")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridmerge_core::{CellSnapshot, CellState, InteractionOutcome, Token};
    use gridmerge_rendering::InteractionFeedback;

    fn scene() -> Scene {
        let token = |value| Token::new(value).expect("valid token");
        let cells = vec![
            CellSnapshot {
                cell: CellId::new(-1, 0),
                state: CellState::EMPTY,
                in_range: true,
            },
            CellSnapshot {
                cell: CellId::new(0, -1),
                state: CellState::holding(token(4)),
                in_range: true,
            },
            CellSnapshot {
                cell: CellId::new(0, 0),
                state: CellState::EMPTY,
                in_range: true,
            },
            CellSnapshot {
                cell: CellId::new(1, 1),
                state: CellState::holding(token(2)),
                in_range: false,
            },
        ];
        Scene::new(CellId::new(0, 0).center(), Some(token(8)), cells)
    }

    fn render(scene: Scene) -> String {
        let mut backend = TerminalBackend::new(Vec::new(), 1);
        backend
            .present(&Presentation::new("Welcome to Gridmerge.", scene))
            .expect("frame renders");
        String::from_utf8(backend.into_inner()).expect("utf8 output")
    }

    #[test]
    fn draws_rows_north_first() {
        let output = render(scene());
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "Welcome to Gridmerge.");
        assert!(lines[1].ends_with("holding 8"));
        assert_eq!(lines[2], "             2 ");
        assert_eq!(lines[3], "[  4]<  @>     ");
        assert_eq!(lines[4], "     [  .]     ");
    }

    #[test]
    fn appends_feedback_and_notice() {
        let scene = scene()
            .with_feedback(Some(InteractionFeedback {
                cell: CellId::new(4, 4),
                outcome: InteractionOutcome::OutOfRange,
            }))
            .with_notice(Some("live position unavailable".into()));
        let output = render(scene);

        assert!(output.contains("that cell is out of reach at 4:4\n"));
        assert!(output.ends_with("! live position unavailable\n"));
    }
}
