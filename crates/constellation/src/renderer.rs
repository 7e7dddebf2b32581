//! Composite all the layers and render them to the user's terminal

use std::sync::Arc;

use color_eyre::eyre::{ContextCompat as _, Result};
use termwiz::cell::Cell;
use tokio::sync::mpsc;

use termwiz::surface::Surface as TermwizSurface;
use termwiz::surface::{Change as TermwizChange, Position as TermwizPosition};
use termwiz::terminal::buffered::BufferedTerminal;
use termwiz::terminal::{ScreenSize, Terminal as TermwizTerminal};

use crate::run::FrameUpdate;
use crate::shared_state::SharedState;

/// The number of microseconds in a second
pub const ONE_MICROSECOND: u64 = 1_000_000;

/// How often to check the user's terminal for a change of size, even when nothing is rendering.
const RESIZE_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(250);

/// `Render`
pub(crate) struct Renderer {
    /// Shared app state
    pub state: Arc<SharedState>,
    /// The terminal's width
    pub width: u16,
    /// The terminal's height
    pub height: u16,
    /// The latest frame of every layer, lowest layer first
    pub layers: Vec<crate::surface::Surface>,
}

impl Renderer {
    /// Create a renderer to render to a user's terminal
    pub fn new(state: Arc<SharedState>) -> Result<Self> {
        let size = Self::get_users_tty_size()?;
        Ok(Self::with_size(
            state,
            size.cols.try_into()?,
            size.rows.try_into()?,
        ))
    }

    /// Create a renderer for a terminal of a known size.
    pub const fn with_size(state: Arc<SharedState>, width: u16, height: u16) -> Self {
        Self {
            state,
            width,
            height,
            layers: Vec::new(),
        }
    }

    /// Instantiate and run
    pub fn start(
        state: Arc<SharedState>,
        frames_rx: mpsc::Receiver<FrameUpdate>,
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let protocol_rx = protocol_tx.subscribe();
        tokio::spawn(async move {
            match Self::new(Arc::clone(&state)) {
                Ok(mut renderer) => {
                    let result = renderer
                        .run(frames_rx, protocol_rx, protocol_tx.clone())
                        .await;

                    if let Err(error) = result {
                        crate::run::broadcast_protocol_end(&protocol_tx);
                        return Err(error);
                    };
                }
                Err(error) => {
                    crate::run::broadcast_protocol_end(&protocol_tx);
                    return Err(error);
                }
            };

            Ok(())
        })
    }

    /// We need this just because I can't figure out how to pass `Box<dyn Terminal>` to
    /// `BufferedTerminal::new()`
    fn get_termwiz_terminal() -> Result<impl TermwizTerminal> {
        let capabilities = termwiz::caps::Capabilities::new_from_env()?;
        Ok(termwiz::terminal::new_terminal(capabilities)?)
    }

    /// Just for initialisation
    pub fn get_users_tty_size() -> Result<ScreenSize> {
        let mut terminal = Self::get_termwiz_terminal()?;
        Ok(terminal.get_screen_size()?)
    }

    /// Get the user's current terminal size and propagate it
    pub async fn handle_resize<T: TermwizTerminal + Send>(
        &mut self,
        composited_terminal: &mut BufferedTerminal<T>,
        protocol_tx: &tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        let is_resized = composited_terminal.check_for_resize()?;
        if !is_resized {
            return Ok(());
        }

        composited_terminal.repaint()?;

        let (width, height) = composited_terminal.dimensions();
        self.width = width.try_into()?;
        self.height = height.try_into()?;
        tracing::debug!("User's terminal resized to {}x{}", self.width, self.height);
        self.state.set_tty_size(self.width, self.height).await;
        protocol_tx.send(crate::run::Protocol::Resize {
            width: self.width,
            height: self.height,
        })?;

        Ok(())
    }

    /// Listen for frame updates from all the layers. The user's terminal is always put back how
    /// it was, even when there's an error.
    async fn run(
        &mut self,
        frames: mpsc::Receiver<FrameUpdate>,
        protocol_rx: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        tracing::debug!("Putting user's terminal into raw mode");
        let mut copy_of_users_terminal = Self::get_termwiz_terminal()?;
        copy_of_users_terminal.set_raw_mode()?;
        copy_of_users_terminal.enter_alternate_screen()?;
        let mut composited_terminal = BufferedTerminal::new(copy_of_users_terminal)?;
        Self::cursor_visibility(&mut composited_terminal, false)?;

        let result = self
            .render_loop(&mut composited_terminal, frames, protocol_rx, &protocol_tx)
            .await;

        tracing::debug!("Restoring user's terminal");
        Self::cursor_visibility(&mut composited_terminal, true)?;
        composited_terminal.terminal().exit_alternate_screen()?;
        composited_terminal.terminal().set_cooked_mode()?;

        result
    }

    /// The main loop.
    async fn render_loop<T: TermwizTerminal + Send>(
        &mut self,
        composited_terminal: &mut BufferedTerminal<T>,
        mut frames: mpsc::Receiver<FrameUpdate>,
        mut protocol_rx: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
        protocol_tx: &tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        let mut resize_poll = tokio::time::interval(RESIZE_POLL_INTERVAL);

        tracing::debug!("Starting render loop");
        #[expect(
            clippy::integer_division_remainder_used,
            reason = "`tokio::select! generates this.`"
        )]
        loop {
            tokio::select! {
                Some(update) = frames.recv() => {
                    self.handle_resize(composited_terminal, protocol_tx).await?;
                    self.store_update(update);
                    self.render(composited_terminal)?;
                }
                _ = resize_poll.tick() => {
                    self.handle_resize(composited_terminal, protocol_tx).await?;
                }
                Ok(message) = protocol_rx.recv() => {
                    if matches!(message, crate::run::Protocol::End) {
                        break;
                    }
                }
            }
        }
        tracing::debug!("Exited render loop");

        Ok(())
    }

    /// Hide/show the cursor in the end user's terminal.
    fn cursor_visibility(
        composited_terminal: &mut BufferedTerminal<impl TermwizTerminal>,
        is_visible: bool,
    ) -> Result<()> {
        let cursor_visibility = if is_visible {
            termwiz::surface::CursorVisibility::Visible
        } else {
            termwiz::surface::CursorVisibility::Hidden
        };
        composited_terminal.add_change(TermwizChange::CursorVisibility(cursor_visibility));
        composited_terminal.flush()?;

        Ok(())
    }

    /// Keep the latest frame of each layer.
    fn store_update(&mut self, update: FrameUpdate) {
        match update {
            FrameUpdate::Layer(surface) => {
                match self.layers.iter_mut().find(|layer| layer.id == surface.id) {
                    Some(existing) => *existing = surface,
                    None => self.layers.push(surface),
                }
                self.layers.sort_by_key(|layer| layer.layer);
            }
            FrameUpdate::RemoveLayer(id) => self.layers.retain(|layer| layer.id != id),
        }
    }

    /// Flatten all the layers into a single frame.
    fn composite(&mut self) -> Result<TermwizSurface> {
        let mut new_frame = TermwizSurface::new(self.width.into(), self.height.into());
        for layer in &mut self.layers {
            let frame_size = layer.surface.dimensions();
            let cells = layer.surface.screen_cells();
            for y in 0..usize::from(self.height).min(frame_size.1) {
                for x in 0..usize::from(self.width).min(frame_size.0) {
                    Self::add_cell(&mut new_frame, &cells, x, y)?;
                }
            }
        }

        Ok(new_frame)
    }

    /// Do a single render to the user's actual terminal. It uses a diffing algorithm to make
    /// the minimum number of changes.
    fn render(
        &mut self,
        composited_terminal: &mut BufferedTerminal<impl TermwizTerminal>,
    ) -> Result<()> {
        let new_frame = self.composite()?;
        composited_terminal.draw_from_screen(&new_frame, 0, 0);
        composited_terminal.flush()?;

        Ok(())
    }

    /// Add a single cell to the frame
    fn add_cell(
        frame: &mut TermwizSurface,
        cells: &[&mut [Cell]],
        x: usize,
        y: usize,
    ) -> Result<()> {
        let cell = &cells
            .get(y)
            .context(format!("No y coord ({y}) for cell"))?
            .get(x)
            .context(format!("No x coord ({x}) for cell"))?;
        let character = cell.str();
        let is_cell_bg_default = matches!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );
        if character == " " && is_cell_bg_default {
            return Ok(());
        }

        frame.add_changes(vec![
            TermwizChange::CursorPosition {
                x: TermwizPosition::Absolute(x),
                y: TermwizPosition::Absolute(y),
            },
            TermwizChange::Attribute(termwiz::cell::AttributeChange::Foreground(
                cell.attrs().foreground(),
            )),
            TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(
                cell.attrs().background(),
            )),
        ]);
        frame.add_change(character);
        Ok(())
    }
}

#[cfg(test)]
#[expect(
    clippy::indexing_slicing,
    clippy::unwrap_used,
    reason = "Tests aren't so strict"
)]
mod test {
    use super::*;

    const RED: constellation_core::Colour = (1.0, 0.0, 0.0, 1.0);

    fn renderer() -> Renderer {
        Renderer::with_size(SharedState::init(), 4, 2)
    }

    fn filled_layer(id: &str, layer: i16, colour: constellation_core::Colour) -> FrameUpdate {
        let mut surface = crate::surface::Surface::new(id.to_owned(), 4, 2, layer);
        for row in 0..2 {
            for col in 0..4 {
                surface.add_pixel_pair(col, row, colour, colour).unwrap();
            }
        }
        FrameUpdate::Layer(surface)
    }

    fn text_layer(id: &str, layer: i16, text: &str) -> FrameUpdate {
        let mut surface = crate::surface::Surface::new(id.to_owned(), 4, 2, layer);
        surface.add_text(0, 0, text.to_owned(), None, None);
        FrameUpdate::Layer(surface)
    }

    #[test]
    fn higher_layers_are_drawn_on_top() {
        let mut renderer = renderer();
        renderer.store_update(text_layer("menu", 100, "hi"));
        renderer.store_update(filled_layer("canvas", 0, RED));

        let mut frame = renderer.composite().unwrap();
        let cells = frame.screen_cells();
        assert_eq!(cells[0][0].str(), "h");
        assert_eq!(cells[0][1].str(), "i");
        assert_eq!(cells[0][2].str(), "▀");
        assert_eq!(cells[1][0].str(), "▀");
        assert_eq!(
            cells[1][0].attrs().background(),
            crate::surface::Surface::make_colour_attribute(RED)
        );
    }

    #[test]
    fn new_frames_replace_old_ones() {
        let mut renderer = renderer();
        renderer.store_update(text_layer("menu", 100, "ab"));
        renderer.store_update(text_layer("menu", 100, "cd"));
        assert_eq!(renderer.layers.len(), 1);

        let mut frame = renderer.composite().unwrap();
        assert_eq!(frame.screen_cells()[0][0].str(), "c");
    }

    #[test]
    fn removed_layers_stop_rendering() {
        let mut renderer = renderer();
        renderer.store_update(filled_layer("canvas", 0, RED));
        renderer.store_update(text_layer("menu", 100, "hi"));
        renderer.store_update(FrameUpdate::RemoveLayer("menu".to_owned()));

        let mut frame = renderer.composite().unwrap();
        assert_eq!(frame.screen_cells()[0][0].str(), "▀");
    }

    #[test]
    fn oversized_layers_are_cropped() {
        let mut renderer = Renderer::with_size(SharedState::init(), 2, 1);
        renderer.store_update(filled_layer("canvas", 0, RED));

        let mut frame = renderer.composite().unwrap();
        assert_eq!(frame.dimensions(), (2, 1));
        assert_eq!(frame.screen_cells()[0][1].str(), "▀");
    }
}
