//! Shared state and behaviour useful to every task that renders a layer.

use color_eyre::eyre::Result;

/// Shared state and behaviour useful to every task that renders a layer.
pub(crate) struct Layer {
    /// A unique identifier.
    pub id: String,
    /// The compositing layer. Higher layers are rendered on top.
    pub layer: i16,
    /// A channel to send final rendered output.
    pub output_channel: tokio::sync::mpsc::Sender<crate::run::FrameUpdate>,
    /// TTY width
    pub width: u16,
    /// TTY height
    pub height: u16,
    /// The target frame rate.
    pub frame_rate: u32,
    /// The time at which the previous frame was rendered.
    pub last_frame_tick: std::time::Instant,
}

impl Layer {
    /// Instantiate
    pub(crate) fn new(
        id: &str,
        layer: i16,
        output_channel: tokio::sync::mpsc::Sender<crate::run::FrameUpdate>,
        tty_size: crate::shared_state::TTYSize,
        frame_rate: u32,
    ) -> Self {
        Self {
            id: id.to_owned(),
            layer,
            output_channel,
            width: tty_size.width,
            height: tty_size.height,
            frame_rate,
            last_frame_tick: std::time::Instant::now(),
        }
    }

    /// Is there anywhere to render to?
    pub const fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Keep track of the size of the user's terminal.
    pub const fn set_tty_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    /// Handle common protocol messages, like resizing and config changes.
    pub(crate) fn handle_common_protocol_messages(&mut self, message: &crate::run::Protocol) {
        #[expect(
            clippy::wildcard_enum_match_arm,
            reason = "We're just handling the common cases here."
        )]
        match message {
            crate::run::Protocol::Resize { width, height } => {
                self.set_tty_size(*width, *height);
            }
            crate::run::Protocol::Config(config) => self.frame_rate = config.frame_rate,
            _ => (),
        }
    }

    /// Send a finished surface to the main renderer.
    pub(crate) async fn send_output(&self, surface: crate::surface::Surface) -> Result<()> {
        self.output_channel
            .send(crate::run::FrameUpdate::Layer(surface))
            .await?;
        Ok(())
    }

    /// Tell the renderer to stop showing this layer.
    pub(crate) async fn send_removal(&self) -> Result<()> {
        self.output_channel
            .send(crate::run::FrameUpdate::RemoveLayer(self.id.clone()))
            .await?;
        Ok(())
    }

    /// Sleep until the next frame render is due.
    pub async fn sleep_until_next_frame_tick(&mut self) {
        let target = crate::renderer::ONE_MICROSECOND.wrapping_div(self.frame_rate.max(1).into());
        let target_frame_rate_micro = std::time::Duration::from_micros(target);
        if let Some(wait) = target_frame_rate_micro.checked_sub(self.last_frame_tick.elapsed()) {
            tokio::time::sleep(wait).await;
        }
        self.last_frame_tick = std::time::Instant::now();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn layer() -> Layer {
        let (output_channel, _) = tokio::sync::mpsc::channel(1);
        Layer::new(
            "test",
            0,
            output_channel,
            crate::shared_state::TTYSize::default(),
            30,
        )
    }

    #[test]
    fn becomes_ready_once_sized() {
        let mut layer = layer();
        assert!(!layer.is_ready());
        layer.handle_common_protocol_messages(&crate::run::Protocol::Resize {
            width: 10,
            height: 5,
        });
        assert!(layer.is_ready());
        assert_eq!((layer.width, layer.height), (10, 5));
    }

    #[test]
    fn follows_the_configured_frame_rate() {
        let mut layer = layer();
        let config = crate::config::main::Config {
            frame_rate: 60,
            ..Default::default()
        };
        layer.handle_common_protocol_messages(&crate::run::Protocol::Config(config));
        assert_eq!(layer.frame_rate, 60);
    }
}
