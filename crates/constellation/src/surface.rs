//! A layer of terminal cells, built out of half-block pixels and or text.

use color_eyre::eyre::bail;
use color_eyre::eyre::Result;
use constellation_core::Colour;
use termwiz::surface::Change as TermwizChange;
use termwiz::surface::Position as TermwizPosition;

/// `Surface`
#[derive(Clone)]
pub(crate) struct Surface {
    /// The unique ID of the layer to which this surface belongs.
    pub id: String,
    /// The terminal's width
    pub width: usize,
    /// The terminal's height
    pub height: usize,
    /// The order in which the layer is rendered. Higher layers are drawn over lower ones.
    pub layer: i16,
    /// A surface of terminal cells
    pub surface: termwiz::surface::Surface,
}

impl Surface {
    /// Instantiate
    #[must_use]
    pub fn new(id: String, width: usize, height: usize, layer: i16) -> Self {
        Self {
            id,
            width,
            height,
            layer,
            surface: termwiz::surface::Surface::new(width, height),
        }
    }

    /// Fill a whole cell with 2 pixels using the upper half block, "▀". The upper pixel is the
    /// cell's foreground colour and the lower pixel is its background colour.
    pub fn add_pixel_pair(
        &mut self,
        col: usize,
        row: usize,
        upper: Colour,
        lower: Colour,
    ) -> Result<()> {
        if col >= self.width {
            bail!("Tried to add pixel to column: {col}")
        }
        if row >= self.height {
            bail!("Tried to add pixel to row: {row}")
        }

        self.surface.add_changes(vec![
            TermwizChange::CursorPosition {
                x: TermwizPosition::Absolute(col),
                y: TermwizPosition::Absolute(row),
            },
            Self::make_fg_colour(upper),
            Self::make_bg_colour(lower),
        ]);
        self.surface.add_change("▀");

        Ok(())
    }

    /// Overlay text at a given coord with the given colours.
    pub fn add_text(
        &mut self,
        x: usize,
        y: usize,
        text: String,
        maybe_background_colour: Option<Colour>,
        maybe_foreground_colour: Option<Colour>,
    ) {
        let bg_colour = maybe_background_colour
            .map_or_else(Self::make_default_bg_colour, |colour| {
                Self::make_bg_colour(colour)
            });

        let fg_colour = maybe_foreground_colour.map_or_else(
            || Self::make_fg_colour(constellation_core::colour::WHITE),
            Self::make_fg_colour,
        );

        self.surface.add_changes(vec![
            TermwizChange::CursorPosition {
                x: TermwizPosition::Absolute(x),
                y: TermwizPosition::Absolute(y),
            },
            bg_colour,
            fg_colour,
        ]);
        self.surface.add_change(text);
    }

    /// Make a Termwiz colour attribute. Terminals can't do transparency, so alpha is always
    /// fully opaque.
    #[must_use]
    pub const fn make_colour_attribute(colour: Colour) -> termwiz::color::ColorAttribute {
        termwiz::color::ColorAttribute::TrueColorWithDefaultFallback(termwiz::color::SrgbaTuple(
            colour.0, colour.1, colour.2, 1.0,
        ))
    }

    /// Make a Termwiz background colour
    #[must_use]
    pub const fn make_bg_colour(colour: Colour) -> TermwizChange {
        let colour_attribute = Self::make_colour_attribute(colour);
        TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(colour_attribute))
    }

    /// Make the default Termwiz background colour. This is the non-colour, usually black, that a
    /// terminal displays when nothing else has been set.
    #[must_use]
    pub const fn make_default_bg_colour() -> TermwizChange {
        let colour_attribute = termwiz::color::ColorAttribute::Default;
        TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(colour_attribute))
    }

    /// Make a Termwiz foreground colour
    #[must_use]
    pub const fn make_fg_colour(colour: Colour) -> TermwizChange {
        let colour_attribute = Self::make_colour_attribute(colour);
        TermwizChange::Attribute(termwiz::cell::AttributeChange::Foreground(colour_attribute))
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

    const RED: Colour = (1.0, 0.0, 0.0, 1.0);

    #[test]
    fn pixel_pairs_use_the_upper_half_block() {
        let mut surface = Surface::new("test".into(), 2, 2, 0);
        surface
            .add_pixel_pair(1, 1, RED, constellation_core::colour::WHITE)
            .unwrap();

        let cells = surface.surface.screen_cells();
        let cell = &cells[1][1];
        assert_eq!(cell.str(), "▀");
        assert_eq!(cell.attrs().foreground(), Surface::make_colour_attribute(RED));
        assert_eq!(
            cell.attrs().background(),
            Surface::make_colour_attribute(constellation_core::colour::WHITE)
        );
        assert_eq!(cells[0][0].str(), " ");
    }

    #[test]
    fn pixel_pairs_outside_the_surface_are_errors() {
        let mut surface = Surface::new("test".into(), 2, 2, 0);
        let result = surface.add_pixel_pair(0, 2, RED, RED).unwrap_err();
        assert_eq!(
            format!("{}", result.root_cause()),
            "Tried to add pixel to row: 2"
        );
        assert!(surface.add_pixel_pair(2, 0, RED, RED).is_err());
    }

    #[test]
    fn alpha_is_dropped_for_the_terminal() {
        assert_eq!(
            Surface::make_colour_attribute((0.5, 0.5, 0.5, 0.1)),
            termwiz::color::ColorAttribute::TrueColorWithDefaultFallback(
                termwiz::color::SrgbaTuple(0.5, 0.5, 0.5, 1.0)
            )
        );
    }

    #[test]
    fn add_text() {
        let mut surface = Surface::new("test".into(), 10, 1, 0);
        surface.add_text(2, 0, "hi".to_owned(), None, Some(RED));

        let cells = surface.surface.screen_cells();
        assert_eq!(cells[0][2].str(), "h");
        assert_eq!(cells[0][3].str(), "i");
        assert_eq!(
            cells[0][2].attrs().foreground(),
            Surface::make_colour_attribute(RED)
        );
        assert_eq!(
            cells[0][2].attrs().background(),
            termwiz::color::ColorAttribute::Default
        );
    }
}
