//! Colours and parsing them from the strings users type into config.

use std::str::FromStr as _;

use snafu::OptionExt as _;

use crate::errors::{ColourSnafu, CoreError};

/// An RGBA colour. Straight (not premultiplied) alpha, all channels in `0.0..=1.0`.
pub type Colour = (f32, f32, f32, f32);

/// A default pure white.
pub const WHITE: Colour = (1.0, 1.0, 1.0, 1.0);

/// A default pure black.
pub const BLACK: Colour = (0.0, 0.0, 0.0, 1.0);

/// Parse a colour from one of the notations people usually copy out of a colour picker:
///
///   * `#rgb`, `#rrggbb` and `#rrggbbaa`
///   * `rgb(255, 0, 0)` and `rgba(255, 0, 0, .5)`
///   * CSS/SVG names like `white` or `rebeccapurple`
///
/// # Errors
/// When the text isn't in any of those notations, or contains non-finite numbers.
#[inline]
pub fn parse(input: &str) -> Result<Colour, CoreError> {
    let text = input.trim().to_lowercase();

    if let Some(hex) = text.strip_prefix('#') {
        return parse_hex(input, hex);
    }

    if let Some(arguments) = text
        .strip_prefix("rgba(")
        .or_else(|| text.strip_prefix("rgb("))
    {
        return parse_functional(input, arguments);
    }

    let named = palette::named::from_str(&text).context(ColourSnafu {
        input,
        reason: "unknown colour name",
    })?;
    Ok(from_srgb_u8(named, 1.0))
}

/// Hex notation, with an optional trailing alpha byte.
fn parse_hex(input: &str, hex: &str) -> Result<Colour, CoreError> {
    let (rgb, alpha) = match hex.len() {
        3 | 6 => (hex, 1.0),
        8 => {
            let (rgb, alpha) = hex.split_at(6);
            let alpha_byte = u8::from_str_radix(alpha, 16).map_err(|error| {
                ColourSnafu {
                    input,
                    reason: error.to_string(),
                }
                .build()
            })?;
            (rgb, f32::from(alpha_byte) / 255.0)
        }
        _ => {
            return ColourSnafu {
                input,
                reason: "hex colours need 3, 6 or 8 digits",
            }
            .fail()
        }
    };

    let srgb = palette::Srgb::<u8>::from_str(rgb).map_err(|error| {
        ColourSnafu {
            input,
            reason: error.to_string(),
        }
        .build()
    })?;
    Ok(from_srgb_u8(srgb, alpha))
}

/// The `rgb(...)`/`rgba(...)` notation. Channels are 0-255, alpha is 0-1.
fn parse_functional(input: &str, arguments: &str) -> Result<Colour, CoreError> {
    let inner = arguments.strip_suffix(')').context(ColourSnafu {
        input,
        reason: "missing closing bracket",
    })?;

    let mut numbers = Vec::new();
    for part in inner.split(',') {
        let number = part.trim().parse::<f32>().map_err(|error| {
            ColourSnafu {
                input,
                reason: format!("'{}': {error}", part.trim()),
            }
            .build()
        })?;
        if !number.is_finite() {
            return ColourSnafu {
                input,
                reason: "channels must be finite numbers",
            }
            .fail();
        }
        numbers.push(number);
    }

    let (red, green, blue, alpha) = match numbers.as_slice() {
        [red, green, blue] => (*red, *green, *blue, 1.0),
        [red, green, blue, alpha] => (*red, *green, *blue, *alpha),
        _ => {
            return ColourSnafu {
                input,
                reason: "expected 3 or 4 channels",
            }
            .fail()
        }
    };

    Ok((
        (red / 255.0).clamp(0.0, 1.0),
        (green / 255.0).clamp(0.0, 1.0),
        (blue / 255.0).clamp(0.0, 1.0),
        alpha.clamp(0.0, 1.0),
    ))
}

/// Convert `palette`'s 8 bit colour into ours.
fn from_srgb_u8(srgb: palette::Srgb<u8>, alpha: f32) -> Colour {
    let float: palette::Srgb<f32> = srgb.into_format();
    (float.red, float.green, float.blue, alpha)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests aren't so strict")]
mod test {
    use super::*;

    fn assert_close(actual: Colour, expected: Colour) {
        let channels = [
            (actual.0, expected.0),
            (actual.1, expected.1),
            (actual.2, expected.2),
            (actual.3, expected.3),
        ];
        for (left, right) in channels {
            assert!((left - right).abs() < 0.01, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn named_colours() {
        assert_close(parse("white").unwrap(), WHITE);
        assert_close(parse("Green").unwrap(), (0.0, 0.502, 0.0, 1.0));
    }

    #[test]
    fn hex_colours() {
        assert_close(parse("#000000").unwrap(), BLACK);
        assert_close(parse("#f00").unwrap(), (1.0, 0.0, 0.0, 1.0));
        assert_close(parse("#5300a2").unwrap(), (0.325, 0.0, 0.635, 1.0));
        assert_close(parse("#ffffff80").unwrap(), (1.0, 1.0, 1.0, 0.502));
    }

    #[test]
    fn functional_colours() {
        assert_close(parse("rgba(255,255,255,.5)").unwrap(), (1.0, 1.0, 1.0, 0.5));
        assert_close(parse("rgba(0, 0, 0, .1)").unwrap(), (0.0, 0.0, 0.0, 0.1));
        assert_close(parse("rgb(83, 0, 162)").unwrap(), (0.325, 0.0, 0.635, 1.0));
    }

    #[test]
    fn out_of_range_channels_are_clamped() {
        assert_close(parse("rgba(300, -5, 0, 2)").unwrap(), (1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn bad_colours() {
        assert!(parse("not-a-colour").is_err());
        assert!(parse("#12345").is_err());
        assert!(parse("rgb(1, 2)").is_err());
        assert!(parse("rgb(1, 2, 3").is_err());
        assert!(parse("rgb(nan, 0, 0)").is_err());
    }
}
