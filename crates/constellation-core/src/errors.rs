//! Errors for this library

/// All the known errors returned by this crate.
#[derive(Debug, snafu::Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum CoreError {
    #[snafu(display("Invalid value for `{field}`: {reason}"))]
    /// A simulation setting that can't be used.
    InvalidConfig {
        /// The name of the offending setting
        field: String,
        /// Why the value was refused
        reason: String,
    },

    #[snafu(display("Couldn't parse colour '{input}': {reason}"))]
    /// A colour string that isn't in any of the supported notations.
    Colour {
        /// The original text of the colour
        input: String,
        /// What went wrong
        reason: String,
    },
}
