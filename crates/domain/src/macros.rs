//! Macro for implementing Display and FromStr for tag enums
//!
//! Views, task difficulties and backend kinds all travel as short lowercase
//! string tags (in documents, config files and environment variables). This
//! macro provides a single implementation for both `Display` and `FromStr`
//! with case-insensitive parsing.
//!
//! # Example
//!
//! ```rust
//! use focusmode_domain::impl_tag_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Theme {
//!     Light,
//!     Dark,
//! }
//!
//! impl_tag_conversions!(Theme {
//!     Light => "light",
//!     Dark => "dark",
//! });
//!
//! assert_eq!("DARK".parse::<Theme>().unwrap(), Theme::Dark);
//! ```

/// Implements Display and FromStr traits for tag enums
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their lowercase tags
#[macro_export]
macro_rules! impl_tag_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// The lowercase tag for this variant.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
