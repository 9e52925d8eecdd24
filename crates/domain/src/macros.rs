//! Macro for implementing Display and FromStr for tag enums
//!
//! Status and kind enums are persisted as lowercase strings. This macro keeps
//! the string mapping in one place and gives both directions from it.
//!
//! # Example
//!
//! ```rust
//! use brewops_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum KegStatus {
//!     Clean,
//!     Filled,
//!     Dispatched,
//! }
//!
//! impl_domain_status_conversions!(KegStatus {
//!     Clean => "clean",
//!     Filled => "filled",
//!     Dispatched => "dispatched",
//! });
//!
//! assert_eq!(KegStatus::Filled.to_string(), "filled");
//! assert_eq!("DISPATCHED".parse::<KegStatus>(), Ok(KegStatus::Dispatched));
//! ```

/// Implements Display and FromStr traits for tag enums
///
/// Parsing is case-insensitive; display always yields the mapped string.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
