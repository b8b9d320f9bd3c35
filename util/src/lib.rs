use std::{error::Error, fmt};

/// Produced when an [`EnumFromStr`] derive fails to match a mnemonic.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseEnumError {
    pub value: String,
    pub enum_name: &'static str,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "\"{}\" is not a valid {}",
            &self.value, &self.enum_name
        )
    }
}

impl Error for ParseEnumError {}

/// Derivable on fieldless enums. Matches a lowercased mnemonic against
/// lowercased variant names.
pub trait EnumFromStr: Sized {
    fn from_str(s: &str) -> Result<Self, ParseEnumError>;
}

/// Derivable on fieldless enums. The inverse of [`EnumFromStr`]: prints the
/// variant's lowercased name.
pub trait Mnemonic {
    fn mnemonic(&self) -> &'static str;
}
