// Pen colour palette.
//
// The game server hands each player a colour name from its own list. The
// client knows seven of them and renders each with two shades: a light
// "pending" shade while a cell is being held and a saturated "claimed"
// shade once the claim lands. Names outside the palette (the server also
// owns `yellow`) are preserved verbatim so they still compare equal when
// scoring, but render with the neutral default pair.
//
// `ColourName` serializes as its plain lowercase name via `From<String>` /
// `Into<String>`, so unknown names survive a decode/encode cycle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shade rendered for cells nobody holds.
pub const OPEN_SHADE: &str = "#ffffff";

/// Shade pair used for colours outside the palette.
pub const NEUTRAL_SHADES: Shades = Shades {
    pending: "#d9d9d9",
    claimed: "#7f7f7f",
};

/// A player's pen colour.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColourName {
    Blue,
    Green,
    Red,
    Orange,
    Purple,
    Pink,
    Cyan,
    /// Any name the palette doesn't know. Kept for equality checks.
    Other(String),
}

/// The two shades a colour renders with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shades {
    pub pending: &'static str,
    pub claimed: &'static str,
}

impl ColourName {
    /// Every palette colour, in the order the palette lists them.
    pub const PALETTE: [ColourName; 7] = [
        ColourName::Blue,
        ColourName::Green,
        ColourName::Red,
        ColourName::Orange,
        ColourName::Purple,
        ColourName::Pink,
        ColourName::Cyan,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ColourName::Blue => "blue",
            ColourName::Green => "green",
            ColourName::Red => "red",
            ColourName::Orange => "orange",
            ColourName::Purple => "purple",
            ColourName::Pink => "pink",
            ColourName::Cyan => "cyan",
            ColourName::Other(name) => name,
        }
    }

    /// `(pending, claimed)` shades; unknown names get `NEUTRAL_SHADES`.
    pub fn shades(&self) -> Shades {
        let (pending, claimed) = match self {
            ColourName::Blue => ("#9ecbff", "#1f6feb"),
            ColourName::Green => ("#a7e3a1", "#2ea043"),
            ColourName::Red => ("#ffaba8", "#cf222e"),
            ColourName::Orange => ("#ffd19a", "#e16f24"),
            ColourName::Purple => ("#d2b4fe", "#8250df"),
            ColourName::Pink => ("#ffbedd", "#d63384"),
            ColourName::Cyan => ("#a5eef5", "#1b9aaa"),
            ColourName::Other(_) => return NEUTRAL_SHADES,
        };
        Shades { pending, claimed }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ColourName::Other(_))
    }
}

impl From<String> for ColourName {
    fn from(name: String) -> Self {
        match name.as_str() {
            "blue" => ColourName::Blue,
            "green" => ColourName::Green,
            "red" => ColourName::Red,
            "orange" => ColourName::Orange,
            "purple" => ColourName::Purple,
            "pink" => ColourName::Pink,
            "cyan" => ColourName::Cyan,
            _ => ColourName::Other(name),
        }
    }
}

impl From<&str> for ColourName {
    fn from(name: &str) -> Self {
        ColourName::from(name.to_owned())
    }
}

impl From<ColourName> for String {
    fn from(colour: ColourName) -> Self {
        match colour {
            ColourName::Other(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ColourName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
