use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Var(pub u32);

impl Var {
    pub const fn new(var: u32) -> Self {
        Self(var)
    }

    pub const fn inner(self) -> u32 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn to_external(self) -> u32 {
        self.0 + 1
    }

    pub const fn from_external(var: u32) -> Self {
        Self::new(var - 1)
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_external())
    }
}

/// Why a variable is no longer eligible for branching or clause membership.
///
/// The passes that produce the non-`None` tags live outside this crate;
/// the tags can still arrive through a restored solver state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[repr(u8)]
pub enum Removed {
    #[default]
    None = 0,
    Eliminated = 1,
    Replaced = 2,
    Decomposed = 3,
}

impl Removed {
    pub fn from_u8(x: u8) -> Option<Self> {
        match x {
            0 => Some(Removed::None),
            1 => Some(Removed::Eliminated),
            2 => Some(Removed::Replaced),
            3 => Some(Removed::Decomposed),
            _ => None,
        }
    }
}
