use serde::{Deserialize, Serialize};

/// Weapon class a player can declare. SMG acts as a flex pick for any
/// tier role but never for the sniper role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WeaponClass {
    T1,
    T2,
    T3,
    T4,
    Sniper,
    Smg,
}

impl WeaponClass {
    pub fn is_flex(&self) -> bool {
        matches!(self, WeaponClass::Smg)
    }
}

/// Team role. Each team carries exactly one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Sniper,
    T1,
    T2,
    T3,
    T4,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Sniper, Role::T1, Role::T2, Role::T3, Role::T4];

    /// The weapon class that natively fills this role.
    pub fn native_class(&self) -> WeaponClass {
        match self {
            Role::Sniper => WeaponClass::Sniper,
            Role::T1 => WeaponClass::T1,
            Role::T2 => WeaponClass::T2,
            Role::T3 => WeaponClass::T3,
            Role::T4 => WeaponClass::T4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TeamSide {
    Alpha,
    Bravo,
}

impl TeamSide {
    pub fn opposite(&self) -> TeamSide {
        match self {
            TeamSide::Alpha => TeamSide::Bravo,
            TeamSide::Bravo => TeamSide::Alpha,
        }
    }
}

impl std::fmt::Display for TeamSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamSide::Alpha => write!(f, "ALPHA"),
            TeamSide::Bravo => write!(f, "BRAVO"),
        }
    }
}

/// A player's declared primary/secondary weapon classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassProfile {
    pub primary: WeaponClass,
    pub secondary: WeaponClass,
}

impl ClassProfile {
    pub fn new(primary: WeaponClass, secondary: WeaponClass) -> Self {
        Self { primary, secondary }
    }

    pub fn declares(&self, class: WeaponClass) -> bool {
        self.primary == class || self.secondary == class
    }
}

impl Default for ClassProfile {
    fn default() -> Self {
        Self {
            primary: WeaponClass::Smg,
            secondary: WeaponClass::T1,
        }
    }
}
