//! FDI two-digit tooth numbering.
//!
//! The first digit is the quadrant (1-4 permanent, 5-8 primary), the second
//! the position counted from the midline (1-8 permanent, 1-5 primary).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ToothId(u8);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dentition {
    #[default]
    Permanent,
    Primary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToothKind {
    Incisor,
    Canine,
    Premolar,
    Molar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    Upper,
    Lower,
}

/// Tooth surfaces: mesial, distal, buccal, lingual, occlusal, incisal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Surface {
    M,
    D,
    B,
    L,
    O,
    I,
}

impl ToothId {
    pub fn new(code: u8) -> Result<Self, String> {
        let quadrant = code / 10;
        let position = code % 10;
        let max_position = match quadrant {
            1..=4 => 8,
            5..=8 => 5,
            _ => return Err(format!("Invalid tooth {}: quadrant must be 1-8", code)),
        };
        if position == 0 || position > max_position {
            return Err(format!(
                "Invalid tooth {}: position must be 1-{} in quadrant {}",
                code, max_position, quadrant
            ));
        }
        Ok(Self(code))
    }

    pub fn code(&self) -> u8 {
        self.0
    }

    pub fn quadrant(&self) -> u8 {
        self.0 / 10
    }

    pub fn position(&self) -> u8 {
        self.0 % 10
    }

    pub fn dentition(&self) -> Dentition {
        if self.quadrant() >= 5 {
            Dentition::Primary
        } else {
            Dentition::Permanent
        }
    }

    pub fn arch(&self) -> Arch {
        match self.quadrant() {
            1 | 2 | 5 | 6 => Arch::Upper,
            _ => Arch::Lower,
        }
    }

    pub fn kind(&self) -> ToothKind {
        match (self.dentition(), self.position()) {
            (_, 1 | 2) => ToothKind::Incisor,
            (_, 3) => ToothKind::Canine,
            (Dentition::Permanent, 4 | 5) => ToothKind::Premolar,
            _ => ToothKind::Molar,
        }
    }

    /// Same position on the other side of the midline.
    pub fn mirror(&self) -> ToothId {
        let quadrant = match self.quadrant() {
            q if q % 2 == 1 => q + 1,
            q => q - 1,
        };
        ToothId(quadrant * 10 + self.position())
    }
}

impl TryFrom<u8> for ToothId {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        ToothId::new(code)
    }
}

impl From<ToothId> for u8 {
    fn from(tooth: ToothId) -> Self {
        tooth.0
    }
}

impl FromStr for ToothId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code: u8 = s.trim().parse().map_err(|_| format!("Invalid tooth '{}'", s))?;
        ToothId::new(code)
    }
}

impl fmt::Display for ToothId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Dentition {
    fn quadrants(&self) -> [u8; 4] {
        match self {
            Dentition::Permanent => [1, 2, 3, 4],
            Dentition::Primary => [5, 6, 7, 8],
        }
    }

    fn teeth_per_quadrant(&self) -> u8 {
        match self {
            Dentition::Permanent => 8,
            Dentition::Primary => 5,
        }
    }

    /// Teeth of one arch from the patient's right to left as seen from the
    /// front: 18..11 then 21..28 for the upper permanent arch.
    pub fn arch_order(&self, arch: Arch) -> Vec<ToothId> {
        let [upper_right, upper_left, lower_left, lower_right] = self.quadrants();
        let (right, left) = match arch {
            Arch::Upper => (upper_right, upper_left),
            Arch::Lower => (lower_right, lower_left),
        };
        let n = self.teeth_per_quadrant();

        (1..=n).rev()
            .map(|p| ToothId(right * 10 + p))
            .chain((1..=n).map(|p| ToothId(left * 10 + p)))
            .collect()
    }

    pub fn teeth(&self) -> Vec<ToothId> {
        let mut teeth = self.arch_order(Arch::Upper);
        teeth.extend(self.arch_order(Arch::Lower));
        teeth
    }
}

impl fmt::Display for Dentition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dentition::Permanent => "permanent",
            Dentition::Primary => "primary",
        })
    }
}

impl Surface {
    /// Occlusal surfaces exist on premolars and molars, incisal edges on
    /// incisors and canines.
    pub fn applies_to(&self, kind: ToothKind) -> bool {
        match self {
            Surface::O => matches!(kind, ToothKind::Premolar | ToothKind::Molar),
            Surface::I => matches!(kind, ToothKind::Incisor | ToothKind::Canine),
            _ => true,
        }
    }
}
