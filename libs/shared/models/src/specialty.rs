use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Dental specialty codes shared by providers, patients and clinical records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SpecialtyCode {
    General,
    Periodontics,
    Endodontics,
    Prosthodontics,
    Pediatrics,
    Radiology,
    OralSurgery,
}

impl SpecialtyCode {
    pub const ALL: [SpecialtyCode; 7] = [
        SpecialtyCode::General,
        SpecialtyCode::Periodontics,
        SpecialtyCode::Endodontics,
        SpecialtyCode::Prosthodontics,
        SpecialtyCode::Pediatrics,
        SpecialtyCode::Radiology,
        SpecialtyCode::OralSurgery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialtyCode::General => "general",
            SpecialtyCode::Periodontics => "periodontics",
            SpecialtyCode::Endodontics => "endodontics",
            SpecialtyCode::Prosthodontics => "prosthodontics",
            SpecialtyCode::Pediatrics => "pediatrics",
            SpecialtyCode::Radiology => "radiology",
            SpecialtyCode::OralSurgery => "oral_surgery",
        }
    }
}

impl fmt::Display for SpecialtyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecialtyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        SpecialtyCode::ALL
            .into_iter()
            .find(|code| code.as_str() == wanted)
            .ok_or_else(|| format!("Unknown specialty: {}", s.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_dashes_and_case() {
        assert_eq!("Oral-Surgery".parse::<SpecialtyCode>(), Ok(SpecialtyCode::OralSurgery));
        assert_eq!(" periodontics ".parse::<SpecialtyCode>(), Ok(SpecialtyCode::Periodontics));
        assert!("orthodontics".parse::<SpecialtyCode>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&SpecialtyCode::OralSurgery).unwrap(), "\"oral_surgery\"");
    }
}
