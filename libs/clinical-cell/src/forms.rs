//! Specialty record forms. Each form knows its specialty and checks its own
//! ranges; the JSON carries the specialty as its tag.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use odontogram_cell::tooth::ToothId;
use shared_models::specialty::SpecialtyCode;

pub(crate) fn in_range<T: PartialOrd + Display>(field: &str, value: T, min: T, max: T) -> Result<(), String> {
    if value < min || value > max {
        return Err(format!("{} must be between {} and {}", field, min, max));
    }
    Ok(())
}

fn check_tooth(field: &str, tooth: u8) -> Result<ToothId, String> {
    ToothId::new(tooth).map_err(|e| format!("{}: {}", field, e))
}

fn check_teeth(field: &str, teeth: &[u8]) -> Result<(), String> {
    teeth.iter().try_for_each(|t| check_tooth(field, *t).map(|_| ()))
}

fn check_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} cannot be blank", field));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbingSite {
    Mb,
    B,
    Db,
    Ml,
    L,
    Dl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbingDepth {
    pub tooth: u8,
    pub site: ProbingSite,
    pub depth_mm: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbingSiteRef {
    pub tooth: u8,
    pub site: ProbingSite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToothGrade {
    pub tooth: u8,
    pub grade: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodonticsForm {
    #[serde(default)]
    pub probing_depths: Vec<ProbingDepth>,
    #[serde(default)]
    pub bleeding_sites: Vec<ProbingSiteRef>,
    #[serde(default)]
    pub mobility: Vec<ToothGrade>,
    #[serde(default)]
    pub furcation: Vec<ToothGrade>,
    pub plaque_index: Option<f64>,
}

impl PeriodonticsForm {
    pub const MAX_PROBING_DEPTH_MM: u8 = 15;

    pub fn max_probing_depth(&self) -> Option<u8> {
        self.probing_depths.iter().map(|p| p.depth_mm).max()
    }

    pub fn max_mobility(&self) -> Option<u8> {
        self.mobility.iter().map(|m| m.grade).max()
    }

    fn validate(&self) -> Result<(), String> {
        for site in &self.probing_depths {
            check_tooth("probing_depths.tooth", site.tooth)?;
            in_range("probing_depths.depth_mm", site.depth_mm, 0, Self::MAX_PROBING_DEPTH_MM)?;
        }
        for site in &self.bleeding_sites {
            check_tooth("bleeding_sites.tooth", site.tooth)?;
        }
        for grade in &self.mobility {
            check_tooth("mobility.tooth", grade.tooth)?;
            in_range("mobility.grade", grade.grade, 0, 3)?;
        }
        for grade in &self.furcation {
            check_tooth("furcation.tooth", grade.tooth)?;
            in_range("furcation.grade", grade.grade, 0, 3)?;
        }
        if let Some(index) = self.plaque_index {
            if !index.is_finite() {
                return Err("plaque_index must be a number".to_string());
            }
            in_range("plaque_index", index, 0.0, 3.0)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulpDiagnosis {
    Normal,
    ReversiblePulpitis,
    SymptomaticIrreversiblePulpitis,
    AsymptomaticIrreversiblePulpitis,
    Necrosis,
    PreviouslyTreated,
    PreviouslyInitiated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriapicalDiagnosis {
    Normal,
    SymptomaticApicalPeriodontitis,
    AsymptomaticApicalPeriodontitis,
    AcuteApicalAbscess,
    ChronicApicalAbscess,
    CondensingOsteitis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColdTestResponse {
    Normal,
    NoResponse,
    Exaggerated,
    Lingering,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndodonticsForm {
    pub tooth: u8,
    pub pulp_diagnosis: PulpDiagnosis,
    pub periapical_diagnosis: PeriapicalDiagnosis,
    #[serde(default)]
    pub percussion_tender: bool,
    #[serde(default)]
    pub palpation_tender: bool,
    pub cold_test: Option<ColdTestResponse>,
    pub planned_treatment: Option<String>,
}

impl EndodonticsForm {
    fn validate(&self) -> Result<(), String> {
        check_tooth("tooth", self.tooth)?;
        if let Some(plan) = &self.planned_treatment {
            check_text("planned_treatment", plan)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProsthesisType {
    Crown,
    Bridge,
    Veneer,
    ImplantCrown,
    PartialDenture,
    CompleteDenture,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProsthodonticsForm {
    pub prosthesis_type: ProsthesisType,
    #[serde(default)]
    pub abutment_teeth: Vec<u8>,
    pub occlusion_notes: Option<String>,
    pub shade: Option<String>,
    #[serde(default)]
    pub planned_stages: Vec<String>,
}

impl ProsthodonticsForm {
    fn validate(&self) -> Result<(), String> {
        check_teeth("abutment_teeth", &self.abutment_teeth)?;
        if self.prosthesis_type == ProsthesisType::Bridge && self.abutment_teeth.len() < 2 {
            return Err("a bridge needs at least two abutment teeth".to_string());
        }
        if let Some(shade) = &self.shade {
            check_text("shade", shade)?;
            if shade.trim().chars().count() > 8 {
                return Err("shade must be at most 8 characters".to_string());
            }
        }
        for stage in &self.planned_stages {
            check_text("planned_stages", stage)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FluorideSource {
    Toothpaste,
    Water,
    Supplements,
    Varnish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PediatricsForm {
    pub age_months: u16,
    /// Frankl behavior rating, 1 (definitely negative) to 4 (definitely positive).
    pub frankl_behavior: u8,
    pub caries_risk: RiskLevel,
    #[serde(default)]
    pub fluoride_exposure: Vec<FluorideSource>,
    #[serde(default)]
    pub habits: Vec<String>,
}

impl PediatricsForm {
    pub const MAX_AGE_MONTHS: u16 = 216;

    fn validate(&self) -> Result<(), String> {
        in_range("age_months", self.age_months, 0, Self::MAX_AGE_MONTHS)?;
        in_range("frankl_behavior", self.frankl_behavior, 1, 4)?;
        for habit in &self.habits {
            check_text("habits", habit)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    Periapical,
    Bitewing,
    Occlusal,
    Panoramic,
    Cephalometric,
    Cbct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiologyForm {
    pub image_type: ImageType,
    pub region: Option<String>,
    #[serde(default)]
    pub teeth: Vec<u8>,
    pub findings: Option<String>,
    pub dose_usv: Option<f64>,
}

impl RadiologyForm {
    pub const MAX_DOSE_USV: f64 = 1000.0;

    fn validate(&self) -> Result<(), String> {
        check_teeth("teeth", &self.teeth)?;
        let targeted = matches!(self.image_type, ImageType::Periapical | ImageType::Bitewing);
        let has_region = self.region.as_deref().is_some_and(|r| !r.trim().is_empty());
        if targeted && self.teeth.is_empty() && !has_region {
            return Err("periapical and bitewing images need teeth or a region".to_string());
        }
        if let Some(dose) = self.dose_usv {
            if !dose.is_finite() {
                return Err("dose_usv must be a number".to_string());
            }
            in_range("dose_usv", dose, 0.0, Self::MAX_DOSE_USV)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnesthesiaType {
    Local,
    LocalWithSedation,
    General,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OralSurgeryForm {
    pub procedure: String,
    #[serde(default)]
    pub teeth: Vec<u8>,
    pub anesthesia: AnesthesiaType,
    #[serde(default)]
    pub planned_sedation: bool,
    /// ASA physical status, 1-6.
    pub asa_class: u8,
}

impl OralSurgeryForm {
    fn validate(&self) -> Result<(), String> {
        check_text("procedure", &self.procedure)?;
        check_teeth("teeth", &self.teeth)?;
        in_range("asa_class", self.asa_class, 1, 6)?;
        if self.anesthesia == AnesthesiaType::LocalWithSedation && !self.planned_sedation {
            return Err("local_with_sedation requires planned_sedation".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "specialty", rename_all = "snake_case")]
pub enum SpecialtyForm {
    Periodontics(PeriodonticsForm),
    Endodontics(EndodonticsForm),
    Prosthodontics(ProsthodonticsForm),
    Pediatrics(PediatricsForm),
    Radiology(RadiologyForm),
    OralSurgery(OralSurgeryForm),
}

impl SpecialtyForm {
    pub fn specialty(&self) -> SpecialtyCode {
        match self {
            SpecialtyForm::Periodontics(_) => SpecialtyCode::Periodontics,
            SpecialtyForm::Endodontics(_) => SpecialtyCode::Endodontics,
            SpecialtyForm::Prosthodontics(_) => SpecialtyCode::Prosthodontics,
            SpecialtyForm::Pediatrics(_) => SpecialtyCode::Pediatrics,
            SpecialtyForm::Radiology(_) => SpecialtyCode::Radiology,
            SpecialtyForm::OralSurgery(_) => SpecialtyCode::OralSurgery,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            SpecialtyForm::Periodontics(form) => form.validate(),
            SpecialtyForm::Endodontics(form) => form.validate(),
            SpecialtyForm::Prosthodontics(form) => form.validate(),
            SpecialtyForm::Pediatrics(form) => form.validate(),
            SpecialtyForm::Radiology(form) => form.validate(),
            SpecialtyForm::OralSurgery(form) => form.validate(),
        }
    }

    pub fn is_surgical(&self) -> bool {
        matches!(self, SpecialtyForm::OralSurgery(_))
    }
}
