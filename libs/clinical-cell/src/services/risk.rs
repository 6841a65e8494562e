//! Rule-based risk flagging for clinical intake.
//!
//! `assess_risk` is pure: same inputs, same flags. Each rule contributes at
//! most one flag; `overall` is the worst of them.

use crate::forms::SpecialtyForm;
use crate::models::{RiskAssessment, RiskFlag, RiskInputs, Severity, Swelling};

pub const FEVER_TEMP_C: f64 = 38.0;
pub const HIGH_FEVER_TEMP_C: f64 = 39.5;
pub const DEEP_POCKET_MM: u8 = 6;

fn flag(name: &str, severity: Severity, detail: impl Into<String>) -> RiskFlag {
    RiskFlag {
        name: name.to_string(),
        severity,
        detail: detail.into(),
    }
}

fn blood_pressure_severity(systolic: Option<u16>, diastolic: Option<u16>) -> Option<Severity> {
    let sys = systolic.unwrap_or(0);
    let dia = diastolic.unwrap_or(0);

    if sys >= 180 || dia >= 110 {
        Some(Severity::Critical)
    } else if sys >= 160 || dia >= 100 {
        Some(Severity::High)
    } else if sys >= 140 || dia >= 90 {
        Some(Severity::Moderate)
    } else {
        None
    }
}

fn form_flags(form: &SpecialtyForm, flags: &mut Vec<RiskFlag>) {
    match form {
        SpecialtyForm::Periodontics(perio) => {
            if let Some(depth) = perio.max_probing_depth().filter(|d| *d >= DEEP_POCKET_MM) {
                flags.push(flag(
                    "deep_pockets",
                    Severity::Moderate,
                    format!("Probing depth of {} mm", depth),
                ));
            }
            if perio.max_mobility() == Some(3) {
                flags.push(flag("tooth_mobility", Severity::Moderate, "Grade 3 tooth mobility"));
            }
        }
        SpecialtyForm::OralSurgery(surgery) if surgery.asa_class >= 3 => {
            let severity = if surgery.asa_class >= 4 { Severity::High } else { Severity::Moderate };
            flags.push(flag("high_asa_class", severity, format!("ASA class {}", surgery.asa_class)));
        }
        _ => {}
    }
}

pub fn assess_risk(inputs: &RiskInputs) -> RiskAssessment {
    let s = &inputs.screening;
    let surgical = s.planned_surgery || inputs.form.as_ref().is_some_and(SpecialtyForm::is_surgical);
    let mut flags = Vec::new();

    if s.pain_score >= 8 {
        flags.push(flag("severe_pain", Severity::High, format!("Pain score {}/10", s.pain_score)));
    } else if s.pain_score >= 4 {
        flags.push(flag("moderate_pain", Severity::Moderate, format!("Pain score {}/10", s.pain_score)));
    }

    let temperature = s.temperature_c.unwrap_or(0.0);
    let febrile = s.fever || temperature >= FEVER_TEMP_C;
    if febrile {
        let severity = if temperature >= HIGH_FEVER_TEMP_C { Severity::High } else { Severity::Moderate };
        let detail = match s.temperature_c {
            Some(t) => format!("Temperature {:.1} °C", t),
            None => "Reported fever".to_string(),
        };
        flags.push(flag("fever", severity, detail));
    }

    match s.swelling {
        Swelling::Localized => flags.push(flag("localized_swelling", Severity::Moderate, "Localized swelling")),
        Swelling::Diffuse => {
            flags.push(flag("diffuse_swelling", Severity::High, "Diffuse swelling"));
            if febrile {
                flags.push(flag(
                    "spreading_infection",
                    Severity::Critical,
                    "Diffuse swelling with fever suggests a spreading infection",
                ));
            }
        }
        Swelling::None => {}
    }

    if s.difficulty_swallowing || s.difficulty_breathing {
        flags.push(flag(
            "airway_compromise",
            Severity::Critical,
            "Difficulty swallowing or breathing",
        ));
    }

    if s.trismus {
        flags.push(flag("trismus", Severity::High, "Limited mouth opening"));
    }

    let surgical_severity = if surgical { Severity::High } else { Severity::Moderate };
    if s.anticoagulants {
        flags.push(flag("anticoagulant_therapy", surgical_severity, "Patient takes anticoagulants"));
    }
    if s.bisphosphonates {
        flags.push(flag("bisphosphonate_therapy", surgical_severity, "Patient takes bisphosphonates"));
    }

    if s.uncontrolled_diabetes {
        flags.push(flag("uncontrolled_diabetes", Severity::Moderate, "Uncontrolled diabetes"));
    }
    if s.pregnant {
        flags.push(flag("pregnancy", Severity::Low, "Patient is pregnant"));
    }
    if s.local_anesthetic_allergy {
        flags.push(flag("local_anesthetic_allergy", Severity::High, "Allergy to local anesthetics"));
    }

    if let Some(severity) = blood_pressure_severity(s.systolic_bp, s.diastolic_bp) {
        let reading = format!(
            "Blood pressure {}/{}",
            s.systolic_bp.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
            s.diastolic_bp.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
        );
        flags.push(flag("blood_pressure", severity, reading));
    }

    if let Some(form) = &inputs.form {
        form_flags(form, &mut flags);
    }

    flags.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.name.cmp(&b.name)));
    let overall = flags.first().map(|f| f.severity);

    RiskAssessment { flags, overall }
}
