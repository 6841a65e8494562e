//! Field rules for patient registration, kept free of I/O.

use std::str::FromStr;

use chrono::NaiveDate;

use shared_utils::validation::{is_valid_email, is_valid_phone, normalize_email, require_non_blank};

use crate::models::{CreatePatientRequest, NewPatient, PatientError, PatientSpecialtyInput, Sex};

fn required(field: &str, value: Option<&str>) -> Result<String, PatientError> {
    require_non_blank(field, value).map_err(PatientError::ValidationError)
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Accepts `YYYY-MM-DD`; the date may not be after `today`.
pub fn parse_date_of_birth(value: &str, today: NaiveDate) -> Result<NaiveDate, PatientError> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| PatientError::InvalidDateOfBirth(format!("'{}' is not a YYYY-MM-DD date", value.trim())))?;
    if date > today {
        return Err(PatientError::InvalidDateOfBirth("date of birth is in the future".to_string()));
    }
    Ok(date)
}

pub fn check_phone(phone: &str) -> Result<(), PatientError> {
    if is_valid_phone(phone) {
        Ok(())
    } else {
        Err(PatientError::ValidationError(format!("Invalid phone number: {}", phone)))
    }
}

/// Normalizes and validates an optional email. Blank means none.
pub fn check_email(email: Option<String>) -> Result<Option<String>, PatientError> {
    match optional(email).map(|e| normalize_email(&e)) {
        Some(email) if !is_valid_email(&email) => {
            Err(PatientError::ValidationError(format!("Invalid email: {}", email)))
        }
        other => Ok(other),
    }
}

pub fn parse_sex(value: &str) -> Result<Sex, PatientError> {
    Sex::from_str(value).map_err(PatientError::ValidationError)
}

pub fn validate_new_patient(request: CreatePatientRequest, today: NaiveDate) -> Result<NewPatient, PatientError> {
    let first_name = required("first_name", request.first_name.as_deref())?;
    let last_name = required("last_name", request.last_name.as_deref())?;
    let phone = required("phone", request.phone.as_deref())?;
    let date_of_birth = required("date_of_birth", request.date_of_birth.as_deref())?;
    let sex = required("sex", request.sex.as_deref())?;

    check_phone(&phone)?;

    Ok(NewPatient {
        first_name,
        last_name,
        phone,
        date_of_birth: parse_date_of_birth(&date_of_birth, today)?,
        sex: parse_sex(&sex)?,
        email: check_email(request.email)?,
        address: optional(request.address),
        allergies: optional(request.allergies),
        medical_notes: optional(request.medical_notes),
    })
}

pub fn check_primary_specialties(inputs: &[PatientSpecialtyInput]) -> Result<(), PatientError> {
    if inputs.iter().filter(|s| s.is_primary).count() > 1 {
        return Err(PatientError::MultiplePrimarySpecialties);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn complete() -> CreatePatientRequest {
        CreatePatientRequest {
            first_name: Some(" Aoife ".to_string()),
            last_name: Some("Byrne".to_string()),
            phone: Some("+353 87 123 4567".to_string()),
            date_of_birth: Some("1990-04-12".to_string()),
            sex: Some("female".to_string()),
            email: Some(" Aoife@Example.com ".to_string()),
            address: Some("   ".to_string()),
            allergies: None,
            medical_notes: None,
        }
    }

    #[test]
    fn test_complete_request_is_normalized() {
        let patient = validate_new_patient(complete(), today()).unwrap();
        assert_eq!(patient.first_name, "Aoife");
        assert_eq!(patient.email.as_deref(), Some("aoife@example.com"));
        assert_eq!(patient.address, None);
        assert_eq!(patient.sex, Sex::Female);
    }

    #[test]
    fn test_each_required_field() {
        let cases: [(&str, fn(&mut CreatePatientRequest)); 5] = [
            ("first_name", |r| r.first_name = None),
            ("last_name", |r| r.last_name = Some("  ".to_string())),
            ("phone", |r| r.phone = None),
            ("date_of_birth", |r| r.date_of_birth = Some(String::new())),
            ("sex", |r| r.sex = None),
        ];

        for (field, clear) in cases {
            let mut request = complete();
            clear(&mut request);
            assert_matches!(
                validate_new_patient(request, today()),
                Err(PatientError::ValidationError(msg)) if msg == format!("{} is required", field)
            );
        }
    }

    #[test]
    fn test_future_date_of_birth() {
        let mut request = complete();
        request.date_of_birth = Some("2024-03-02".to_string());
        assert_matches!(validate_new_patient(request, today()), Err(PatientError::InvalidDateOfBirth(_)));

        assert!(parse_date_of_birth("2024-03-01", today()).is_ok());
        assert_matches!(parse_date_of_birth("12/04/1990", today()), Err(PatientError::InvalidDateOfBirth(_)));
    }

    #[test]
    fn test_invalid_email_and_phone() {
        let mut request = complete();
        request.email = Some("aoife@".to_string());
        assert_matches!(validate_new_patient(request, today()), Err(PatientError::ValidationError(_)));

        let mut request = complete();
        request.phone = Some("call me".to_string());
        assert_matches!(validate_new_patient(request, today()), Err(PatientError::ValidationError(_)));
    }

    #[test]
    fn test_single_primary_specialty() {
        let input = |code: &str, is_primary| PatientSpecialtyInput { code: code.to_string(), is_primary };

        assert!(check_primary_specialties(&[input("endodontics", true), input("radiology", false)]).is_ok());
        assert!(check_primary_specialties(&[]).is_ok());
        assert_matches!(
            check_primary_specialties(&[input("endodontics", true), input("radiology", true)]),
            Err(PatientError::MultiplePrimarySpecialties)
        );
    }
}
