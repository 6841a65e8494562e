use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::{encode, SupabaseClient};
use shared_models::specialty::SpecialtyCode;
use shared_utils::validation::search_term;

use crate::models::{ClinicalError, ClinicalTerm, TermQuery};

pub const DEFAULT_TERM_LIMIT: i64 = 25;
pub const MAX_TERM_LIMIT: i64 = 100;

/// Read-only clinical dictionary shared by every clinic.
pub struct TermService {
    supabase: SupabaseClient,
}

impl TermService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn search_terms(&self, query: TermQuery, auth_token: &str) -> Result<Vec<ClinicalTerm>, ClinicalError> {
        debug!("Searching clinical terms: {:?}", query);

        let mut query_parts = Vec::new();
        if let Some(code) = query.specialty.as_deref() {
            let specialty: SpecialtyCode = code.parse().map_err(ClinicalError::ValidationError)?;
            query_parts.push(format!("specialty=eq.{}", specialty));
        }
        if let Some(term) = query.q.as_deref().map(search_term).filter(|t| !t.is_empty()) {
            let term = encode(&term);
            query_parts.push(format!("or=(label.ilike.*{}*,code.ilike.*{}*)", term, term));
        }

        let limit = query.limit.unwrap_or(DEFAULT_TERM_LIMIT).clamp(1, MAX_TERM_LIMIT);
        query_parts.push(format!("order=label.asc&limit={}", limit));

        Ok(self.supabase.select("clinical_terms", &query_parts.join("&"), auth_token).await?)
    }
}
