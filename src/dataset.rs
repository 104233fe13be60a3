//! Synthetic applicant generation

use crate::types::Applicant;

/// Build `n` placeholder applicants. Only name and email vary per record.
pub fn generate_applicants(n: usize) -> Vec<Applicant> {
    (0..n)
        .map(|i| Applicant {
            name: format!("Applicant {}", i),
            email: format!("applicant{}@example.com", i),
            current_step: "HR Interview".to_string(),
            whatsapp_number: "6281234567890".to_string(),
            experience: "Junior (1-3 YoE)".to_string(),
            past_role: "Software Engineer".to_string(),
            past_company: "TechCorp".to_string(),
            campus: "University of Example".to_string(),
            min_salary: "Rp.10,000,000".to_string(),
            current_location: "Jakarta".to_string(),
            resume_link: "https://example.com/resume".to_string(),
            portfolio_link: "https://linkedin.com/in/example".to_string(),
            candidate_source: "Website".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_applicants() {
        let data = generate_applicants(3);
        assert_eq!(data.len(), 3);
        assert_eq!(data[0].name, "Applicant 0");
        assert_eq!(data[2].email, "applicant2@example.com");
        // salary carries a comma, so it exercises CSV quoting
        assert!(data[1].min_salary.contains(','));
    }

    #[test]
    fn test_generate_empty() {
        assert!(generate_applicants(0).is_empty());
    }
}
