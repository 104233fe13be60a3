//! Record and cell types shared by every exporter

use std::fmt;

/// Number of columns in an applicant record
pub const COLUMN_COUNT: usize = 13;

/// Column labels, in the order every exporter writes them
pub const HEADERS: [&str; COLUMN_COUNT] = [
    "Name*",
    "Email*",
    "Current Step*",
    "WhatsApp Number",
    "Years of Experience",
    "Past Role",
    "Past Company",
    "Campus",
    "Min. Salary",
    "Current Location",
    "Resume Link",
    "Portfolio Link",
    "Candidate Source",
];

/// One flat applicant record. All fields are text, including the numeric ones.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Applicant {
    pub name: String,
    pub email: String,
    pub current_step: String,
    pub whatsapp_number: String,
    pub experience: String,
    pub past_role: String,
    pub past_company: String,
    pub campus: String,
    pub min_salary: String,
    pub current_location: String,
    pub resume_link: String,
    pub portfolio_link: String,
    pub candidate_source: String,
}

impl Applicant {
    /// Field values in header order
    pub fn fields(&self) -> [&str; COLUMN_COUNT] {
        [
            self.name.as_str(),
            self.email.as_str(),
            self.current_step.as_str(),
            self.whatsapp_number.as_str(),
            self.experience.as_str(),
            self.past_role.as_str(),
            self.past_company.as_str(),
            self.campus.as_str(),
            self.min_salary.as_str(),
            self.current_location.as_str(),
            self.resume_link.as_str(),
            self.portfolio_link.as_str(),
            self.candidate_source.as_str(),
        ]
    }
}

/// Ordered, read-only sequence of records shared by all exporters
pub type Dataset = [Applicant];

/// A single cell value in a streamed worksheet row
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell
    Empty,
    /// String value, written as an inline string
    String(String),
}

impl CellValue {
    /// Convert cell value to string
    pub fn as_str(&self) -> &str {
        match self {
            CellValue::Empty => "",
            CellValue::String(s) => s,
        }
    }

    /// Check if cell is empty
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_follow_header_order() {
        let a = Applicant {
            name: "n".into(),
            email: "e".into(),
            candidate_source: "src".into(),
            ..Default::default()
        };
        let fields = a.fields();
        assert_eq!(fields.len(), HEADERS.len());
        assert_eq!(fields[0], "n");
        assert_eq!(fields[1], "e");
        assert_eq!(fields[12], "src");
    }

    #[test]
    fn test_cell_value_conversions() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::from("").is_empty());
        assert_eq!(CellValue::from("x").to_string(), "x");
    }
}
