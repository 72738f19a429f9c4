//! The learner an incentive is paid for.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether the employer pays the apprenticeship levy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmployerType {
    /// Levy-paying employer
    Levy,
    /// Non-levy employer
    NonLevy,
}

/// Apprenticeship details owned by an incentive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apprenticeship {
    /// Apprenticeship id in the commitments system
    pub id: i64,
    /// Learner first name
    pub first_name: String,
    /// Learner last name
    pub last_name: String,
    /// Learner date of birth
    pub date_of_birth: NaiveDate,
    /// Unique learner number
    pub unique_learner_number: i64,
    /// Levy status of the employer
    pub employer_type: EmployerType,
    /// Course the learner is enrolled on
    pub course_name: String,
}

impl Apprenticeship {
    /// Creates an apprenticeship with an empty course name.
    #[must_use]
    pub fn new(
        id: i64,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        date_of_birth: NaiveDate,
        unique_learner_number: i64,
        employer_type: EmployerType,
    ) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth,
            unique_learner_number,
            employer_type,
            course_name: String::new(),
        }
    }

    /// Sets the course name.
    #[must_use]
    pub fn with_course(mut self, course_name: impl Into<String>) -> Self {
        self.course_name = course_name.into();
        self
    }
}
