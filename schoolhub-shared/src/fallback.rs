/// Fallback data used while the backend is unreachable
///
/// Each generator is a pure function of `(seed, count)`: the same seed and
/// count always give the same rows. Students and staff draw from separate
/// streams, so asking for more staff never changes the students.
///
/// # Defaults
///
/// - 283 students, grade "1".."10", section A-E,
///   status Active 0.85 / Inactive 0.10 / Graduated 0.05
/// - 15 staff, status Active 0.90 / Inactive 0.05 / On Leave 0.05
/// - 3 fixed user accounts (Admin, Teacher, Staff)
///
/// # Example
///
/// ```
/// use schoolhub_shared::fallback::{FallbackGenerator, StatusWeights};
///
/// # fn example() -> Result<(), schoolhub_shared::DataError> {
/// let generator = FallbackGenerator::new(42, StatusWeights::default())?;
/// assert_eq!(generator.students(10), generator.students(10));
/// # Ok(())
/// # }
/// ```

use crate::error::{DataError, DataResult};
use crate::models::staff::{Staff, StaffStatus};
use crate::models::student::{Student, StudentStatus};
use crate::models::user::{User, UserRole};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub const DEFAULT_STUDENT_COUNT: usize = 283;
pub const DEFAULT_STAFF_COUNT: usize = 15;

const STUDENT_STREAM: u64 = 0x5354_5544;
const STAFF_STREAM: u64 = 0x5354_4146;

const STUDENT_FIRST_NAMES: &[&str] = &[
    "Sarah", "Michael", "Emily", "James", "Olivia", "William", "Ava", "Benjamin", "Sophia",
    "Lucas", "Isabella", "Henry", "Charlotte", "Alexander", "Amelia", "Mason", "Mia", "Ethan",
    "Harper", "Noah", "Evelyn", "Liam", "Abigail", "Oliver", "Elizabeth", "Sebastian", "Sofia",
    "Aiden", "Avery", "Jackson", "Ella", "Logan", "Madison", "Caleb", "Scarlett", "Ryan",
    "Victoria", "Nathan", "Aria", "Owen", "Grace", "Luke", "Chloe", "Gabriel", "Camila", "Isaac",
    "Penelope", "Anthony", "Riley", "Dylan", "Layla", "Wyatt", "Lillian", "Andrew", "Nora",
    "Joshua", "Zoey", "Christopher", "Mila", "Grayson", "Aubrey", "Jack", "Hannah", "Julian",
    "Lily", "Aaron", "Addison", "Eli", "Eleanor", "Landon", "Natalie", "David", "Luna",
    "Jonathan", "Savannah", "Matthew", "Leah", "Adam", "Zoe", "Samuel", "Stella", "Joseph",
    "Hazel", "John", "Ellie", "Carter", "Paisley", "Nicholas", "Audrey", "Isaiah", "Skylar",
    "Charles", "Violet", "Thomas", "Claire", "Bella", "Daniel", "Aurora", "Lucy", "Anna",
];

const STUDENT_LAST_NAMES: &[&str] = &[
    "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez",
    "Clark", "Ramirez", "Lewis", "Robinson", "Walker", "Young", "Allen", "King", "Wright",
    "Scott", "Torres", "Nguyen", "Hill", "Flores", "Green", "Adams", "Nelson", "Baker", "Hall",
    "Rivera", "Campbell", "Mitchell", "Carter", "Roberts", "Gomez", "Phillips", "Evans",
    "Turner", "Diaz", "Parker", "Cruz", "Edwards", "Collins", "Reyes", "Stewart", "Morris",
    "Morales", "Murphy", "Cook", "Rogers", "Gutierrez", "Ortiz", "Morgan", "Cooper", "Peterson",
    "Bailey", "Reed", "Kelly", "Howard", "Ramos", "Kim", "Cox", "Ward", "Richardson", "Watson",
    "Brooks", "Chavez", "Wood", "James", "Bennett", "Gray", "Mendoza", "Ruiz", "Hughes", "Price",
];

const STAFF_FIRST_NAMES: &[&str] = &[
    "John", "Sarah", "Michael", "Emily", "David", "Lisa", "Robert", "Jennifer", "William",
    "Jessica", "James", "Ashley", "Christopher", "Amanda", "Daniel", "Stephanie", "Matthew",
    "Melissa", "Anthony", "Nicole",
];

const STAFF_LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin",
];

pub const STAFF_ROLES: &[&str] = &[
    "Principal",
    "Vice Principal",
    "Teacher",
    "Math Teacher",
    "Science Teacher",
    "English Teacher",
    "History Teacher",
    "Art Teacher",
    "Physical Education Teacher",
    "Music Teacher",
    "Librarian",
    "Guidance Counselor",
    "Nurse",
    "Secretary",
    "Maintenance Staff",
];

pub const DEPARTMENTS: &[&str] = &["Administration", "Academics", "Support", "Maintenance"];

pub const SECTIONS: &[&str] = &["A", "B", "C", "D", "E"];

const STUDENT_STATUSES: [StudentStatus; 3] = [
    StudentStatus::Active,
    StudentStatus::Inactive,
    StudentStatus::Graduated,
];

const STAFF_STATUSES: [StaffStatus; 3] = [
    StaffStatus::Active,
    StaffStatus::Inactive,
    StaffStatus::OnLeave,
];

/// Categorical status weights, in enum declaration order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusWeights {
    /// Active, Inactive, Graduated
    pub students: [f64; 3],

    /// Active, Inactive, On Leave
    pub staff: [f64; 3],
}

impl Default for StatusWeights {
    fn default() -> Self {
        StatusWeights {
            students: [0.85, 0.10, 0.05],
            staff: [0.90, 0.05, 0.05],
        }
    }
}

impl StatusWeights {
    /// Weights must be finite, non-negative and have a positive sum
    pub fn validate(&self) -> DataResult<()> {
        for (name, weights) in [("student", &self.students), ("staff", &self.staff)] {
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(DataError::ValidationFailed(format!(
                    "{} status weights must be non-negative",
                    name
                )));
            }
            if weights.iter().sum::<f64>() <= 0.0 {
                return Err(DataError::ValidationFailed(format!(
                    "{} status weights must have a positive sum",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Seeded generator for fallback rows
#[derive(Debug, Clone)]
pub struct FallbackGenerator {
    seed: u64,
    reproducible: bool,
    weights: StatusWeights,
    student_statuses: WeightedIndex<f64>,
    staff_statuses: WeightedIndex<f64>,
}

impl FallbackGenerator {
    /// Creates a reproducible generator
    pub fn new(seed: u64, weights: StatusWeights) -> DataResult<Self> {
        weights.validate()?;
        Ok(FallbackGenerator {
            seed,
            reproducible: true,
            weights,
            student_statuses: weighted(&weights.students)?,
            staff_statuses: weighted(&weights.staff)?,
        })
    }

    /// Creates a generator seeded from entropy
    ///
    /// Output is flagged as non-reproducible.
    pub fn from_entropy(weights: StatusWeights) -> DataResult<Self> {
        let mut generator = Self::new(rand::random(), weights)?;
        generator.reproducible = false;
        Ok(generator)
    }

    /// Uses `seed` when given, entropy otherwise
    pub fn from_seed(seed: Option<u64>, weights: StatusWeights) -> DataResult<Self> {
        match seed {
            Some(seed) => Self::new(seed, weights),
            None => Self::from_entropy(weights),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// False when the seed was drawn from entropy
    pub fn is_reproducible(&self) -> bool {
        self.reproducible
    }

    pub fn weights(&self) -> &StatusWeights {
        &self.weights
    }

    fn rng(&self, stream: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ stream)
    }

    /// `count` students with ids `1..=count`
    pub fn students(&self, count: usize) -> Vec<Student> {
        let mut rng = self.rng(STUDENT_STREAM);
        let enrolled = date(2023, 9, 1);
        let stamp = midnight(enrolled);

        (1..=count as i64)
            .map(|id| {
                let first = pick(&mut rng, STUDENT_FIRST_NAMES);
                let last = pick(&mut rng, STUDENT_LAST_NAMES);
                let grade: u8 = rng.gen_range(1..=10);
                let section = pick(&mut rng, SECTIONS);
                let status = STUDENT_STATUSES[self.student_statuses.sample(&mut rng)];

                Student {
                    id,
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    email: school_email(first, last),
                    grade: grade.to_string(),
                    section: section.to_string(),
                    status,
                    enrollment_date: enrolled,
                    avatar_url: None,
                    created_at: stamp,
                    updated_at: stamp,
                }
            })
            .collect()
    }

    /// `count` staff members with ids `1..=count`
    pub fn staff(&self, count: usize) -> Vec<Staff> {
        let mut rng = self.rng(STAFF_STREAM);
        let hired = date(2020, 8, 15);
        let stamp = midnight(hired);

        (1..=count as i64)
            .map(|id| {
                let first = pick(&mut rng, STAFF_FIRST_NAMES);
                let last = pick(&mut rng, STAFF_LAST_NAMES);
                let role = pick(&mut rng, STAFF_ROLES);
                let department = pick(&mut rng, DEPARTMENTS);
                let status = STAFF_STATUSES[self.staff_statuses.sample(&mut rng)];
                let phone: u16 = rng.gen_range(1000..=9999);

                Staff {
                    id,
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    email: school_email(first, last),
                    role: role.to_string(),
                    department: department.to_string(),
                    phone: Some(format!("555-{}", phone)),
                    hire_date: hired,
                    status,
                    avatar_url: None,
                    created_at: stamp,
                    updated_at: stamp,
                }
            })
            .collect()
    }

    /// The three fixed dashboard accounts
    pub fn users(&self) -> Vec<User> {
        let stamp = midnight(date(2024, 1, 1));
        [
            ("1", "john.smith@jollychildren.edu", "John Smith", UserRole::Admin),
            ("2", "sarah.johnson@jollychildren.edu", "Sarah Johnson", UserRole::Teacher),
            ("3", "michael.brown@jollychildren.edu", "Michael Brown", UserRole::Staff),
        ]
        .into_iter()
        .map(|(id, email, name, role)| User {
            id: id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            avatar_url: None,
            created_at: stamp,
            updated_at: stamp,
        })
        .collect()
    }
}

fn weighted(weights: &[f64; 3]) -> DataResult<WeightedIndex<f64>> {
    WeightedIndex::new(weights.iter().copied())
        .map_err(|e| DataError::ValidationFailed(format!("invalid status weights: {}", e)))
}

fn pick<'a>(rng: &mut StdRng, values: &[&'a str]) -> &'a str {
    values.choose(rng).copied().unwrap_or_default()
}

fn school_email(first: &str, last: &str) -> String {
    format!("{}.{}@school.edu", first.to_lowercase(), last.to_lowercase())
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(seed: u64) -> FallbackGenerator {
        FallbackGenerator::new(seed, StatusWeights::default()).unwrap()
    }

    #[test]
    fn test_students_stay_in_domain() {
        let students = generator(7).students(DEFAULT_STUDENT_COUNT);
        assert_eq!(students.len(), 283);

        for (index, student) in students.iter().enumerate() {
            assert_eq!(student.id, index as i64 + 1);
            let grade: u8 = student.grade.parse().unwrap();
            assert!((1..=10).contains(&grade));
            assert!(SECTIONS.contains(&student.section.as_str()));
            assert_eq!(
                student.email,
                format!(
                    "{}.{}@school.edu",
                    student.first_name.to_lowercase(),
                    student.last_name.to_lowercase()
                )
            );
            assert_eq!(student.enrollment_date, date(2023, 9, 1));
        }
    }

    #[test]
    fn test_same_seed_same_rows() {
        assert_eq!(generator(11).students(50), generator(11).students(50));
        assert_eq!(generator(11).staff(15), generator(11).staff(15));
        assert_ne!(generator(11).students(50), generator(12).students(50));
    }

    #[test]
    fn test_prefix_is_stable() {
        let short = generator(3).students(10);
        let long = generator(3).students(100);
        assert_eq!(short[..], long[..10]);
    }

    #[test]
    fn test_staff_fields() {
        for member in generator(5).staff(DEFAULT_STAFF_COUNT) {
            assert!(STAFF_ROLES.contains(&member.role.as_str()));
            assert!(DEPARTMENTS.contains(&member.department.as_str()));
            let phone = member.phone.unwrap();
            let digits: u32 = phone.strip_prefix("555-").unwrap().parse().unwrap();
            assert!((1000..=9999).contains(&digits));
            assert_eq!(member.hire_date, date(2020, 8, 15));
        }
    }

    #[test]
    fn test_zero_weight_status_never_drawn() {
        let weights = StatusWeights {
            students: [1.0, 0.0, 0.0],
            ..StatusWeights::default()
        };
        let generator = FallbackGenerator::new(9, weights).unwrap();
        assert!(generator
            .students(200)
            .iter()
            .all(|s| s.status == StudentStatus::Active));
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let negative = StatusWeights {
            staff: [1.0, -0.5, 0.0],
            ..StatusWeights::default()
        };
        assert!(matches!(
            FallbackGenerator::new(1, negative),
            Err(DataError::ValidationFailed(_))
        ));

        let zero = StatusWeights {
            students: [0.0, 0.0, 0.0],
            ..StatusWeights::default()
        };
        assert!(FallbackGenerator::new(1, zero).is_err());
    }

    #[test]
    fn test_entropy_generator_is_flagged() {
        let generator = FallbackGenerator::from_entropy(StatusWeights::default()).unwrap();
        assert!(!generator.is_reproducible());
        assert!(FallbackGenerator::from_seed(Some(4), StatusWeights::default())
            .unwrap()
            .is_reproducible());
    }

    #[test]
    fn test_fixed_users() {
        let users = generator(0).users();
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].role, UserRole::Admin);
        assert_eq!(users[1].email, "sarah.johnson@jollychildren.edu");
        assert_eq!(users[2].role, UserRole::Staff);
    }
}
