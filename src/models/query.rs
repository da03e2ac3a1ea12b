use crate::collectors::PageQuery;

/// One (role, location, country) combination driving a run of paginated
/// fetches. `role` and `country_code` are stamped onto every record the
/// combination produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    pub role: String,
    pub location: String,
    pub country_code: String,
}

impl Combination {
    pub fn new(role: &str, location: &str, country_code: &str) -> Self {
        Self {
            role: role.to_string(),
            location: location.to_string(),
            country_code: country_code.to_string(),
        }
    }

    pub fn page(&self, page: u32) -> PageQuery {
        PageQuery {
            role: self.role.clone(),
            location: self.location.clone(),
            country_code: self.country_code.clone(),
            page,
        }
    }
}

pub const ROLES: &[&str] = &[
    "Data Analyst",
    "Business Analyst",
    "Data Scientist",
    "Machine Learning Engineer",
    "Data Engineer",
    "Data Architect",
    "Analytics Engineer",
    "BI Analyst",
    "Statistician",
    "AI Engineer",
    "Python Developer",
    "Backend Developer",
];

/// (location text, country code)
pub const LOCATIONS: &[(&str, &str)] = &[
    ("India", "in"),
    ("Bengaluru", "in"),
    ("Hyderabad", "in"),
    ("United States", "us"),
];

/// Cross product of roles and locations, role-major.
pub fn combinations(roles: &[&str], locations: &[(&str, &str)]) -> Vec<Combination> {
    roles
        .iter()
        .flat_map(|role| {
            locations
                .iter()
                .map(move |(location, country)| Combination::new(role, location, country))
        })
        .collect()
}

pub fn default_combinations() -> Vec<Combination> {
    combinations(ROLES, LOCATIONS)
}
