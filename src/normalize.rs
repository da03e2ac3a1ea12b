use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::models::job::JobRecord;
use crate::salary::{self, SalaryRange};

/// Source label used when the item names no publisher.
pub const DEFAULT_SOURCE: &str = "jsearch";

#[derive(Debug, Clone, Copy)]
enum Lookup {
    /// Top-level key.
    Key(&'static str),
    /// `child` inside `parent`. Applies only when `parent` is an object, and
    /// then later rules are not consulted.
    Nested {
        parent: &'static str,
        child: &'static str,
    },
}

use Lookup::{Key, Nested};

const JOB_ID: &[Lookup] = &[Key("job_id"), Key("id")];
const TITLE: &[Lookup] = &[Key("job_title"), Key("title")];
const COMPANY: &[Lookup] = &[Key("employer_name"), Key("company_name")];
const LOCATION: &[Lookup] = &[
    Key("job_city"),
    Key("job_state"),
    Key("job_country"),
    Key("location"),
];
const SOURCE: &[Lookup] = &[Key("job_publisher"), Key("source")];
const POSTED_DATE: &[Lookup] = &[Key("job_posted_at_datetime_utc"), Key("date_posted")];
const EMPLOYMENT_TYPE: &[Lookup] = &[Key("job_employment_type")];
const EXPERIENCE_LEVEL: &[Lookup] = &[
    Nested {
        parent: "job_required_experience",
        child: "experience_level",
    },
    Key("experience_level"),
];
const SKILLS: &[Lookup] = &[Key("job_required_skills"), Key("skills")];
const DESCRIPTION: &[Lookup] = &[Key("job_description"), Key("description")];
const URL: &[Lookup] = &[Key("job_apply_link"), Key("job_url"), Key("url")];

const SALARY_MIN: &[Lookup] = &[Key("job_min_salary"), Key("min_salary")];
const SALARY_MAX: &[Lookup] = &[Key("job_max_salary"), Key("max_salary")];
const SALARY_CURRENCY: &[Lookup] = &[Key("job_salary_currency"), Key("salary_currency")];
const SALARY_TEXT: &[Lookup] = &[Key("job_salary"), Key("salary"), Key("salary_string")];

/// Normalize a raw item, stamping `scraped_at` with the current time.
pub fn normalize(raw: &Value) -> JobRecord {
    normalize_at(raw, Utc::now())
}

/// Normalize a raw item with an explicit `scraped_at` timestamp.
///
/// `role_query` and `country_query` are left empty for the caller to fill.
pub fn normalize_at(raw: &Value, scraped_at: DateTime<Utc>) -> JobRecord {
    let title = resolve_text(raw, TITLE);
    let description = resolve_text(raw, DESCRIPTION);
    let salary = resolve_salary(raw, description.as_deref(), title.as_deref());

    JobRecord {
        job_id: resolve_text(raw, JOB_ID),
        company: resolve_text(raw, COMPANY),
        location: resolve_text(raw, LOCATION),
        source: resolve_text(raw, SOURCE).or_else(|| Some(DEFAULT_SOURCE.to_string())),
        posted_date: resolve_text(raw, POSTED_DATE),
        employment_type: resolve_text(raw, EMPLOYMENT_TYPE),
        experience_level: resolve_text(raw, EXPERIENCE_LEVEL),
        salary_min: salary.min,
        salary_max: salary.max,
        salary_currency: salary.currency,
        skills_raw: resolve_text(raw, SKILLS),
        url: resolve_text(raw, URL),
        scraped_at: Some(scraped_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        role_query: None,
        country_query: None,
        title,
        description,
    }
}

/// Structured salary fields first; free text only when all three are absent.
fn resolve_salary(raw: &Value, description: Option<&str>, title: Option<&str>) -> SalaryRange {
    let structured = SalaryRange {
        min: resolve_number(raw, SALARY_MIN),
        max: resolve_number(raw, SALARY_MAX),
        currency: resolve_text(raw, SALARY_CURRENCY),
    };
    if !structured.is_empty() {
        return structured;
    }

    let salary_text = resolve_text(raw, SALARY_TEXT);
    let source = salary_text.as_deref().or(description).or(title);
    salary::parse(source)
}

fn resolve<T>(raw: &Value, rules: &[Lookup], convert: fn(&Value) -> Option<T>) -> Option<T> {
    for rule in rules {
        match *rule {
            Key(key) => {
                if let Some(value) = raw.get(key).and_then(convert) {
                    return Some(value);
                }
            }
            // An object parent settles the field, even when the child is missing
            Nested { parent, child } => {
                if let Some(obj) = raw.get(parent).filter(|v| v.is_object()) {
                    return obj.get(child).and_then(convert);
                }
            }
        }
    }
    None
}

fn resolve_text(raw: &Value, rules: &[Lookup]) -> Option<String> {
    resolve(raw, rules, as_text)
}

fn resolve_number(raw: &Value, rules: &[Lookup]) -> Option<f64> {
    resolve(raw, rules, as_number)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(as_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Object(map) if map.is_empty() => None,
        Value::Object(_) => Some(value.to_string()),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    };
    n.filter(|v: &f64| v.is_finite())
}
