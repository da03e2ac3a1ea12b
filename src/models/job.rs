use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One normalized job listing, one row of the checkpoint table.
///
/// Field order is the column order of the table. Adding, removing or
/// reordering fields changes the on-disk schema, so `FIELDS` must be kept
/// in sync with the struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRecord {
    pub job_id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub source: Option<String>,
    pub posted_date: Option<String>,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub salary_min: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub skills_raw: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub scraped_at: Option<String>,
    pub role_query: Option<String>,
    pub country_query: Option<String>,
}

impl JobRecord {
    /// Column names in table order.
    pub const FIELDS: [&'static str; 17] = [
        "job_id",
        "title",
        "company",
        "location",
        "source",
        "posted_date",
        "employment_type",
        "experience_level",
        "salary_min",
        "salary_max",
        "salary_currency",
        "skills_raw",
        "description",
        "url",
        "scraped_at",
        "role_query",
        "country_query",
    ];

    /// Deduplication key: job_id, else url, else a hash of title, company
    /// and location.
    pub fn identity(&self) -> String {
        non_empty(&self.job_id)
            .or_else(|| non_empty(&self.url))
            .map(String::from)
            .unwrap_or_else(|| self.content_hash())
    }

    /// Like `identity`, but writes the hashed fallback into `job_id` so the
    /// same key is rebuilt when the table is loaded again.
    pub fn assign_identity(&mut self) -> String {
        let id = self.identity();
        if non_empty(&self.job_id).is_none() && non_empty(&self.url).is_none() {
            self.job_id = Some(id.clone());
        }
        id
    }

    fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_deref().unwrap_or("").as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.company.as_deref().unwrap_or("").as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.location.as_deref().unwrap_or("").as_bytes());
        hex::encode(&hasher.finalize()[..8])
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
