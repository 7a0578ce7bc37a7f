//! Job parameters: the typed values that, together with the job name, identify a
//! [`JobInstance`](super::execution::JobInstance).

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the parameter injected by [`RunIdIncrementer`].
pub const RUN_ID_KEY: &str = "run.id";

/// A single typed job parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobParameter {
    String(String),
    Long(i64),
    Double(f64),
    Date(DateTime<Utc>),
}

impl fmt::Display for JobParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobParameter::String(value) => write!(f, "{}", value),
            JobParameter::Long(value) => write!(f, "{}", value),
            JobParameter::Double(value) => write!(f, "{}", value),
            JobParameter::Date(value) => write!(f, "{}", value.to_rfc3339()),
        }
    }
}

/// Immutable set of job parameters, ordered by name.
///
/// Two sets are equal when they hold the same names with the same typed values,
/// which is what makes two launches resolve to the same job instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobParameters {
    parameters: BTreeMap<String, JobParameter>,
}

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&JobParameter> {
        self.parameters.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.parameters.get(key) {
            Some(JobParameter::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or(default).to_string()
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.parameters.get(key) {
            Some(JobParameter::Long(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_long_or(&self, key: &str, default: i64) -> i64 {
        self.get_long(key).unwrap_or(default)
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        match self.parameters.get(key) {
            Some(JobParameter::Double(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_date(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.parameters.get(key) {
            Some(JobParameter::Date(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.parameters.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JobParameter)> {
        self.parameters.iter()
    }

    /// Returns a new set holding `self` overlaid with every parameter of `other`.
    pub fn merge(&self, other: &JobParameters) -> JobParameters {
        let mut parameters = self.parameters.clone();
        for (key, value) in &other.parameters {
            parameters.insert(key.clone(), value.clone());
        }
        JobParameters { parameters }
    }
}

impl fmt::Display for JobParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (index, (key, value)) in self.parameters.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        write!(f, "}}")
    }
}

/// Builder for `JobParameters`.
///
/// # Example
///
/// ```
/// use batch_core::core::parameters::JobParametersBuilder;
///
/// let parameters = JobParametersBuilder::new()
///     .add_string("input", "persons.csv")
///     .add_long("chunkSize", 10)
///     .build();
///
/// assert_eq!(parameters.get_long("chunkSize"), Some(10));
/// assert_eq!(parameters.get_string("input"), Some("persons.csv"));
/// ```
#[derive(Default)]
pub struct JobParametersBuilder {
    parameters: BTreeMap<String, JobParameter>,
}

impl JobParametersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_string(mut self, key: &str, value: &str) -> Self {
        self.parameters
            .insert(key.to_string(), JobParameter::String(value.to_string()));
        self
    }

    pub fn add_long(mut self, key: &str, value: i64) -> Self {
        self.parameters
            .insert(key.to_string(), JobParameter::Long(value));
        self
    }

    pub fn add_double(mut self, key: &str, value: f64) -> Self {
        self.parameters
            .insert(key.to_string(), JobParameter::Double(value));
        self
    }

    pub fn add_date(mut self, key: &str, value: DateTime<Utc>) -> Self {
        self.parameters
            .insert(key.to_string(), JobParameter::Date(value));
        self
    }

    pub fn build(self) -> JobParameters {
        JobParameters {
            parameters: self.parameters,
        }
    }
}

/// Derives the parameters of the next run of a job from those of its previous run.
///
/// The returned parameters are layered under the ones supplied to the launch, so an
/// incrementer only returns the keys it owns.
pub trait JobParametersIncrementer {
    /// `previous` is empty when the job never ran.
    fn get_next(&self, previous: &JobParameters) -> JobParameters;
}

/// Increments a long `run.id` parameter, starting at 1.
///
/// Only the incremented key is returned: other parameters of the previous run are
/// not carried over.
///
/// # Example
///
/// ```
/// use batch_core::core::parameters::{JobParameters, JobParametersIncrementer, RunIdIncrementer};
///
/// let incrementer = RunIdIncrementer::default();
///
/// let first = incrementer.get_next(&JobParameters::new());
/// let second = incrementer.get_next(&first);
///
/// assert_eq!(first.get_long("run.id"), Some(1));
/// assert_eq!(second.get_long("run.id"), Some(2));
/// ```
pub struct RunIdIncrementer {
    key: String,
}

impl Default for RunIdIncrementer {
    fn default() -> Self {
        Self {
            key: RUN_ID_KEY.to_string(),
        }
    }
}

impl RunIdIncrementer {
    /// Uses `key` instead of `run.id`.
    pub fn with_key(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

impl JobParametersIncrementer for RunIdIncrementer {
    fn get_next(&self, previous: &JobParameters) -> JobParameters {
        let next_id = match previous.get(&self.key) {
            Some(JobParameter::Long(id)) => id + 1,
            Some(JobParameter::String(id)) => id.parse::<i64>().map(|id| id + 1).unwrap_or(1),
            _ => 1,
        };

        JobParametersBuilder::new().add_long(&self.key, next_id).build()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{JobParameter, JobParametersBuilder, JobParametersIncrementer, RunIdIncrementer};

    #[test]
    fn parameters_with_same_values_are_equal_whatever_the_insertion_order() {
        let first = JobParametersBuilder::new()
            .add_string("name", "persons")
            .add_long("chunkSize", 10)
            .build();
        let second = JobParametersBuilder::new()
            .add_long("chunkSize", 10)
            .add_string("name", "persons")
            .build();

        assert_eq!(first, second);
        assert_eq!(first.to_string(), "{chunkSize=10, name=persons}");
    }

    #[test]
    fn parameter_type_is_part_of_its_identity() {
        let long = JobParametersBuilder::new().add_long("chunkSize", 10).build();
        let string = JobParametersBuilder::new()
            .add_string("chunkSize", "10")
            .build();

        assert_ne!(long, string);
        assert_eq!(long.get_string("chunkSize"), None);
        assert_eq!(string.get_long("chunkSize"), None);
    }

    #[test]
    fn typed_getters_return_defaults_when_absent() {
        let date = Utc.with_ymd_and_hms(2024, 1, 31, 8, 0, 0).unwrap();
        let parameters = JobParametersBuilder::new()
            .add_double("ratio", 0.5)
            .add_date("day", date)
            .build();

        assert_eq!(parameters.get_double("ratio"), Some(0.5));
        assert_eq!(parameters.get_date("day"), Some(date));
        assert_eq!(parameters.get_long_or("chunkSize", 10), 10);
        assert_eq!(parameters.get_string_or("input", "none"), "none");
    }

    #[test]
    fn merge_overrides_existing_values() {
        let base = JobParametersBuilder::new()
            .add_long("run.id", 3)
            .add_string("input", "a.csv")
            .build();
        let other = JobParametersBuilder::new().add_long("run.id", 4).build();

        let merged = base.merge(&other);

        assert_eq!(merged.get_long("run.id"), Some(4));
        assert_eq!(merged.get_string("input"), Some("a.csv"));
    }

    #[test]
    fn run_id_incrementer_handles_string_and_custom_keys() {
        let previous = JobParametersBuilder::new()
            .add_string("run.id", "41")
            .add_long("chunkSize", 5)
            .build();
        let next = RunIdIncrementer::default().get_next(&previous);
        assert_eq!(next.get("run.id"), Some(&JobParameter::Long(42)));
        assert_eq!(next.len(), 1);

        let custom = RunIdIncrementer::with_key("attempt").get_next(&next);
        assert_eq!(custom.get_long("attempt"), Some(1));
        assert_eq!(custom.get_long("run.id"), None);
    }
}
