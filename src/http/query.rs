use std::ops::RangeInclusive;

use rand::distributions::Distribution;
use rand::{Rng, thread_rng};
use rand_regex::Regex as RandRegex;

use crate::error::ValidationError;

/// Common surname followed by one or two given-name characters.
pub const DEFAULT_QUERY_PATTERN: &str = "[王李张刘陈杨黄赵吴周徐孙马朱胡郭何林罗高][伟芳娜秀英敏静丽强磊军洋勇艳杰娟涛明超兰霞平刚桂]{1,2}";

const QUERY_KEY: &str = "q";
const LOAD_MORE_KEY: &str = "loadMore";
const LOAD_MORE_RANGE: RangeInclusive<u8> = 1..=5;
/// Upper bound for unbounded repetitions (`*`, `+`) in query patterns.
const MAX_REPEAT: u32 = 16;

/// Randomized query parameters for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub name: String,
    pub load_more: u8,
}

impl QueryParams {
    #[must_use]
    pub fn pairs(&self) -> [(&'static str, String); 2] {
        [
            (QUERY_KEY, self.name.clone()),
            (LOAD_MORE_KEY, self.load_more.to_string()),
        ]
    }
}

/// Produces a fresh [`QueryParams`] per request from a random-text pattern.
#[derive(Debug, Clone)]
pub struct QueryGenerator {
    pattern: String,
    regex: RandRegex,
}

impl QueryGenerator {
    /// Compiles `pattern` into a generator.
    ///
    /// # Errors
    ///
    /// Returns an error when the pattern is not a valid generation regex.
    pub fn new(pattern: &str) -> Result<Self, ValidationError> {
        let regex = RandRegex::compile(pattern, MAX_REPEAT).map_err(|err| {
            ValidationError::InvalidQueryPattern {
                pattern: pattern.to_owned(),
                source: err,
            }
        })?;
        Ok(Self {
            pattern: pattern.to_owned(),
            regex,
        })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn generate(&self) -> QueryParams {
        let mut rng = thread_rng();
        let name: String = self.regex.sample(&mut rng);
        let load_more = rng.gen_range(LOAD_MORE_RANGE);
        QueryParams { name, load_more }
    }
}
