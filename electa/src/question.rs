use indexmap::IndexMap;

/// A question on the ballot
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Question {
    pub short_name: String,
    pub question: String,
    pub answers: Vec<String>,

    /// Minimum number of answers a voter must select
    #[serde(default)]
    pub min: usize,

    /// Maximum number of answers a voter may select. `None` means every answer.
    #[serde(default)]
    pub max: Option<usize>,

    #[serde(default)]
    pub choice_type: ChoiceType,

    #[serde(default)]
    pub tally_type: TallyType,

    #[serde(default)]
    pub result_type: ResultType,

    /// Application specific properties.
    ///
    /// Hashmaps are not allowed because their unstable ordering leads to non-determinism.
    #[serde(default)]
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceType {
    Approval,
}

impl Default for ChoiceType {
    fn default() -> Self {
        ChoiceType::Approval
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TallyType {
    Homomorphic,
}

impl Default for TallyType {
    fn default() -> Self {
        TallyType::Homomorphic
    }
}

/// How the result is presented: raw counts, or relative to the number of ballots
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    Absolute,
    Relative,
}

impl Default for ResultType {
    fn default() -> Self {
        ResultType::Absolute
    }
}

impl Question {
    /// Approval question with default bounds
    pub fn new(short_name: &str, question: &str, answers: &[&str]) -> Self {
        Question {
            short_name: short_name.to_string(),
            question: question.to_string(),
            answers: answers.iter().map(|a| a.to_string()).collect(),
            min: 0,
            max: None,
            choice_type: ChoiceType::default(),
            tally_type: TallyType::default(),
            result_type: ResultType::default(),
            properties: IndexMap::new(),
        }
    }

    pub fn with_bounds(mut self, min: usize, max: Option<usize>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn num_answers(&self) -> usize {
        self.answers.len()
    }

    pub fn max_selections(&self) -> usize {
        self.max.unwrap_or_else(|| self.answers.len())
    }

    /// Structural problems that would make the question unanswerable
    pub fn validate(&self) -> Result<(), String> {
        if self.answers.is_empty() {
            return Err("question has no answers".to_string());
        }
        let max = self.max_selections();
        if max > self.answers.len() {
            return Err(format!(
                "max selections {} exceeds the {} available answers",
                max,
                self.answers.len()
            ));
        }
        if self.min > max {
            return Err(format!(
                "min selections {} is greater than max selections {}",
                self.min, max
            ));
        }
        Ok(())
    }
}
