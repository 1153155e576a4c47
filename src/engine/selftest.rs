use std::fmt;

use tracing::debug;

use super::error::EngineError;
use super::substation::Substation;
use crate::config::TestConfig;
use crate::message::Message;
use crate::transform::{apply, apply_all};

/// Result of one configuration self-test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
    /// The configuration declares no tests
    NoTests,
}

/// One line of self-test output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    pub file: String,
    pub name: String,
    pub outcome: TestOutcome,
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            TestOutcome::Passed => write!(f, "ok\t{}\t{}", self.file, self.name),
            TestOutcome::Failed => write!(f, "FAIL\t{}\t{}", self.file, self.name),
            TestOutcome::NoTests => write!(f, "?\t{}\t[no tests]", self.file),
        }
    }
}

impl Substation {
    /// Run every test declared in the configuration
    ///
    /// `file` only labels the reports.
    pub async fn self_test(&self, file: &str) -> Result<Vec<TestReport>, EngineError> {
        if self.config().tests.is_empty() {
            return Ok(vec![TestReport {
                file: file.to_string(),
                name: String::new(),
                outcome: TestOutcome::NoTests,
            }]);
        }

        let mut reports = Vec::with_capacity(self.config().tests.len());
        for test in &self.config().tests {
            let passed = self.run_test(test).await?;
            debug!(test = %test.name, passed, "Self-test finished");
            reports.push(TestReport {
                file: file.to_string(),
                name: test.name.clone(),
                outcome: if passed {
                    TestOutcome::Passed
                } else {
                    TestOutcome::Failed
                },
            });
        }
        Ok(reports)
    }

    async fn run_test(&self, test: &TestConfig) -> Result<bool, EngineError> {
        let generators = self.registry().build_all(&test.transforms, self.resources())?;
        let condition = match &test.condition {
            Some(c) => Some(self.registry().inspectors().condition(c)?),
            None => None,
        };

        let generated = apply(&generators, vec![Message::control()]).await?;
        for input in generated.into_iter().filter(|m| !m.is_control()) {
            let outputs = apply_all(self.transforms(), vec![input]).await?;
            let Some(condition) = &condition else {
                continue;
            };
            for output in outputs.iter().filter(|m| !m.is_control()) {
                if !condition.evaluate(output).await? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn load(json: &str) -> Substation {
        Substation::from_config(PipelineConfig::from_json(json).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn passing_and_failing_tests() {
        let sub = load(
            r#"{
                "transforms": [{"type": "object_insert", "settings": {"object": {"target_key": "seen"}, "value": true}}],
                "tests": [
                    {"name": "inserts",
                     "transforms": [{"type": "utility_message", "settings": {"value": {"a": 1}}}],
                     "condition": {"inspectors": [{"type": "string_equal_to",
                        "settings": {"object": {"source_key": "seen"}, "value": "true"}}]}},
                    {"name": "wrong",
                     "transforms": [{"type": "utility_message", "settings": {"value": {"a": 1}}}],
                     "condition": {"inspectors": [{"type": "number_equal_to",
                        "settings": {"object": {"source_key": "a"}, "value": 2}}]}}
                ]
            }"#,
        );

        let reports = sub.self_test("config.json").await.unwrap();
        let lines: Vec<_> = reports.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            lines,
            vec!["ok\tconfig.json\tinserts", "FAIL\tconfig.json\twrong"]
        );
    }

    #[tokio::test]
    async fn configuration_without_tests() {
        let sub = load(r#"{"transforms": [{"type": "utility_drop"}]}"#);
        let reports = sub.self_test("c.json").await.unwrap();
        assert_eq!(reports[0].outcome, TestOutcome::NoTests);
        assert_eq!(reports[0].to_string(), "?\tc.json\t[no tests]");
    }

    #[tokio::test]
    async fn test_without_condition_passes() {
        let sub = load(
            r#"{"transforms": [{"type": "utility_drop"}],
                "tests": [{"name": "t", "transforms": [{"type": "utility_message", "settings": {"value": "x"}}]}]}"#,
        );
        let reports = sub.self_test("c.json").await.unwrap();
        assert_eq!(reports[0].outcome, TestOutcome::Passed);
    }
}
