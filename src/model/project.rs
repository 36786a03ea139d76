use serde::{Deserialize, Serialize};

use super::test_case::Test;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tests: Vec<Test>,
}

impl TestSuite {
    pub fn new(name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            tests: Vec::new(),
        }
    }

    pub fn test(&self, test_id: &str) -> Option<&Test> {
        self.tests.iter().find(|t| t.id == test_id)
    }

    pub fn test_mut(&mut self, test_id: &str) -> Option<&mut Test> {
        self.tests.iter_mut().find(|t| t.id == test_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub test_suites: Vec<TestSuite>,
}

impl Project {
    pub fn new(name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            test_suites: Vec::new(),
        }
    }

    pub fn suite(&self, suite_id: &str) -> Option<&TestSuite> {
        self.test_suites.iter().find(|s| s.id == suite_id)
    }

    pub fn suite_mut(&mut self, suite_id: &str) -> Option<&mut TestSuite> {
        self.test_suites.iter_mut().find(|s| s.id == suite_id)
    }

    pub fn test_count(&self) -> usize {
        self.test_suites.iter().map(|s| s.tests.len()).sum()
    }
}
