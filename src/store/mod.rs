//! JSON-file persistence for the project hierarchy

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::model::{first_out_of_order, Project, Step, Test, TestSuite};

/// Projects loaded from, and saved back to, a single JSON file.
#[derive(Debug)]
pub struct ProjectStore {
    path: PathBuf,
    projects: Vec<Project>,
}

impl ProjectStore {
    /// Load the store at `path`. A missing file is an empty store; a file
    /// that cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            log::debug!("No project store at {}, starting empty", path.display());
            return Ok(Self::empty(path));
        }

        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let projects: Vec<Project> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };

        let tests = projects
            .iter()
            .flat_map(|p| &p.test_suites)
            .flat_map(|s| &s.tests);
        for test in tests {
            if let Some(index) = first_out_of_order(&test.steps) {
                return Err(StoreError::OffsetOutOfOrder {
                    test_id: test.id.clone(),
                    index,
                });
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            projects,
        })
    }

    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            projects: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all projects; the file is replaced atomically.
    pub fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.projects)?;
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;

        log::debug!("Saved {} project(s) to {}", self.projects.len(), self.path.display());
        Ok(())
    }

    // ── Projects ─────────────────────────────────────────────────────────────

    pub fn create_project(&mut self, name: &str) -> &Project {
        let project = Project::new(name);
        log::info!("Created project '{}' ({})", project.name, project.id);
        self.projects.push(project);
        &self.projects[self.projects.len() - 1]
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, project_id: &str) -> Result<&Project, StoreError> {
        self.projects
            .iter()
            .find(|p| p.id == project_id)
            .ok_or_else(|| StoreError::ProjectNotFound(project_id.to_string()))
    }

    pub fn project_mut(&mut self, project_id: &str) -> Result<&mut Project, StoreError> {
        self.projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| StoreError::ProjectNotFound(project_id.to_string()))
    }

    // ── Suites ───────────────────────────────────────────────────────────────

    pub fn create_test_suite(
        &mut self,
        project_id: &str,
        name: &str,
    ) -> Result<&TestSuite, StoreError> {
        let project = self.project_mut(project_id)?;
        project.test_suites.push(TestSuite::new(name));
        let suite = &project.test_suites[project.test_suites.len() - 1];
        log::info!("Created test suite '{}' ({})", suite.name, suite.id);
        Ok(suite)
    }

    pub fn test_suites(&self, project_id: &str) -> Result<&[TestSuite], StoreError> {
        Ok(&self.project(project_id)?.test_suites)
    }

    pub fn test_suite(&self, project_id: &str, suite_id: &str) -> Result<&TestSuite, StoreError> {
        self.project(project_id)?
            .suite(suite_id)
            .ok_or_else(|| StoreError::SuiteNotFound(suite_id.to_string()))
    }

    fn test_suite_mut(
        &mut self,
        project_id: &str,
        suite_id: &str,
    ) -> Result<&mut TestSuite, StoreError> {
        self.project_mut(project_id)?
            .suite_mut(suite_id)
            .ok_or_else(|| StoreError::SuiteNotFound(suite_id.to_string()))
    }

    // ── Tests ────────────────────────────────────────────────────────────────

    pub fn create_test(
        &mut self,
        project_id: &str,
        suite_id: &str,
        name: &str,
    ) -> Result<&Test, StoreError> {
        let suite = self.test_suite_mut(project_id, suite_id)?;
        suite.tests.push(Test::new(name));
        let test = &suite.tests[suite.tests.len() - 1];
        log::info!("Created test '{}' ({})", test.name, test.id);
        Ok(test)
    }

    pub fn tests(&self, project_id: &str, suite_id: &str) -> Result<&[Test], StoreError> {
        Ok(&self.test_suite(project_id, suite_id)?.tests)
    }

    pub fn test(
        &self,
        project_id: &str,
        suite_id: &str,
        test_id: &str,
    ) -> Result<&Test, StoreError> {
        self.test_suite(project_id, suite_id)?
            .test(test_id)
            .ok_or_else(|| StoreError::TestNotFound(test_id.to_string()))
    }

    pub fn test_mut(
        &mut self,
        project_id: &str,
        suite_id: &str,
        test_id: &str,
    ) -> Result<&mut Test, StoreError> {
        self.test_suite_mut(project_id, suite_id)?
            .test_mut(test_id)
            .ok_or_else(|| StoreError::TestNotFound(test_id.to_string()))
    }

    // ── Steps ────────────────────────────────────────────────────────────────

    pub fn steps(
        &self,
        project_id: &str,
        suite_id: &str,
        test_id: &str,
    ) -> Result<&[Step], StoreError> {
        Ok(&self.test(project_id, suite_id, test_id)?.steps)
    }

    pub fn add_step(
        &mut self,
        project_id: &str,
        suite_id: &str,
        test_id: &str,
        step: Step,
    ) -> Result<(), StoreError> {
        let test = self.test_mut(project_id, suite_id, test_id)?;
        if let Some(last) = test.steps.last() {
            if step.offset_seconds < last.offset_seconds {
                return Err(StoreError::OffsetOutOfOrder {
                    test_id: test.id.clone(),
                    index: test.steps.len(),
                });
            }
        }
        test.steps.push(step);
        Ok(())
    }

    pub fn update_step(
        &mut self,
        project_id: &str,
        suite_id: &str,
        test_id: &str,
        index: usize,
        step: Step,
    ) -> Result<(), StoreError> {
        let test = self.test_mut(project_id, suite_id, test_id)?;
        let len = test.steps.len();
        if index >= len {
            return Err(StoreError::StepIndexOutOfRange { index, len });
        }

        let offset = step.offset_seconds;
        let after_previous = index == 0 || test.steps[index - 1].offset_seconds <= offset;
        let before_next = test
            .steps
            .get(index + 1)
            .map_or(true, |next| offset <= next.offset_seconds);
        if !(after_previous && before_next) {
            return Err(StoreError::OffsetOutOfOrder {
                test_id: test.id.clone(),
                index,
            });
        }

        test.steps[index] = step;
        Ok(())
    }

    pub fn delete_step(
        &mut self,
        project_id: &str,
        suite_id: &str,
        test_id: &str,
        index: usize,
    ) -> Result<Step, StoreError> {
        let test = self.test_mut(project_id, suite_id, test_id)?;
        let len = test.steps.len();
        if index >= len {
            return Err(StoreError::StepIndexOutOfRange { index, len });
        }
        Ok(test.steps.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MouseButton, TestResult};

    fn seeded(dir: &Path) -> (ProjectStore, String, String, String) {
        let mut store = ProjectStore::load(&dir.join("projects.json")).unwrap();
        let project_id = store.create_project("Billing").id.clone();
        let suite_id = store.create_test_suite(&project_id, "Smoke").unwrap().id.clone();
        let test_id = store
            .create_test(&project_id, &suite_id, "Login")
            .unwrap()
            .id
            .clone();
        (store, project_id, suite_id, test_id)
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::load(&dir.path().join("none.json")).unwrap();
        assert!(store.projects().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            ProjectStore::load(&path),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn test_hierarchy_persists_every_step_field() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, project_id, suite_id, test_id) = seeded(dir.path());

        let steps = vec![
            Step::mouse_click(10, 20, MouseButton::Left, 0.5),
            Step::key_press("a", 1.2),
            Step::key_press("ArrowDown", 1.75),
        ];
        {
            let test = store.test_mut(&project_id, &suite_id, &test_id).unwrap();
            test.steps = steps.clone();
            test.result = TestResult::Failed;
        }
        store.save().unwrap();

        let reloaded = ProjectStore::load(store.path()).unwrap();
        let test = reloaded.test(&project_id, &suite_id, &test_id).unwrap();
        assert_eq!(test.steps, steps);
        assert_eq!(test.result, TestResult::Failed);
        assert_eq!(test.name, "Login");
        assert_eq!(reloaded.test_suites(&project_id).unwrap()[0].name, "Smoke");
    }

    #[test]
    fn test_step_editing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, p, s, t) = seeded(dir.path());

        store.add_step(&p, &s, &t, Step::key_press("a", 0.0)).unwrap();
        store.add_step(&p, &s, &t, Step::key_press("b", 0.5)).unwrap();
        store
            .update_step(&p, &s, &t, 1, Step::key_press("c", 0.5))
            .unwrap();
        assert_eq!(store.steps(&p, &s, &t).unwrap()[1], Step::key_press("c", 0.5));

        let removed = store.delete_step(&p, &s, &t, 0).unwrap();
        assert_eq!(removed, Step::key_press("a", 0.0));
        assert_eq!(store.steps(&p, &s, &t).unwrap().len(), 1);

        assert!(matches!(
            store.delete_step(&p, &s, &t, 5),
            Err(StoreError::StepIndexOutOfRange { index: 5, len: 1 })
        ));
        assert!(matches!(
            store.update_step(&p, &s, &t, 1, Step::key_press("d", 0.0)),
            Err(StoreError::StepIndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_step_edits_keep_offsets_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, p, s, t) = seeded(dir.path());

        store.add_step(&p, &s, &t, Step::key_press("a", 1.0)).unwrap();
        store.add_step(&p, &s, &t, Step::key_press("b", 2.0)).unwrap();
        store.add_step(&p, &s, &t, Step::key_press("c", 2.0)).unwrap();

        assert!(matches!(
            store.add_step(&p, &s, &t, Step::key_press("d", 0.5)),
            Err(StoreError::OffsetOutOfOrder { index: 3, .. })
        ));
        assert!(matches!(
            store.update_step(&p, &s, &t, 1, Step::key_press("b", 0.9)),
            Err(StoreError::OffsetOutOfOrder { index: 1, .. })
        ));
        assert!(matches!(
            store.update_step(&p, &s, &t, 0, Step::key_press("a", 2.5)),
            Err(StoreError::OffsetOutOfOrder { index: 0, .. })
        ));
        store
            .update_step(&p, &s, &t, 1, Step::key_press("b", 1.5))
            .unwrap();

        store.save().unwrap();
        let reloaded = ProjectStore::load(store.path()).unwrap();
        let offsets: Vec<f64> = reloaded
            .steps(&p, &s, &t)
            .unwrap()
            .iter()
            .map(|step| step.offset_seconds)
            .collect();
        assert_eq!(offsets, vec![1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_out_of_order_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, p, s, t) = seeded(dir.path());
        store.test_mut(&p, &s, &t).unwrap().steps = vec![
            Step::key_press("a", 2.0),
            Step::key_press("b", 0.5),
        ];
        store.save().unwrap();

        match ProjectStore::load(store.path()) {
            Err(StoreError::OffsetOutOfOrder { test_id, index }) => {
                assert_eq!(test_id, t);
                assert_eq!(index, 1);
            }
            other => panic!("expected OffsetOutOfOrder, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_ids_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (store, p, s, _) = seeded(dir.path());

        assert!(matches!(
            store.project("missing"),
            Err(StoreError::ProjectNotFound(_))
        ));
        assert!(matches!(
            store.tests(&p, "missing"),
            Err(StoreError::SuiteNotFound(_))
        ));
        assert!(matches!(
            store.test(&p, &s, "missing"),
            Err(StoreError::TestNotFound(_))
        ));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let mut store = ProjectStore::load(&path).unwrap();
        store.create_project("x");
        store.save().unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
