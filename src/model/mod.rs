//! Project → TestSuite → Test → Step data model

pub mod key;
pub mod project;
pub mod step;
pub mod test_case;

pub use key::{KeyInput, NamedKey};
pub use project::{Project, TestSuite};
pub use step::{first_out_of_order, is_time_ordered, MouseButton, Step, StepAction};
pub use test_case::{Test, TestResult};
