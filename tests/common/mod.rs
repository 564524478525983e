#![allow(dead_code)]

pub use siteflow_test_utils::builders;
pub use siteflow_test_utils::fake_action;
pub use siteflow_test_utils::fake_backend;
pub use siteflow_test_utils::{init_tracing, with_timeout};
