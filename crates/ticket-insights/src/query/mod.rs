//! Local question answering: temporal windows and the rule-based engine.

pub mod local_engine;
pub mod temporal;

pub use local_engine::{
    answer_locally, answer_locally_at, classify_question, CountTarget, LocalIntent,
    DEPARTMENT_KEYWORDS,
};
pub use temporal::{detect_period, detect_period_at, PeriodRule, PERIOD_RULES};
