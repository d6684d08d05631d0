pub mod builder;
pub mod condition;

pub use builder::{build_insert, build_select, build_update, Select};
pub use condition::{
    where_clause, Comparison, Condition, Conjunction, Filter, Operand, MAX_CONDITION_DEPTH,
};
