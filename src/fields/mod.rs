//! Deferred prompt fields.
//!
//! Shells such as xonsh expand `{name}` slots in their prompt templates by
//! calling a registered function at display time. `PromptFields` is that
//! table: names bound ahead of time to zero-argument closures.

mod core;

pub use self::core::{BOTTOM_FIELD, LEFT_FIELD, PromptFields, PromptTemplates, RIGHT_FIELD};
