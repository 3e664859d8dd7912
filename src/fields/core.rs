use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::layout::PromptTarget;
use crate::registry::Fragment;
use crate::render::RenderPipeline;
use crate::snapshot::FactSnapshot;

pub const LEFT_FIELD: &str = "prompt_left";
pub const RIGHT_FIELD: &str = "prompt_right";
pub const BOTTOM_FIELD: &str = "prompt_bottom";

type FieldFn = Arc<dyn Fn() -> String + Send + Sync>;

fn field_name(target: PromptTarget) -> &'static str {
    match target {
        PromptTarget::Left => LEFT_FIELD,
        PromptTarget::Right => RIGHT_FIELD,
        PromptTarget::Bottom => BOTTOM_FIELD,
    }
}

#[derive(Clone, Default)]
pub struct PromptFields {
    fields: BTreeMap<String, FieldFn>,
}

impl fmt::Debug for PromptFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptFields")
            .field("names", &self.names())
            .finish()
    }
}

impl PromptFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field<F>(mut self, name: impl Into<String>, field: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.insert(name, field);
        self
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, field: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.fields.insert(name.into(), Arc::new(field));
    }

    /// Register a slot backed by a module-style producer. The fragment's
    /// text is substituted; `None` expands to nothing.
    pub fn with_fragment_field<F>(mut self, name: impl Into<String>, field: F) -> Self
    where
        F: Fn() -> Option<Fragment> + Send + Sync + 'static,
    {
        self.insert(name, move || field().map(|fragment| fragment.text).unwrap_or_default());
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Evaluate a single field.
    pub fn value(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|field| field())
    }

    /// Bind one field per configured target to `pipeline`.
    ///
    /// `snapshot` gathers the facts at display time. When it fails the field
    /// renders empty so the shell keeps a usable prompt.
    pub fn bind_pipeline<S>(mut self, pipeline: Arc<RenderPipeline>, snapshot: S) -> Self
    where
        S: Fn() -> Result<FactSnapshot> + Send + Sync + 'static,
    {
        let snapshot = Arc::new(snapshot);
        for target in PromptTarget::ALL {
            if target != PromptTarget::Left && !pipeline.is_configured(target) {
                continue;
            }
            let pipeline = Arc::clone(&pipeline);
            let snapshot = Arc::clone(&snapshot);
            self.insert(field_name(target), move || {
                (*snapshot)()
                    .and_then(|facts| pipeline.render_line(&facts, target))
                    .unwrap_or_default()
            });
        }
        self
    }

    /// Expand `{name}` slots. Unknown slots are kept verbatim so the shell
    /// can expand its own fields; `{{` and `}}` produce literal braces.
    pub fn format(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") || tail.starts_with("}}") {
                out.push_str(&tail[..1]);
                rest = &tail[2..];
                continue;
            }
            if tail.starts_with('}') {
                out.push('}');
                rest = &tail[1..];
                continue;
            }

            match tail[1..].find('}') {
                Some(end) => {
                    let name = &tail[1..1 + end];
                    match self.value(name) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(&tail[..end + 2]),
                    }
                    rest = &tail[end + 2..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Prompt variable templates the shell should install.
///
/// Right and bottom templates exist only for configured targets. With
/// `replace_prompt` off the shell keeps its own templates and only gains the
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptTemplates {
    pub prompt: Option<String>,
    pub right_prompt: Option<String>,
    pub bottom_toolbar: Option<String>,
}

impl PromptTemplates {
    pub fn for_pipeline(pipeline: &RenderPipeline, replace_prompt: bool) -> Self {
        if !replace_prompt {
            return Self::default();
        }
        let slot = |target: PromptTarget| {
            (target == PromptTarget::Left || pipeline.is_configured(target))
                .then(|| format!("{{{}}}", field_name(target)))
        };
        Self {
            prompt: slot(PromptTarget::Left),
            right_prompt: slot(PromptTarget::Right),
            bottom_toolbar: slot(PromptTarget::Bottom),
        }
    }
}
