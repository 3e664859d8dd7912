use serde::{Deserialize, Serialize};

use crate::registry::Fragment;
use crate::width::display_width;

/// Prompt slot a line is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptTarget {
    Left,
    Right,
    Bottom,
}

impl PromptTarget {
    pub const ALL: [PromptTarget; 3] = [Self::Left, Self::Right, Self::Bottom];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Bottom => "bottom",
        }
    }
}

/// Fragments kept on one prompt line after width fitting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutLine {
    pub fragments: Vec<Fragment>,
    /// Modules whose fragments were dropped, in drop order.
    pub dropped: Vec<String>,
    /// Display width of the kept fragments including separators.
    pub width: usize,
    /// A lone fragment is wider than the terminal and was kept uncut.
    pub overflow: bool,
}

impl LayoutLine {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// One line per prompt target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    left: LayoutLine,
    right: LayoutLine,
    bottom: LayoutLine,
}

impl Layout {
    pub fn line(&self, target: PromptTarget) -> &LayoutLine {
        match target {
            PromptTarget::Left => &self.left,
            PromptTarget::Right => &self.right,
            PromptTarget::Bottom => &self.bottom,
        }
    }

    pub fn set_line(&mut self, target: PromptTarget, line: LayoutLine) {
        match target {
            PromptTarget::Left => self.left = line,
            PromptTarget::Right => self.right = line,
            PromptTarget::Bottom => self.bottom = line,
        }
    }
}

/// Fits fragments into a width budget by dropping the least important ones.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    separator: String,
    separator_width: usize,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new("")
    }
}

impl LayoutEngine {
    pub fn new(separator: impl Into<String>) -> Self {
        let separator = separator.into();
        let separator_width = display_width(&separator);
        Self {
            separator,
            separator_width,
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Keep fragments in order while their total width exceeds `term_width`,
    /// dropping the lowest priority first (right-most on ties). Fragments are
    /// never cut; a single survivor wider than the budget is kept as is.
    pub fn compose(&self, fragments: Vec<Fragment>, term_width: u16) -> LayoutLine {
        let budget = term_width as usize;
        let mut kept: Vec<(usize, Fragment)> = fragments
            .into_iter()
            .map(|fragment| (fragment.width(), fragment))
            .collect();
        let mut dropped = Vec::new();

        let mut width = self.line_width(&kept);
        while width > budget && kept.len() > 1 {
            let mut victim = 0;
            for (idx, (_, fragment)) in kept.iter().enumerate() {
                if fragment.priority <= kept[victim].1.priority {
                    victim = idx;
                }
            }
            let (_, fragment) = kept.remove(victim);
            dropped.push(fragment.module);
            width = self.line_width(&kept);
        }

        LayoutLine {
            overflow: width > budget,
            fragments: kept.into_iter().map(|(_, fragment)| fragment).collect(),
            dropped,
            width,
        }
    }

    fn line_width(&self, kept: &[(usize, Fragment)]) -> usize {
        let text: usize = kept.iter().map(|(width, _)| width).sum();
        text + self.separator_width * kept.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(module: &str, text: &str, priority: i32) -> Fragment {
        Fragment {
            module: module.to_string(),
            ..Fragment::new(text).with_priority(priority)
        }
    }

    fn texts(line: &LayoutLine) -> Vec<&str> {
        line.fragments.iter().map(|f| f.text.as_str()).collect()
    }

    fn sample() -> Vec<Fragment> {
        vec![
            fragment("first", "abcdefgh", 1),
            fragment("second", "ijklmnopqrst", 2),
        ]
    }

    #[test]
    fn exact_fit_keeps_everything() {
        let line = LayoutEngine::default().compose(sample(), 20);
        assert_eq!(texts(&line), vec!["abcdefgh", "ijklmnopqrst"]);
        assert_eq!(line.width, 20);
        assert!(!line.overflow);
        assert!(line.dropped.is_empty());
    }

    #[test]
    fn lowest_priority_goes_first_and_oversize_survivor_is_uncut() {
        let line = LayoutEngine::default().compose(sample(), 10);
        assert_eq!(texts(&line), vec!["ijklmnopqrst"]);
        assert_eq!(line.dropped, vec!["first".to_string()]);
        assert_eq!(line.width, 12);
        assert!(line.overflow);
    }

    #[test]
    fn separators_count_toward_the_budget() {
        let engine = LayoutEngine::new(" | ");
        let fragments = vec![
            fragment("a", "aaaa", 5),
            fragment("b", "bbbb", 1),
            fragment("c", "cccc", 3),
        ];

        let line = engine.compose(fragments.clone(), 18);
        assert_eq!(line.width, 18);
        assert_eq!(texts(&line).len(), 3);

        let line = engine.compose(fragments, 17);
        assert_eq!(texts(&line), vec!["aaaa", "cccc"]);
        assert_eq!(line.width, 11);
    }

    #[test]
    fn ties_drop_the_rightmost_fragment() {
        let fragments = vec![
            fragment("a", "aaa", 1),
            fragment("b", "bbb", 1),
            fragment("c", "ccc", 9),
        ];
        let line = LayoutEngine::default().compose(fragments, 6);
        assert_eq!(texts(&line), vec!["aaa", "ccc"]);
        assert_eq!(line.dropped, vec!["b".to_string()]);
    }

    #[test]
    fn width_invariant_holds_for_many_budgets() {
        let fragments: Vec<Fragment> = (0..8)
            .map(|idx| fragment(&format!("m{idx}"), &"x".repeat(idx + 1), (idx as i32 * 7) % 5))
            .collect();
        let engine = LayoutEngine::new(" ");

        for width in 1..60u16 {
            let first = engine.compose(fragments.clone(), width);
            let again = engine.compose(fragments.clone(), width);
            assert_eq!(first, again);
            if first.fragments.len() > 1 {
                assert!(first.width <= width as usize);
            }
            assert_eq!(first.overflow, first.width > width as usize);
            assert_eq!(first.fragments.len() + first.dropped.len(), fragments.len());
        }
    }

    #[test]
    fn kept_fragments_preserve_input_order() {
        let fragments = vec![
            fragment("a", "aa", 3),
            fragment("b", "bb", 0),
            fragment("c", "cc", 2),
            fragment("d", "dd", 1),
        ];
        let line = LayoutEngine::default().compose(fragments, 5);
        assert_eq!(texts(&line), vec!["aa", "cc"]);
        assert_eq!(line.dropped, vec!["b".to_string(), "d".to_string()]);
    }

    #[test]
    fn empty_input_is_an_empty_line() {
        let line = LayoutEngine::default().compose(Vec::new(), 10);
        assert!(line.is_empty());
        assert_eq!(line.width, 0);
        assert!(!line.overflow);
    }
}
