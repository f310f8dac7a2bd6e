//! Per-instance style rules.
//!
//! Layouts describe shared geometry (container sizes, surface extent) as rules attached to
//! generated class names instead of writing the same values onto every element. Each view owns
//! one registry: class names are allocated from it, rules live in it, and [`StyleRegistry::teardown`]
//! releases everything in one pass.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// A single rule: `.{class} {selector}` followed by declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StyleRule {
    pub class: String,
    /// Descendant selector appended after the class, e.g. `.lv-container`. Empty targets the
    /// class itself.
    pub selector: String,
    pub declarations: Vec<(String, String)>,
}

impl StyleRule {
    pub fn declaration(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }
}

/// A change produced since the last [`StyleRegistry::flush`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StyleChange {
    Upsert(StyleRule),
    Remove { class: String, selector: String },
}

#[derive(Debug, Default)]
pub struct StyleRegistry {
    instance: u32,
    next_class: u32,
    classes: Vec<String>,
    rules: BTreeMap<(String, String), Vec<(String, String)>>,
    pending: Vec<StyleChange>,
}

impl StyleRegistry {
    pub fn new(instance: u32) -> Self {
        Self {
            instance,
            ..Self::default()
        }
    }

    /// Allocates a class name unique within this registry.
    pub fn allocate_class(&mut self, prefix: &str) -> String {
        let class = format!("{prefix}-{}-{}", self.instance, self.next_class);
        self.next_class += 1;
        self.classes.push(class.clone());
        class
    }

    pub fn owns(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Inserts or replaces the rule for `(class, selector)`.
    ///
    /// Setting identical declarations is a no-op and produces no pending change.
    pub fn set_rule(&mut self, class: &str, selector: &str, declarations: Vec<(String, String)>) {
        debug_assert!(self.owns(class), "class {class} was not allocated here");
        let key = (String::from(class), String::from(selector));
        if self.rules.get(&key) == Some(&declarations) {
            return;
        }
        self.pending.push(StyleChange::Upsert(StyleRule {
            class: key.0.clone(),
            selector: key.1.clone(),
            declarations: declarations.clone(),
        }));
        self.rules.insert(key, declarations);
    }

    pub fn rule(&self, class: &str, selector: &str) -> Option<StyleRule> {
        self.rules
            .get(&(String::from(class), String::from(selector)))
            .map(|declarations| StyleRule {
                class: String::from(class),
                selector: String::from(selector),
                declarations: declarations.clone(),
            })
    }

    pub fn rules(&self) -> impl Iterator<Item = StyleRule> + '_ {
        self.rules.iter().map(|((class, selector), d)| StyleRule {
            class: class.clone(),
            selector: selector.clone(),
            declarations: d.clone(),
        })
    }

    /// Removes every rule of `class` and releases the class name.
    pub fn release_class(&mut self, class: &str) {
        let keys: Vec<_> = self
            .rules
            .keys()
            .filter(|(c, _)| c == class)
            .cloned()
            .collect();
        for key in keys {
            self.rules.remove(&key);
            self.pending.push(StyleChange::Remove {
                class: key.0,
                selector: key.1,
            });
        }
        self.classes.retain(|c| c != class);
    }

    /// Returns the changes made since the previous flush.
    pub fn flush(&mut self) -> Vec<StyleChange> {
        core::mem::take(&mut self.pending)
    }

    /// Releases every class and rule; the returned changes remove them from the surface.
    pub fn teardown(&mut self) -> Vec<StyleChange> {
        let classes = core::mem::take(&mut self.classes);
        for class in &classes {
            let keys: Vec<_> = self
                .rules
                .keys()
                .filter(|(c, _)| c == class)
                .cloned()
                .collect();
            for key in keys {
                self.rules.remove(&key);
                self.pending.push(StyleChange::Remove {
                    class: key.0,
                    selector: key.1,
                });
            }
        }
        vdebug!(classes = classes.len(), "style registry teardown");
        self.flush()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Formats a pixel declaration.
pub(crate) fn px(property: &str, value: u32) -> (String, String) {
    (String::from(property), format!("{value}px"))
}
