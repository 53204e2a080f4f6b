use std::collections::BTreeSet;

/// Label of the fault category used by the bundled mock services.
pub const DEFAULT_FAULT_CLASS: &str = "insulator_fault";

/// Maps a detection class to the fault tier.
///
/// Must be deterministic: the same class always lands in the same tier.
pub trait FaultClassifier {
    fn is_fault(&self, class: &str) -> bool;
}

impl<F> FaultClassifier for F
where
    F: Fn(&str) -> bool,
{
    fn is_fault(&self, class: &str) -> bool {
        self(class)
    }
}

/// Exact-match set of fault class labels, usually read from config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaultClasses {
    classes: BTreeSet<String>,
}

impl FaultClasses {
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }
}

impl Default for FaultClasses {
    fn default() -> Self {
        Self::new([DEFAULT_FAULT_CLASS])
    }
}

impl FaultClassifier for FaultClasses {
    fn is_fault(&self, class: &str) -> bool {
        self.contains(class)
    }
}
