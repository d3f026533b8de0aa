/// Identifies a location in the compiled program: a function body, a global
/// variable, a string constant or a branch target inside a body.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    /// Top level functions and global variables, named after their definition
    Named(String),
    /// Compiler generated
    Anonymous(u32),
}

impl Label {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// The register holding the frame pointer of the active function
    pub fn frame_pointer() -> Self {
        Self::named("{FP}")
    }

    /// The register holding the stack pointer
    pub fn stack_pointer() -> Self {
        Self::named("{SP}")
    }
}

impl core::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Named(name) => write!(f, "{name}"),
            Label::Anonymous(id) => write!(f, "L{id}"),
        }
    }
}

/// Hands out anonymous labels. One generator lives for a whole compilation
/// and is passed from the frame pass to lowering so no label is issued twice.
#[derive(Debug, Default)]
pub struct LabelGenerator {
    next: u32,
}

impl LabelGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_anonymous(&mut self) -> Label {
        let label = Label::Anonymous(self.next);
        self.next += 1;
        label
    }
}
