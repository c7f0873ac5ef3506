//! User events and the bindings that produce them

use form_ir::FieldPath;
use form_validation::RawInput;

/// What a widget does when the user interacts with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeBinding {
    /// Store new input at the path
    Set(FieldPath),
    /// Append an element to the array at the path
    Append(FieldPath),
    /// Remove element `index` of `array`
    Remove { array: FieldPath, index: usize },
    /// Submit the form
    Submit,
}

impl ChangeBinding {
    /// Build the event this binding emits.
    ///
    /// `input` is only read by [`ChangeBinding::Set`].
    #[must_use]
    pub fn event(&self, input: RawInput) -> FormEvent {
        match self {
            ChangeBinding::Set(path) => FormEvent::Change {
                path: path.clone(),
                input,
            },
            ChangeBinding::Append(path) => FormEvent::Append(path.clone()),
            ChangeBinding::Remove { array, index } => FormEvent::Remove {
                array: array.clone(),
                index: *index,
            },
            ChangeBinding::Submit => FormEvent::Submit,
        }
    }

    /// Short name used in markup
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            ChangeBinding::Set(_) => "set",
            ChangeBinding::Append(_) => "append",
            ChangeBinding::Remove { .. } => "remove",
            ChangeBinding::Submit => "submit",
        }
    }
}

/// Event fed back into [`crate::FormEngine::handle`]
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    Change { path: FieldPath, input: RawInput },
    Append(FieldPath),
    Remove { array: FieldPath, index: usize },
    Submit,
}
