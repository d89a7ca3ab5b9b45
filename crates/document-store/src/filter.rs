use serde_json::Value;

/// A single predicate on a top-level document field.
///
/// Values are compared in their text form, the way PostgreSQL's `->>`
/// operator renders JSON scalars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The field equals the value.
    Eq { field: String, value: String },

    /// The field equals any of the values.
    In { field: String, values: Vec<String> },

    /// The field is missing or JSON `null`.
    IsNull { field: String },
}

impl Condition {
    /// Returns the field this condition inspects.
    pub fn field(&self) -> &str {
        match self {
            Condition::Eq { field, .. } | Condition::In { field, .. } | Condition::IsNull { field } => {
                field
            }
        }
    }

    fn matches(&self, body: &Value) -> bool {
        let text = body.get(self.field()).and_then(scalar_text);
        match self {
            Condition::Eq { value, .. } => text.as_deref() == Some(value.as_str()),
            Condition::In { values, .. } => text.is_some_and(|t| values.contains(&t)),
            Condition::IsNull { .. } => text.is_none(),
        }
    }
}

/// Conjunction of [`Condition`]s used by `find`.
///
/// An empty filter matches every document in the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Creates a filter that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `field` to equal `value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl ToString) -> Self {
        self.conditions.push(Condition::Eq {
            field: field.into(),
            value: value.to_string(),
        });
        self
    }

    /// Requires `field` to equal one of `values`.
    pub fn any_of<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.conditions.push(Condition::In {
            field: field.into(),
            values: values.into_iter().map(|v| v.to_string()).collect(),
        });
        self
    }

    /// Requires `field` to be missing or null.
    pub fn is_null(mut self, field: impl Into<String>) -> Self {
        self.conditions.push(Condition::IsNull {
            field: field.into(),
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Evaluates the filter against a serialized document.
    pub fn matches(&self, body: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(body))
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
