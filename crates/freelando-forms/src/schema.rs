//! Declarative description of forms and their fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{AsyncValidatorSpec, ErrorKind, ValidatorSpec};

/// Message shown for an error kind the field has no entry for.
pub const FALLBACK_MESSAGE: &str = "Campo inválido";

/// The input kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Single-line text.
    Text,
    /// Email address.
    Email,
    /// Masked password.
    Password,
    /// Dropdown with one selection.
    Select,
    /// Multi-line text.
    Textarea,
    /// Radio group with one selection.
    Radio,
    /// File picker; the value is a data URL.
    File,
    /// Several selections from fixed choices.
    MultiSelect,
    /// A list of structured entries.
    List,
}

impl FieldKind {
    /// Returns the HTML input type used to render this kind.
    pub const fn input_type(self) -> &'static str {
        match self {
            Self::Text | Self::List => "text",
            Self::Email => "email",
            Self::Password => "password",
            Self::Select | Self::MultiSelect => "select",
            Self::Textarea => "textarea",
            Self::Radio => "radio",
            Self::File => "file",
        }
    }

    /// Returns the value a fresh control of this kind starts with.
    pub fn empty_value(self) -> Value {
        match self {
            Self::MultiSelect | Self::List => Value::Array(Vec::new()),
            _ => Value::String(String::new()),
        }
    }
}

/// Horizontal space a field takes in the step layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutWidth {
    /// The whole row.
    #[default]
    Full,
    /// Half a row.
    Half,
}

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// The submitted value.
    pub value: String,
    /// The displayed label.
    pub label: String,
}

impl Choice {
    /// Creates a choice.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Definition of a form field.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    /// Field label.
    pub label: String,
    /// Field name; the key of its value in the form group.
    pub name: String,
    /// Input kind.
    pub kind: FieldKind,
    /// Whether the field is marked as required in the layout.
    pub required: bool,
    /// Placeholder text.
    pub placeholder: String,
    /// Messages shown per error kind.
    pub error_messages: HashMap<ErrorKind, String>,
    /// Synchronous validators, in evaluation order.
    pub validators: Vec<ValidatorSpec>,
    /// Asynchronous validators, run only after every synchronous one passes.
    pub async_validators: Vec<AsyncValidatorSpec>,
    /// Layout hint.
    pub width: LayoutWidth,
    /// Fixed choices for select and radio fields.
    pub choices: Vec<Choice>,
    /// Starting value. Defaults to the kind's empty value.
    pub initial: Value,
}

impl FieldSchema {
    /// Creates a new field definition.
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
            kind,
            required: false,
            placeholder: String::new(),
            error_messages: HashMap::new(),
            validators: Vec::new(),
            async_validators: Vec::new(),
            width: LayoutWidth::Full,
            choices: Vec::new(),
            initial: kind.empty_value(),
        }
    }

    /// Marks the field as required in the layout.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the placeholder.
    #[must_use]
    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = text.into();
        self
    }

    /// Sets the message shown for an error kind.
    #[must_use]
    pub fn message(mut self, kind: ErrorKind, text: impl Into<String>) -> Self {
        self.error_messages.insert(kind, text.into());
        self
    }

    /// Adds a synchronous validator.
    #[must_use]
    pub fn validator(mut self, validator: ValidatorSpec) -> Self {
        self.validators.push(validator);
        self
    }

    /// Adds an asynchronous validator.
    #[must_use]
    pub fn async_validator(mut self, validator: AsyncValidatorSpec) -> Self {
        self.async_validators.push(validator);
        self
    }

    /// Sets the layout width.
    #[must_use]
    pub fn width(mut self, width: LayoutWidth) -> Self {
        self.width = width;
        self
    }

    /// Sets the fixed choices.
    #[must_use]
    pub fn choices(mut self, choices: impl IntoIterator<Item = Choice>) -> Self {
        self.choices = choices.into_iter().collect();
        self
    }

    /// Sets the starting value.
    #[must_use]
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = value.into();
        self
    }

    /// Returns the message for an error kind, or [`FALLBACK_MESSAGE`].
    pub fn message_for(&self, kind: ErrorKind) -> &str {
        self.error_messages
            .get(&kind)
            .map_or(FALLBACK_MESSAGE, String::as_str)
    }
}

/// Everything a wizard step needs to render and validate its form.
#[derive(Debug, Clone, Default)]
pub struct FormConfiguration {
    /// Heading of the step.
    pub title: String,
    /// Introductory text.
    pub description: String,
    /// Fields in display order.
    pub fields: Vec<FieldSchema>,
}

impl FormConfiguration {
    /// Creates an empty configuration with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Looks a field up by name.
    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_schema_builder() {
        let field = FieldSchema::new("cpf", "CPF", FieldKind::Text)
            .required()
            .placeholder("123.456.789-00")
            .message(ErrorKind::Required, "CPF é obrigatório")
            .message(ErrorKind::ChecksumInvalid, "CPF inválido")
            .validator(ValidatorSpec::Required)
            .validator(ValidatorSpec::Cpf)
            .width(LayoutWidth::Half);

        assert_eq!(field.name, "cpf");
        assert!(field.required);
        assert_eq!(field.validators.len(), 2);
        assert_eq!(field.width, LayoutWidth::Half);
        assert_eq!(field.initial, json!(""));
    }

    #[test]
    fn test_message_fallback() {
        let field = FieldSchema::new("email", "Email", FieldKind::Email)
            .message(ErrorKind::Required, "Email é obrigatório");

        assert_eq!(field.message_for(ErrorKind::Required), "Email é obrigatório");
        assert_eq!(field.message_for(ErrorKind::AlreadyExists), FALLBACK_MESSAGE);
    }

    #[test]
    fn test_list_fields_start_empty() {
        let field = FieldSchema::new("idiomas", "Idiomas", FieldKind::List);
        assert_eq!(field.initial, json!([]));
    }

    #[test]
    fn test_configuration_lookup() {
        let config = FormConfiguration::new("Crie seu cadastro")
            .description("Comece agora")
            .field(FieldSchema::new("nomeCompleto", "Nome Completo", FieldKind::Text))
            .field(FieldSchema::new("estado", "Estado", FieldKind::Select));

        assert_eq!(config.fields.len(), 2);
        assert!(config.get("estado").is_some());
        assert!(config.get("cidade").is_none());
    }
}
