//! Live form groups built from a [`FormConfiguration`].

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{FormError, Result, ValidationErrors};
use crate::schema::{FieldSchema, FormConfiguration};
use crate::validation::{is_empty_value, AsyncValidatorSpec, ErrorKind, GroupError, GroupValidatorSpec};

/// Validity of a single control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStatus {
    /// Every validator passed.
    Valid,
    /// At least one validator failed.
    Invalid,
    /// Synchronous validators passed; an async evaluation is outstanding.
    Pending,
    /// The control is disabled and takes no part in validation.
    Disabled,
}

/// A single named field's runtime state.
#[derive(Debug, Clone)]
pub struct Control {
    schema: FieldSchema,
    value: Value,
    touched: bool,
    dirty: bool,
    disabled: bool,
    errors: Vec<ErrorKind>,
    async_error: Option<ErrorKind>,
    /// Bumped on every value change; identifies the latest async evaluation.
    generation: u64,
    pending: bool,
    dispatched: bool,
}

impl Control {
    fn new(schema: &FieldSchema) -> Self {
        let mut control = Self {
            value: schema.initial.clone(),
            schema: schema.clone(),
            touched: false,
            dirty: false,
            disabled: false,
            errors: Vec::new(),
            async_error: None,
            generation: 0,
            pending: false,
            dispatched: false,
        };
        control.revalidate();
        control
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// The schema this control was built from.
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// The current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether the user has left the field at least once.
    pub fn is_touched(&self) -> bool {
        self.touched
    }

    /// Whether the value was changed by the user.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the control is disabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Current validity.
    pub fn status(&self) -> ControlStatus {
        if self.disabled {
            ControlStatus::Disabled
        } else if !self.errors.is_empty() || self.async_error.is_some() {
            ControlStatus::Invalid
        } else if self.pending {
            ControlStatus::Pending
        } else {
            ControlStatus::Valid
        }
    }

    /// Whether the control passes validation.
    pub fn is_valid(&self) -> bool {
        self.status() == ControlStatus::Valid
    }

    /// Errors from synchronous validators followed by the async one, if any.
    pub fn errors(&self) -> Vec<ErrorKind> {
        let mut errors = self.errors.clone();
        errors.extend(self.async_error);
        errors
    }

    /// Runs the synchronous validators and schedules async ones when they pass.
    fn revalidate(&mut self) {
        self.errors = self
            .schema
            .validators
            .iter()
            .filter_map(|v| v.check(&self.value))
            .collect();

        // Any earlier in-flight evaluation is now stale.
        self.generation += 1;
        self.async_error = None;
        self.dispatched = false;
        self.pending = self.errors.is_empty()
            && !self.schema.async_validators.is_empty()
            && !is_empty_value(&self.value);
    }
}

/// A pending async evaluation of one control.
#[derive(Debug, Clone)]
pub struct AsyncJob {
    /// Control being validated.
    pub control: String,
    /// Generation of the value the job was issued for.
    pub generation: u64,
    /// The value under evaluation.
    pub value: Value,
    validators: Vec<AsyncValidatorSpec>,
}

impl AsyncJob {
    /// Evaluates the async validators in order; the first failure wins.
    pub async fn run(self) -> AsyncOutcome {
        let mut error = None;
        for validator in &self.validators {
            if let Some(kind) = validator.check(&self.value).await {
                error = Some(kind);
                break;
            }
        }
        AsyncOutcome {
            control: self.control,
            generation: self.generation,
            error,
        }
    }
}

/// Result of an [`AsyncJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncOutcome {
    /// Control that was validated.
    pub control: String,
    /// Generation of the evaluated value.
    pub generation: u64,
    /// The failure found, if any.
    pub error: Option<ErrorKind>,
}

/// Builds live form groups from configurations.
#[derive(Debug, Clone, Default)]
pub struct FormBuilder {
    group_validators: Vec<GroupValidatorSpec>,
}

impl FormBuilder {
    /// Creates a builder without group validators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a validator spanning several controls.
    #[must_use]
    pub fn group_validator(mut self, validator: GroupValidatorSpec) -> Self {
        self.group_validators.push(validator);
        self
    }

    /// Creates a form group with one control per field, each set to the
    /// field's starting value and validated once.
    pub fn build(&self, config: &FormConfiguration) -> FormGroup {
        FormGroup {
            controls: config.fields.iter().map(Control::new).collect(),
            group_validators: self.group_validators.clone(),
        }
    }
}

/// An aggregate of controls plus group-level validators.
#[derive(Debug, Clone)]
pub struct FormGroup {
    controls: Vec<Control>,
    group_validators: Vec<GroupValidatorSpec>,
}

impl FormGroup {
    /// Controls in field order.
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// Looks a control up by name.
    pub fn get(&self, name: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.name() == name)
    }

    fn control_mut(&mut self, name: &str) -> Result<&mut Control> {
        self.controls
            .iter_mut()
            .find(|c| c.name() == name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    /// The current value of a control.
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.get(name).map(Control::value)
    }

    /// The current value of a control as text, empty when it is not a string.
    pub fn text_of(&self, name: &str) -> &str {
        self.value_of(name).and_then(Value::as_str).unwrap_or("")
    }

    /// Sets a value as the user would, marking the control dirty.
    ///
    /// A disabled control rejects the edit with [`FormError::Disabled`].
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let control = self.control_mut(name)?;
        if control.disabled {
            return Err(FormError::Disabled(name.to_string()));
        }
        control.value = value.into();
        control.dirty = true;
        control.revalidate();
        Ok(())
    }

    /// Sets several values at once. Keys without a control and disabled
    /// controls are skipped.
    pub fn patch_value(&mut self, values: &Map<String, Value>) {
        for control in self.controls.iter_mut().filter(|c| !c.disabled) {
            if let Some(value) = values.get(control.name()) {
                control.value = value.clone();
                control.dirty = true;
                control.revalidate();
            }
        }
    }

    /// Restores previously saved values without marking anything dirty.
    pub fn load_values(&mut self, values: &Map<String, Value>) {
        for control in &mut self.controls {
            if let Some(value) = values.get(control.name()) {
                control.value = value.clone();
                control.revalidate();
            }
        }
    }

    /// Puts a control back to its kind's empty value without marking it dirty.
    pub fn clear(&mut self, name: &str) -> Result<()> {
        let control = self.control_mut(name)?;
        control.value = control.schema.kind.empty_value();
        control.revalidate();
        Ok(())
    }

    /// Marks one control as touched.
    pub fn mark_as_touched(&mut self, name: &str) -> Result<()> {
        self.control_mut(name)?.touched = true;
        Ok(())
    }

    /// Marks every control as touched so their errors render.
    pub fn mark_all_as_touched(&mut self) {
        for control in &mut self.controls {
            control.touched = true;
        }
    }

    /// Disables a control, excluding it from validation and [`value`](Self::value).
    pub fn disable(&mut self, name: &str) -> Result<()> {
        let control = self.control_mut(name)?;
        control.disabled = true;
        control.generation += 1;
        control.pending = false;
        control.async_error = None;
        Ok(())
    }

    /// Enables a control and validates its current value.
    pub fn enable(&mut self, name: &str) -> Result<()> {
        let control = self.control_mut(name)?;
        if control.disabled {
            control.disabled = false;
            control.revalidate();
        }
        Ok(())
    }

    /// Errors of the group-level validators.
    pub fn group_errors(&self) -> Vec<GroupError> {
        self.group_validators
            .iter()
            .filter_map(|v| v.check(self))
            .collect()
    }

    /// Whether every enabled control is valid and every group validator passes.
    pub fn is_valid(&self) -> bool {
        self.controls
            .iter()
            .all(|c| matches!(c.status(), ControlStatus::Valid | ControlStatus::Disabled))
            && self.group_errors().is_empty()
    }

    /// Whether any control awaits an async evaluation.
    pub fn is_pending(&self) -> bool {
        self.controls
            .iter()
            .any(|c| c.status() == ControlStatus::Pending)
    }

    /// Error kinds reported for a control, including group errors shown on it.
    pub fn errors_of(&self, name: &str) -> Vec<ErrorKind> {
        let Some(control) = self.get(name) else {
            return Vec::new();
        };
        if control.disabled {
            return Vec::new();
        }
        let mut kinds = control.errors();
        kinds.extend(
            self.group_errors()
                .into_iter()
                .filter(|e| e.field.as_deref() == Some(name))
                .map(|e| e.kind),
        );
        kinds
    }

    /// Messages for a control, resolved through its error-message table.
    pub fn messages_of(&self, name: &str) -> Vec<String> {
        let Some(control) = self.get(name) else {
            return Vec::new();
        };
        self.errors_of(name)
            .into_iter()
            .map(|kind| control.schema.message_for(kind).to_string())
            .collect()
    }

    /// Messages for a control once the user has interacted with it.
    pub fn visible_errors(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(control) if control.touched || control.dirty => self.messages_of(name),
            _ => Vec::new(),
        }
    }

    /// All resolved messages, keyed by field.
    pub fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for control in &self.controls {
            for message in self.messages_of(control.name()) {
                errors.add(control.name(), message);
            }
        }
        for error in self.group_errors().into_iter().filter(|e| e.field.is_none()) {
            errors.add(ValidationErrors::NON_FIELD, error.kind.as_str());
        }
        errors
    }

    /// Values of the enabled controls.
    pub fn value(&self) -> Map<String, Value> {
        self.controls
            .iter()
            .filter(|c| !c.disabled)
            .map(|c| (c.name().to_string(), c.value.clone()))
            .collect()
    }

    /// Values of every control, disabled ones included.
    pub fn raw_value(&self) -> Map<String, Value> {
        self.controls
            .iter()
            .map(|c| (c.name().to_string(), c.value.clone()))
            .collect()
    }

    /// Hands out the latest not-yet-dispatched async evaluation per control.
    pub fn take_async_jobs(&mut self) -> Vec<AsyncJob> {
        self.controls
            .iter_mut()
            .filter(|c| c.pending && !c.dispatched && !c.disabled)
            .map(|c| {
                c.dispatched = true;
                AsyncJob {
                    control: c.schema.name.clone(),
                    generation: c.generation,
                    value: c.value.clone(),
                    validators: c.schema.async_validators.clone(),
                }
            })
            .collect()
    }

    /// Applies an async outcome if it belongs to the control's latest value.
    ///
    /// Returns `false` when the outcome was superseded and discarded.
    pub fn apply_async(&mut self, outcome: AsyncOutcome) -> bool {
        let Ok(control) = self.control_mut(&outcome.control) else {
            return false;
        };
        if !control.pending || control.generation != outcome.generation {
            debug!(
                control = %outcome.control,
                generation = outcome.generation,
                latest = control.generation,
                "Discarding superseded async validation"
            );
            return false;
        }
        control.pending = false;
        control.async_error = outcome.error;
        true
    }

    /// Runs every outstanding async evaluation and applies the results.
    pub async fn settle_async(&mut self) {
        loop {
            let jobs = self.take_async_jobs();
            if jobs.is_empty() {
                break;
            }
            let outcomes = futures::future::join_all(jobs.into_iter().map(AsyncJob::run)).await;
            for outcome in outcomes {
                self.apply_async(outcome);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use serde_json::json;

    use super::*;
    use crate::error::LookupError;
    use crate::schema::FieldKind;
    use crate::validation::{ExistenceCheck, ValidatorSpec};

    struct Taken;

    impl ExistenceCheck for Taken {
        fn exists<'a>(
            &'a self,
            identifier: &'a str,
        ) -> BoxFuture<'a, std::result::Result<bool, LookupError>> {
            Box::pin(async move { Ok(identifier == "f@g.com") })
        }
    }

    fn signup_config() -> FormConfiguration {
        FormConfiguration::new("Crie seu cadastro")
            .field(
                FieldSchema::new("nomeCompleto", "Nome Completo", FieldKind::Text)
                    .required()
                    .message(ErrorKind::Required, "Nome completo é obrigatório")
                    .validator(ValidatorSpec::Required),
            )
            .field(
                FieldSchema::new("email", "Email", FieldKind::Email)
                    .required()
                    .message(ErrorKind::Required, "Email é obrigatório")
                    .message(ErrorKind::AlreadyExists, "Email já cadastrado!")
                    .validator(ValidatorSpec::Required)
                    .validator(ValidatorSpec::Email)
                    .async_validator(AsyncValidatorSpec::AlreadyExists(Arc::new(Taken))),
            )
            .field(
                FieldSchema::new("senha", "Senha", FieldKind::Password)
                    .validator(ValidatorSpec::Required)
                    .validator(ValidatorSpec::MinLength(6)),
            )
            .field(
                FieldSchema::new("repitaSenha", "Repita a senha", FieldKind::Password)
                    .message(ErrorKind::Mismatch, "As senhas não coincidem")
                    .validator(ValidatorSpec::Required),
            )
    }

    fn signup_group() -> FormGroup {
        FormBuilder::new()
            .group_validator(GroupValidatorSpec::fields_match("senha", "repitaSenha"))
            .build(&signup_config())
    }

    fn fill_valid(group: &mut FormGroup) {
        group.set_value("nomeCompleto", "Ana Souza").unwrap();
        group.set_value("email", "ana@example.com").unwrap();
        group.set_value("senha", "segredo1").unwrap();
        group.set_value("repitaSenha", "segredo1").unwrap();
    }

    #[test]
    fn test_build_creates_one_control_per_field() {
        let group = signup_group();
        let names: Vec<&str> = group.controls().iter().map(Control::name).collect();
        assert_eq!(names, ["nomeCompleto", "email", "senha", "repitaSenha"]);
        assert_eq!(group.value_of("email"), Some(&json!("")));
        assert!(!group.is_valid());
    }

    #[test]
    fn test_builds_are_independent() {
        let config = signup_config();
        let builder = FormBuilder::new();
        let mut first = builder.build(&config);
        let second = builder.build(&config);

        first.set_value("nomeCompleto", "Ana").unwrap();
        assert_eq!(second.value_of("nomeCompleto"), Some(&json!("")));
        assert!(!second.get("nomeCompleto").unwrap().is_dirty());
    }

    #[test]
    fn test_unknown_field() {
        let mut group = signup_group();
        assert!(matches!(
            group.set_value("cpf", "1"),
            Err(FormError::UnknownField(name)) if name == "cpf"
        ));
    }

    #[test]
    fn test_errors_are_hidden_until_touched() {
        let mut group = signup_group();
        assert!(group.visible_errors("nomeCompleto").is_empty());

        group.mark_all_as_touched();
        assert_eq!(
            group.visible_errors("nomeCompleto"),
            vec!["Nome completo é obrigatório".to_string()]
        );
    }

    #[tokio::test]
    async fn test_valid_after_async_settles() {
        let mut group = signup_group();
        fill_valid(&mut group);

        assert!(group.is_pending());
        assert!(!group.is_valid());

        group.settle_async().await;
        assert!(!group.is_pending());
        assert!(group.is_valid());
    }

    #[tokio::test]
    async fn test_already_registered_email() {
        let mut group = signup_group();
        fill_valid(&mut group);
        group.set_value("email", "f@g.com").unwrap();
        group.settle_async().await;

        assert!(!group.is_valid());
        assert_eq!(group.messages_of("email"), vec!["Email já cadastrado!"]);
    }

    #[test]
    fn test_async_skipped_while_sync_fails() {
        let mut group = signup_group();
        group.set_value("email", "not-an-email").unwrap();

        assert_eq!(group.get("email").unwrap().status(), ControlStatus::Invalid);
        assert!(group.take_async_jobs().is_empty());
        assert_eq!(group.messages_of("email"), vec!["Campo inválido"]);
    }

    #[tokio::test]
    async fn test_superseded_async_result_is_discarded() {
        let mut group = signup_group();
        group.set_value("email", "f@g.com").unwrap();
        let stale = group.take_async_jobs();
        assert_eq!(stale.len(), 1);

        group.set_value("email", "ana@example.com").unwrap();
        for job in stale {
            let outcome = job.run().await;
            assert_eq!(outcome.error, Some(ErrorKind::AlreadyExists));
            assert!(!group.apply_async(outcome));
        }
        assert_eq!(group.get("email").unwrap().status(), ControlStatus::Pending);

        group.settle_async().await;
        assert_eq!(group.get("email").unwrap().status(), ControlStatus::Valid);
    }

    #[test]
    fn test_jobs_are_coalesced() {
        let mut group = signup_group();
        group.set_value("email", "a@example.com").unwrap();
        group.set_value("email", "ab@example.com").unwrap();
        group.set_value("email", "abc@example.com").unwrap();

        let jobs = group.take_async_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].value, json!("abc@example.com"));
        assert!(group.take_async_jobs().is_empty());
    }

    #[test]
    fn test_password_confirmation() {
        let mut group = signup_group();
        group.set_value("senha", "segredo1").unwrap();
        assert!(group.group_errors().is_empty());

        group.set_value("repitaSenha", "segredo2").unwrap();
        assert_eq!(group.errors_of("repitaSenha"), vec![ErrorKind::Mismatch]);
        assert_eq!(group.messages_of("repitaSenha"), vec!["As senhas não coincidem"]);

        group.set_value("repitaSenha", "segredo1").unwrap();
        assert!(group.group_errors().is_empty());
    }

    #[test]
    fn test_disabled_controls_are_excluded() {
        let mut group = signup_group();
        group.disable("nomeCompleto").unwrap();
        assert_eq!(
            group.get("nomeCompleto").unwrap().status(),
            ControlStatus::Disabled
        );
        assert!(!group.value().contains_key("nomeCompleto"));
        assert!(group.raw_value().contains_key("nomeCompleto"));

        let err = group.set_value("nomeCompleto", "Ana").unwrap_err();
        assert!(matches!(err, FormError::Disabled(ref name) if name == "nomeCompleto"));
        let patch = json!({"nomeCompleto": "Ana", "email": "ana@example.com"});
        group.patch_value(patch.as_object().unwrap());
        assert_eq!(group.text_of("nomeCompleto"), "");
        assert_eq!(group.text_of("email"), "ana@example.com");
        assert!(!group.get("nomeCompleto").unwrap().is_dirty());

        group.enable("nomeCompleto").unwrap();
        assert_eq!(
            group.get("nomeCompleto").unwrap().status(),
            ControlStatus::Invalid
        );
    }

    #[test]
    fn test_patch_value_ignores_unknown_keys() {
        let mut group = signup_group();
        let values = json!({"nomeCompleto": "Ana", "foto": "data:image/png;base64,"});
        group.patch_value(values.as_object().unwrap());

        assert_eq!(group.text_of("nomeCompleto"), "Ana");
        assert!(group.get("foto").is_none());
    }

    #[test]
    fn test_mark_as_touched_reveals_one_field() {
        let mut group = signup_group();
        assert!(group.visible_errors("nomeCompleto").is_empty());

        group.mark_as_touched("nomeCompleto").unwrap();
        assert_eq!(
            group.visible_errors("nomeCompleto"),
            vec!["Nome completo é obrigatório"]
        );
        assert!(group.visible_errors("email").is_empty());
        assert!(matches!(
            group.mark_as_touched("foto"),
            Err(FormError::UnknownField(_))
        ));
    }

    #[test]
    fn test_load_values_is_not_dirty() {
        let mut group = signup_group();
        let saved = json!({"nomeCompleto": "", "email": "ana@example.com"});
        group.load_values(saved.as_object().unwrap());

        assert_eq!(group.text_of("email"), "ana@example.com");
        assert!(!group.get("email").unwrap().is_dirty());
        assert!(group.visible_errors("nomeCompleto").is_empty());
    }

    #[test]
    fn test_errors_collects_messages() {
        let group = signup_group();
        let errors = group.errors();
        assert_eq!(
            errors.get("nomeCompleto"),
            Some(&vec!["Nome completo é obrigatório".to_string()])
        );
        assert!(errors.get("repitaSenha").is_some());
    }
}
