//! # freelando-forms
//!
//! Declarative form configuration for multi-step wizards.
//!
//! This crate provides:
//! - Validators declared as data (sync, async and group-level)
//! - Field and form schemas
//! - A registry of configuration factories
//! - Live form groups with touched/dirty/validity state
//! - Dependent fields whose options follow another field's value
//! - Bootstrap 5 rendering with inline errors
//!
//! ## Quick Start
//!
//! ```rust
//! use freelando_forms::{
//!     ErrorKind, FieldKind, FieldSchema, FormBuilder, FormConfiguration, FormRegistry,
//!     ValidatorSpec,
//! };
//!
//! let mut registry = FormRegistry::new();
//! registry.register("contato", |_: &()| {
//!     Ok(FormConfiguration::new("Contato").field(
//!         FieldSchema::new("email", "Email", FieldKind::Email)
//!             .required()
//!             .message(ErrorKind::Required, "Email é obrigatório")
//!             .validator(ValidatorSpec::Required)
//!             .validator(ValidatorSpec::Email),
//!     ))
//! });
//!
//! let config = registry.resolve("contato", &()).expect("registered");
//! let mut group = FormBuilder::new().build(&config);
//! assert!(!group.is_valid());
//!
//! group.mark_all_as_touched();
//! assert_eq!(group.visible_errors("email"), vec!["Email é obrigatório"]);
//!
//! group.set_value("email", "ana@example.com").expect("known field");
//! assert!(group.is_valid());
//! ```
//!
//! ## Password confirmation
//!
//! ```rust
//! use freelando_forms::{
//!     FieldKind, FieldSchema, FormBuilder, FormConfiguration, GroupValidatorSpec,
//! };
//!
//! let config = FormConfiguration::new("Senha")
//!     .field(FieldSchema::new("senha", "Senha", FieldKind::Password))
//!     .field(FieldSchema::new("repitaSenha", "Repita a senha", FieldKind::Password));
//!
//! let mut group = FormBuilder::new()
//!     .group_validator(GroupValidatorSpec::fields_match("senha", "repitaSenha"))
//!     .build(&config);
//!
//! group.set_value("senha", "segredo1").unwrap();
//! group.set_value("repitaSenha", "segredo2").unwrap();
//! assert!(!group.is_valid());
//! ```
//!
//! ## Dependent fields
//!
//! See [`DependentFieldCoordinator`]: selecting a state issues a fetch for its
//! cities, and only the answer for the latest selection is applied.

pub mod dependent;
mod error;
mod group;
mod registry;
pub mod render;
mod schema;
pub mod validation;

pub use dependent::{collation_key, DependentFieldCoordinator, DependentFieldLink, FetchTicket, LinkState, OptionsFetcher};
pub use error::{FormError, LookupError, Result, ValidationErrors};
pub use group::{AsyncJob, AsyncOutcome, Control, ControlStatus, FormBuilder, FormGroup};
pub use registry::{ConfigFactory, FormRegistry};
pub use schema::{Choice, FieldKind, FieldSchema, FormConfiguration, LayoutWidth, FALLBACK_MESSAGE};
pub use validation::{
    AsyncValidatorSpec, ErrorKind, ExistenceCheck, GroupError, GroupValidatorSpec, ValidatorSpec,
};

/// Boxed future returned by the lookup traits.
pub use futures::future::BoxFuture;
