//! # freelando-signup
//!
//! The freelancer registration wizard of the Freelando marketplace.
//!
//! Four steps share one [`DraftStore`]:
//! 1. [`AreaOfWorkPage`]: area of work and experience level
//! 2. [`PersonalDataPage`]: identity, region/city and credentials
//! 3. [`ProfilePage`]: photo, summary, skills, languages and links
//! 4. [`ConfirmationPage`]: read-only summary
//!
//! External services sit behind traits ([`GeographyLookup`],
//! [`ExistenceCheck`](freelando_forms::ExistenceCheck), [`DraftStorage`]) with
//! in-process reference implementations.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use freelando_signup::{
//!     signup_registry, AreaOfWorkPage, DraftStore, MemoryStorage, RegisteredEmails, SignupDeps,
//!     StepOutcome, WizardStep,
//! };
//!
//! # async fn run() -> freelando_signup::Result<()> {
//! let draft = DraftStore::open(MemoryStorage::new())?;
//! let deps = SignupDeps {
//!     email_lookup: Arc::new(RegisteredEmails::new().with_latency(Duration::ZERO)),
//! };
//!
//! let mut page = AreaOfWorkPage::open(&signup_registry(), &deps, &draft)?;
//! page.set("areaAtuacao", "design")?;
//! page.set("nivelExperiencia", "iniciante")?;
//!
//! let outcome = page.next(&draft).await?;
//! assert_eq!(outcome, StepOutcome::Moved(WizardStep::PersonalData));
//! # Ok(())
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(run()).unwrap();
//! ```

mod draft;
mod emails;
mod error;
mod forms;
mod geography;
mod photo;
mod steps;

pub use draft::{DraftStorage, DraftStore, FileStorage, MemoryStorage, RegistrationDraft, DRAFT_KEY};
pub use emails::{RegisteredEmails, DEFAULT_LATENCY, REGISTERED_EMAILS};
pub use error::{Result, SignupError};
pub use forms::{
    area_form, personal_data_form, profile_form, signup_registry, SignupDeps, AREA_FORM,
    LANGUAGES, LANGUAGE_LEVELS, PERSONAL_DATA_FORM, PROFILE_FORM, SKILLS, SUMMARY_LIMIT,
};
pub use geography::{
    region_choices, GeographyLookup, Locality, LocalityOptions, Region, RetryingGeography,
    StaticGeography, DEFAULT_RETRIES,
};
pub use photo::PhotoUpload;
pub use steps::{
    AreaOfWorkPage, ConfirmationPage, Language, PersonalDataPage, ProfilePage,
    RegistrationSummary, StepOutcome, WizardStep,
};
