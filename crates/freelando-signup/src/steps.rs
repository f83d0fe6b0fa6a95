//! Step controllers of the registration wizard.
//!
//! Every step follows the same navigation rules:
//! - `previous()` saves what was typed so far and goes back, valid or not.
//! - `next()` waits for async validation, then either saves and advances or
//!   marks every control touched and stays, leaving the draft untouched.

use std::collections::HashMap;
use std::sync::Arc;

use freelando_forms::{
    render, Choice, DependentFieldCoordinator, DependentFieldLink, ErrorKind, FormBuilder,
    FormConfiguration, FormGroup, FormRegistry, GroupValidatorSpec, LinkState, ValidationErrors,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::draft::{DraftStore, RegistrationDraft};
use crate::error::Result;
use crate::forms::{SignupDeps, AREA_FORM, PERSONAL_DATA_FORM, PROFILE_FORM, SKILLS, SUMMARY_LIMIT};
use crate::geography::{region_choices, GeographyLookup, LocalityOptions};
use crate::photo::PhotoUpload;

/// The wizard's pages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WizardStep {
    /// Area of work and experience.
    AreaOfWork,
    /// Identity, location and credentials.
    PersonalData,
    /// Public profile.
    Profile,
    /// Read-only summary.
    Confirmation,
}

impl WizardStep {
    /// Route of the page.
    pub const fn path(self) -> &'static str {
        match self {
            Self::AreaOfWork => "/cadastro/area-atuacao",
            Self::PersonalData => "/cadastro/dados-pessoais",
            Self::Profile => "/cadastro/perfil",
            Self::Confirmation => "/cadastro/confirmacao",
        }
    }

    /// Registry id of the step's form, if it has one.
    pub const fn form_id(self) -> Option<&'static str> {
        match self {
            Self::AreaOfWork => Some(AREA_FORM),
            Self::PersonalData => Some(PERSONAL_DATA_FORM),
            Self::Profile => Some(PROFILE_FORM),
            Self::Confirmation => None,
        }
    }

    /// The step before this one. The first step is its own predecessor.
    pub const fn previous(self) -> Self {
        match self {
            Self::AreaOfWork | Self::PersonalData => Self::AreaOfWork,
            Self::Profile => Self::PersonalData,
            Self::Confirmation => Self::Profile,
        }
    }

    /// The step after this one. The last step is its own successor.
    pub const fn next(self) -> Self {
        match self {
            Self::AreaOfWork => Self::PersonalData,
            Self::PersonalData => Self::Profile,
            Self::Profile | Self::Confirmation => Self::Confirmation,
        }
    }
}

/// Result of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The draft was saved and the wizard moved to this step.
    Moved(WizardStep),
    /// Validation failed; the messages to show, by field.
    Blocked(ValidationErrors),
}

/// Keeps only the named keys of a group's values.
fn fragment(group: &FormGroup, keys: &[&str]) -> RegistrationDraft {
    let mut values = group.raw_value();
    values.retain(|key, _| keys.iter().any(|k| *k == key));
    values
}

fn go_back(step: WizardStep, draft: &DraftStore, saved: RegistrationDraft) -> Result<StepOutcome> {
    draft.update(saved)?;
    let target = step.previous();
    info!(from = ?step, to = ?target, "Going back");
    Ok(StepOutcome::Moved(target))
}

/// Validates the group and advances when it and `blockers` are clean.
async fn go_next(
    step: WizardStep,
    group: &mut FormGroup,
    draft: &DraftStore,
    keys: &[&str],
    mut blockers: ValidationErrors,
) -> Result<StepOutcome> {
    group.settle_async().await;

    if group.is_valid() && blockers.is_empty() {
        draft.update(fragment(group, keys))?;
        let target = step.next();
        info!(from = ?step, to = ?target, "Advancing");
        return Ok(StepOutcome::Moved(target));
    }

    group.mark_all_as_touched();
    blockers.merge(group.errors());
    info!(step = ?step, fields = blockers.len(), "Step blocked by validation");
    Ok(StepOutcome::Blocked(blockers))
}

/// Opens a step's form with the draft's values restored.
fn open_form(
    registry: &FormRegistry<SignupDeps>,
    deps: &SignupDeps,
    id: &str,
    builder: &FormBuilder,
    draft: &DraftStore,
) -> Result<(FormConfiguration, FormGroup)> {
    let config = registry.resolve(id, deps)?;
    let mut group = builder.build(&config);
    group.load_values(&draft.get());
    Ok((config, group))
}

const AREA_KEYS: [&str; 2] = ["areaAtuacao", "nivelExperiencia"];

/// First step: area of work and experience level.
#[derive(Debug)]
pub struct AreaOfWorkPage {
    config: FormConfiguration,
    group: FormGroup,
}

impl AreaOfWorkPage {
    /// Opens the step with the draft's values.
    pub fn open(
        registry: &FormRegistry<SignupDeps>,
        deps: &SignupDeps,
        draft: &DraftStore,
    ) -> Result<Self> {
        let (config, group) = open_form(registry, deps, AREA_FORM, &FormBuilder::new(), draft)?;
        Ok(Self { config, group })
    }

    /// The live form.
    pub fn group(&self) -> &FormGroup {
        &self.group
    }

    /// Sets a field as the user would.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        Ok(self.group.set_value(name, value)?)
    }

    /// Validates, saves and moves to the personal-data step.
    pub async fn next(&mut self, draft: &DraftStore) -> Result<StepOutcome> {
        go_next(
            WizardStep::AreaOfWork,
            &mut self.group,
            draft,
            &AREA_KEYS,
            ValidationErrors::new(),
        )
        .await
    }

    /// Renders the step.
    pub fn render(&self) -> String {
        render::render_form(
            &self.config,
            &self.group,
            &HashMap::new(),
            WizardStep::AreaOfWork.path(),
        )
    }
}

/// `repitaSenha` only exists to be compared and is never saved.
const PERSONAL_DATA_KEYS: [&str; 6] = ["nomeCompleto", "cpf", "estado", "cidade", "email", "senha"];

/// Second step: identity, location and credentials.
#[derive(Debug)]
pub struct PersonalDataPage {
    config: FormConfiguration,
    group: FormGroup,
    regions: Vec<Choice>,
    cities: DependentFieldCoordinator,
}

impl PersonalDataPage {
    /// Opens the step, loading the regions and, when a region was already
    /// chosen, starting to load its cities.
    pub async fn open(
        registry: &FormRegistry<SignupDeps>,
        deps: &SignupDeps,
        geography: Arc<dyn GeographyLookup>,
        draft: &DraftStore,
    ) -> Result<Self> {
        let builder =
            FormBuilder::new().group_validator(GroupValidatorSpec::fields_match("senha", "repitaSenha"));
        let (config, mut group) = open_form(registry, deps, PERSONAL_DATA_FORM, &builder, draft)?;

        let regions = match geography.list_regions().await {
            Ok(regions) => region_choices(&regions),
            Err(e) => {
                warn!(error = %e, "Could not load regions");
                Vec::new()
            }
        };

        let mut cities =
            DependentFieldCoordinator::new("estado", "cidade", Arc::new(LocalityOptions::new(geography)));
        cities.attach(&mut group)?;

        Ok(Self {
            config,
            group,
            regions,
            cities,
        })
    }

    /// The live form.
    pub fn group(&self) -> &FormGroup {
        &self.group
    }

    /// Region choices, sorted by name.
    pub fn regions(&self) -> &[Choice] {
        &self.regions
    }

    /// State of the city select.
    pub fn cities(&self) -> &DependentFieldLink {
        self.cities.link()
    }

    /// Sets a field as the user would. Changing `estado` reloads the cities.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        if name == self.cities.link().source() {
            let value = value.into();
            self.cities
                .select(&mut self.group, value.as_str().unwrap_or(""))?;
        } else {
            self.group.set_value(name, value)?;
        }
        Ok(())
    }

    /// Selects a region by code.
    pub fn select_region(&mut self, code: &str) -> Result<()> {
        self.set("estado", code)
    }

    /// Waits for outstanding city loads.
    pub async fn load_cities(&mut self) -> Result<()> {
        Ok(self.cities.settle(&mut self.group).await?)
    }

    /// Re-requests the cities after a failed load.
    pub fn retry_cities(&mut self) -> Result<()> {
        Ok(self.cities.retry(&mut self.group)?)
    }

    /// Saves what was typed and goes back to the area step.
    pub fn previous(&self, draft: &DraftStore) -> Result<StepOutcome> {
        go_back(
            WizardStep::PersonalData,
            draft,
            fragment(&self.group, &PERSONAL_DATA_KEYS),
        )
    }

    /// Validates, saves and moves to the profile step.
    ///
    /// The step is blocked unless the city is one of the loaded options of
    /// the chosen region.
    pub async fn next(&mut self, draft: &DraftStore) -> Result<StepOutcome> {
        self.load_cities().await?;

        let mut blockers = ValidationErrors::new();
        let region_chosen = !self.group.text_of("estado").trim().is_empty();
        let city = self.group.text_of("cidade");
        let city_listed = self.cities.link().state() == LinkState::Loaded
            && self.cities.link().options().iter().any(|c| c.value == city);
        if region_chosen && !city_listed {
            let message = self
                .config
                .get("cidade")
                .map(|f| f.message_for(ErrorKind::Required).to_string())
                .unwrap_or_default();
            blockers.add("cidade", message);
        }

        go_next(
            WizardStep::PersonalData,
            &mut self.group,
            draft,
            &PERSONAL_DATA_KEYS,
            blockers,
        )
        .await
    }

    /// Renders the step with region and city options.
    pub fn render(&self) -> String {
        let mut options = HashMap::new();
        options.insert("estado".to_string(), self.regions.clone());
        options.insert("cidade".to_string(), self.cities.link().options().to_vec());
        render::render_form(
            &self.config,
            &self.group,
            &options,
            WizardStep::PersonalData.path(),
        )
    }
}

/// A spoken language and the proficiency in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Language name.
    pub nome: String,
    /// Proficiency level.
    pub nivel: String,
}

impl Language {
    /// Creates an entry.
    pub fn new(nome: impl Into<String>, nivel: impl Into<String>) -> Self {
        Self {
            nome: nome.into(),
            nivel: nivel.into(),
        }
    }

    /// Portuguese at native level, always listed first.
    pub fn native() -> Self {
        Self::new("Português", "Nativo")
    }
}

const PROFILE_KEYS: [&str; 6] = [
    "foto",
    "resumo",
    "habilidadesSelecionadas",
    "idiomas",
    "portfolio",
    "linkedin",
];

/// Third step: public profile.
#[derive(Debug)]
pub struct ProfilePage {
    config: FormConfiguration,
    group: FormGroup,
}

impl ProfilePage {
    /// Opens the step with the draft's values. The language list always
    /// starts with [`Language::native`].
    pub fn open(
        registry: &FormRegistry<SignupDeps>,
        deps: &SignupDeps,
        draft: &DraftStore,
    ) -> Result<Self> {
        let (config, mut group) = open_form(registry, deps, PROFILE_FORM, &FormBuilder::new(), draft)?;

        let mut languages: Vec<Language> = group
            .value_of("idiomas")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        if languages.first().map(|l| l.nome.as_str()) != Some("Português") {
            languages.insert(0, Language::native());
        }
        let mut seed = RegistrationDraft::new();
        seed.insert("idiomas".to_string(), serde_json::to_value(&languages)?);
        group.load_values(&seed);

        Ok(Self { config, group })
    }

    /// The live form.
    pub fn group(&self) -> &FormGroup {
        &self.group
    }

    /// Sets a field as the user would.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        Ok(self.group.set_value(name, value)?)
    }

    /// Characters left before the summary reaches its suggested length.
    /// Negative once it is exceeded.
    pub fn remaining_characters(&self) -> i64 {
        let used = self.group.text_of("resumo").chars().count();
        SUMMARY_LIMIT.saturating_sub(i64::try_from(used).unwrap_or(i64::MAX))
    }

    /// Selected skills, in the order they are offered.
    pub fn selected_skills(&self) -> Vec<String> {
        let selected = self.group.value_of("habilidadesSelecionadas");
        SKILLS
            .iter()
            .filter(|skill| match selected {
                Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some(**skill)),
                _ => false,
            })
            .map(|skill| (*skill).to_string())
            .collect()
    }

    /// Selects or deselects a skill. Returns whether it is now selected;
    /// skills not on offer are never selected.
    pub fn toggle_skill(&mut self, skill: &str) -> Result<bool> {
        if !SKILLS.iter().any(|s| *s == skill) {
            return Ok(false);
        }
        let mut selected = self.selected_skills();
        let now_selected = if let Some(pos) = selected.iter().position(|s| s == skill) {
            selected.remove(pos);
            false
        } else {
            selected.push(skill.to_string());
            true
        };
        let ordered: Vec<&str> = SKILLS
            .iter()
            .copied()
            .filter(|s| selected.iter().any(|x| x == *s))
            .collect();
        self.group.set_value("habilidadesSelecionadas", json!(ordered))?;
        Ok(now_selected)
    }

    /// Declared languages.
    pub fn languages(&self) -> Vec<Language> {
        self.group
            .value_of("idiomas")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    fn set_languages(&mut self, languages: &[Language]) -> Result<()> {
        self.group
            .set_value("idiomas", serde_json::to_value(languages)?)?;
        Ok(())
    }

    /// Appends a language.
    pub fn add_language(&mut self, nome: &str, nivel: &str) -> Result<()> {
        let mut languages = self.languages();
        languages.push(Language::new(nome, nivel));
        self.set_languages(&languages)
    }

    /// Removes the language at `index`. The leading Portuguese entry and
    /// indices past the end are left alone; returns whether anything changed.
    pub fn remove_language(&mut self, index: usize) -> Result<bool> {
        let mut languages = self.languages();
        if index >= languages.len() || (index == 0 && languages[0].nome == "Português") {
            return Ok(false);
        }
        languages.remove(index);
        self.set_languages(&languages)?;
        Ok(true)
    }

    /// Uses an uploaded image as the profile photo.
    pub fn set_photo(&mut self, upload: &PhotoUpload) -> Result<()> {
        let url = upload.to_data_url()?;
        self.group.set_value("foto", url)?;
        Ok(())
    }

    /// The photo as a data URL, if one was chosen.
    pub fn photo_preview(&self) -> Option<&str> {
        Some(self.group.text_of("foto")).filter(|url| !url.is_empty())
    }

    /// Saves what was typed and goes back to the personal-data step.
    pub fn previous(&self, draft: &DraftStore) -> Result<StepOutcome> {
        go_back(WizardStep::Profile, draft, fragment(&self.group, &PROFILE_KEYS))
    }

    /// Validates, saves and moves to the confirmation step.
    ///
    /// Every language needs both a name and a level.
    pub async fn next(&mut self, draft: &DraftStore) -> Result<StepOutcome> {
        let mut blockers = ValidationErrors::new();
        if self
            .languages()
            .iter()
            .any(|l| l.nome.trim().is_empty() || l.nivel.trim().is_empty())
        {
            blockers.add("idiomas", "Informe o idioma e o nível");
        }

        go_next(
            WizardStep::Profile,
            &mut self.group,
            draft,
            &PROFILE_KEYS,
            blockers,
        )
        .await
    }

    /// Renders the step.
    pub fn render(&self) -> String {
        render::render_form(
            &self.config,
            &self.group,
            &HashMap::new(),
            WizardStep::Profile.path(),
        )
    }
}

/// Everything collected by the wizard, as shown for confirmation.
///
/// The password is not part of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSummary {
    /// Area of work.
    pub area_atuacao: Option<String>,
    /// Experience level.
    pub nivel_experiencia: Option<String>,
    /// Full name.
    pub nome_completo: Option<String>,
    /// CPF as typed.
    pub cpf: Option<String>,
    /// Region code.
    pub estado: Option<String>,
    /// Locality name.
    pub cidade: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Photo as a data URL.
    pub foto: Option<String>,
    /// Short bio.
    pub resumo: Option<String>,
    /// Selected skills.
    pub habilidades_selecionadas: Vec<String>,
    /// Spoken languages.
    pub idiomas: Vec<Language>,
    /// Portfolio address.
    pub portfolio: Option<String>,
    /// LinkedIn profile address.
    pub linkedin: Option<String>,
}

impl RegistrationSummary {
    /// Reads whatever the draft holds.
    ///
    /// Scalars are shown as text. List entries of the wrong shape are
    /// skipped, so a hand-edited or older draft still renders.
    pub fn from_draft(draft: &RegistrationDraft) -> Self {
        Self {
            area_atuacao: text(draft, "areaAtuacao"),
            nivel_experiencia: text(draft, "nivelExperiencia"),
            nome_completo: text(draft, "nomeCompleto"),
            cpf: text(draft, "cpf"),
            estado: text(draft, "estado"),
            cidade: text(draft, "cidade"),
            email: text(draft, "email"),
            foto: text(draft, "foto"),
            resumo: text(draft, "resumo"),
            habilidades_selecionadas: entries(draft, "habilidadesSelecionadas"),
            idiomas: entries(draft, "idiomas"),
            portfolio: text(draft, "portfolio"),
            linkedin: text(draft, "linkedin"),
        }
    }
}

fn text(draft: &RegistrationDraft, key: &str) -> Option<String> {
    match draft.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => {
            warn!(key, value = %other, "Ignoring draft value that is not text");
            None
        }
    }
}

fn entries<T: DeserializeOwned>(draft: &RegistrationDraft, key: &str) -> Vec<T> {
    let Some(Value::Array(items)) = draft.get(key) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key, error = %e, "Skipping malformed draft entry");
                None
            }
        })
        .collect()
}

/// Last step: a read-only view of the draft.
#[derive(Debug, Clone)]
pub struct ConfirmationPage {
    summary: RegistrationSummary,
}

impl ConfirmationPage {
    /// Reads the current draft.
    pub fn open(draft: &DraftStore) -> Self {
        Self {
            summary: RegistrationSummary::from_draft(&draft.get()),
        }
    }

    /// What was collected.
    pub fn summary(&self) -> &RegistrationSummary {
        &self.summary
    }

    /// Goes back to the profile step. Nothing is saved.
    pub fn previous(&self) -> StepOutcome {
        StepOutcome::Moved(WizardStep::Confirmation.previous())
    }
}
