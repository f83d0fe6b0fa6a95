//! Configurations of the wizard's step forms.

use std::sync::Arc;

use freelando_forms::{
    AsyncValidatorSpec, Choice, ErrorKind, ExistenceCheck, FieldKind, FieldSchema,
    FormConfiguration, FormRegistry, LayoutWidth, Result, ValidatorSpec,
};

/// Registry id of the area-of-work step.
pub const AREA_FORM: &str = "areaAtuacao";
/// Registry id of the personal-data step.
pub const PERSONAL_DATA_FORM: &str = "dadosPessoais";
/// Registry id of the profile step.
pub const PROFILE_FORM: &str = "perfil";

/// Skills offered on the profile step.
pub const SKILLS: [&str; 4] = ["Fullstack", "Front-end", "React", "Angular"];

/// Proficiency levels a language can be declared at.
pub const LANGUAGE_LEVELS: [&str; 5] = ["Básico", "Intermediário", "Avançado", "Fluente", "Nativo"];

/// Languages offered on the profile step.
pub const LANGUAGES: [&str; 3] = ["Português", "Inglês", "Espanhol"];

/// Length the summary counter counts down from.
pub const SUMMARY_LIMIT: i64 = 70;

const PERSONAL_DATA_DESCRIPTION: &str = "Crie seu perfil gratuitamente para começar a trabalhar \
com os melhores freelancers. Em seguida, você poderá dar mais detalhes sobre suas demandas e \
sobre sua forma de trabalho.";

/// Collaborators the step factories close over.
#[derive(Clone)]
pub struct SignupDeps {
    /// Answers whether an email is already registered.
    pub email_lookup: Arc<dyn ExistenceCheck>,
}

impl std::fmt::Debug for SignupDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupDeps").finish_non_exhaustive()
    }
}

/// The registry with every step of the wizard.
pub fn signup_registry() -> FormRegistry<SignupDeps> {
    FormRegistry::<SignupDeps>::new()
        .with(AREA_FORM, |_: &SignupDeps| Ok(area_form()))
        .with(PERSONAL_DATA_FORM, |deps: &SignupDeps| {
            Ok(personal_data_form(Arc::clone(&deps.email_lookup)))
        })
        .with(PROFILE_FORM, |_: &SignupDeps| profile_form())
}

/// Area of work and experience level.
pub fn area_form() -> FormConfiguration {
    FormConfiguration::new("Qual é a sua área de atuação?")
        .description("Escolha a área e o seu nível de experiência.")
        .field(
            FieldSchema::new("areaAtuacao", "Área de atuação", FieldKind::Radio)
                .required()
                .message(ErrorKind::Required, "Área de atuação é obrigatória")
                .validator(ValidatorSpec::Required)
                .choices([
                    Choice::new("ti", "TI e Programação"),
                    Choice::new("design", "Design e Multimídia"),
                    Choice::new("revisao", "Revisão"),
                    Choice::new("traducao", "Tradução"),
                    Choice::new("transcricao", "Transcrição"),
                    Choice::new("marketing", "Marketing"),
                ]),
        )
        .field(
            FieldSchema::new("nivelExperiencia", "Nível de experiência", FieldKind::Radio)
                .required()
                .message(ErrorKind::Required, "Nível de experiência é obrigatório")
                .validator(ValidatorSpec::Required)
                .choices([
                    Choice::new("iniciante", "Iniciante (1 a 3 anos)"),
                    Choice::new("intermediario", "Intermediário (3 a 6 anos)"),
                    Choice::new("avancado", "Avançado (6 anos ou mais)"),
                ]),
        )
}

/// Personal data. The email is checked against `email_lookup`.
pub fn personal_data_form(email_lookup: Arc<dyn ExistenceCheck>) -> FormConfiguration {
    FormConfiguration::new("Crie seu cadastro")
        .description(PERSONAL_DATA_DESCRIPTION)
        .field(
            FieldSchema::new("nomeCompleto", "Nome Completo", FieldKind::Text)
                .required()
                .message(ErrorKind::Required, "Nome completo é obrigatório")
                .validator(ValidatorSpec::Required),
        )
        .field(
            FieldSchema::new("cpf", "CPF", FieldKind::Text)
                .required()
                .placeholder("123.456.789-00")
                .message(ErrorKind::Required, "CPF é obrigatório")
                .message(ErrorKind::ChecksumInvalid, "CPF inválido")
                .validator(ValidatorSpec::Required)
                .validator(ValidatorSpec::Cpf),
        )
        .field(
            FieldSchema::new("estado", "Estado", FieldKind::Select)
                .required()
                .placeholder("Selecione")
                .message(ErrorKind::Required, "Estado é obrigatório")
                .validator(ValidatorSpec::Required)
                .width(LayoutWidth::Half),
        )
        .field(
            FieldSchema::new("cidade", "Cidade", FieldKind::Select)
                .required()
                .placeholder("Selecione")
                .message(ErrorKind::Required, "Cidade é obrigatória")
                .validator(ValidatorSpec::Required)
                .width(LayoutWidth::Half),
        )
        .field(
            FieldSchema::new("email", "Email", FieldKind::Email)
                .required()
                .message(ErrorKind::Required, "Email é obrigatório")
                .message(ErrorKind::InvalidEmail, "Email inválido")
                .message(ErrorKind::AlreadyExists, "Email já cadastrado!")
                .validator(ValidatorSpec::Required)
                .validator(ValidatorSpec::Email)
                .async_validator(AsyncValidatorSpec::AlreadyExists(email_lookup)),
        )
        .field(
            FieldSchema::new("senha", "Senha", FieldKind::Password)
                .required()
                .message(ErrorKind::Required, "Senha é obrigatória")
                .message(ErrorKind::MinLength, "Senha deve ter pelo menos 6 caracteres")
                .validator(ValidatorSpec::Required)
                .validator(ValidatorSpec::MinLength(6))
                .width(LayoutWidth::Half),
        )
        .field(
            FieldSchema::new("repitaSenha", "Repita a senha", FieldKind::Password)
                .required()
                .message(ErrorKind::Required, "Confirmação de senha é obrigatória")
                .message(ErrorKind::Mismatch, "As senhas não coincidem")
                .validator(ValidatorSpec::Required)
                .width(LayoutWidth::Half),
        )
}

/// Public profile.
pub fn profile_form() -> Result<FormConfiguration> {
    Ok(FormConfiguration::new("Monte seu perfil")
        .description("Conte um pouco sobre você e o seu trabalho.")
        .field(FieldSchema::new("foto", "Foto de perfil", FieldKind::File))
        .field(
            FieldSchema::new("resumo", "Resumo", FieldKind::Textarea)
                .required()
                .message(ErrorKind::Required, "Resumo é obrigatório")
                .message(ErrorKind::MinLength, "Resumo deve ter pelo menos 10 caracteres")
                .validator(ValidatorSpec::Required)
                .validator(ValidatorSpec::MinLength(10)),
        )
        .field(
            FieldSchema::new("habilidadesSelecionadas", "Habilidades", FieldKind::MultiSelect)
                .required()
                .message(ErrorKind::Required, "Selecione pelo menos uma habilidade")
                .validator(ValidatorSpec::Required)
                .choices(SKILLS.iter().map(|s| Choice::new(*s, *s))),
        )
        .field(FieldSchema::new("idiomas", "Idiomas", FieldKind::List))
        .field(
            FieldSchema::new("portfolio", "Portfólio", FieldKind::Text)
                .required()
                .placeholder("https://")
                .message(ErrorKind::Required, "Portfólio é obrigatório")
                .message(ErrorKind::PatternMismatch, "Informe um endereço começando com http:// ou https://")
                .validator(ValidatorSpec::Required)
                .validator(ValidatorSpec::pattern(r"https?://.+")?)
                .width(LayoutWidth::Half),
        )
        .field(
            FieldSchema::new("linkedin", "LinkedIn", FieldKind::Text)
                .required()
                .placeholder("https://www.linkedin.com/in/")
                .message(ErrorKind::Required, "LinkedIn é obrigatório")
                .message(ErrorKind::PatternMismatch, "Informe o endereço do seu perfil no LinkedIn")
                .validator(ValidatorSpec::Required)
                .validator(ValidatorSpec::pattern(r"https://(www\.)?linkedin\.com/.+")?)
                .width(LayoutWidth::Half),
        ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::emails::RegisteredEmails;
    use freelando_forms::{FormBuilder, FALLBACK_MESSAGE};

    fn deps() -> SignupDeps {
        SignupDeps {
            email_lookup: Arc::new(RegisteredEmails::new().with_latency(std::time::Duration::ZERO)),
        }
    }

    #[test]
    fn test_registry_has_every_step() {
        let registry = signup_registry();
        assert_eq!(registry.ids(), vec!["areaAtuacao", "dadosPessoais", "perfil"]);
        assert!(registry.resolve("confirmacao", &deps()).is_err());
    }

    #[test]
    fn test_personal_data_layout() {
        let config = signup_registry().resolve(PERSONAL_DATA_FORM, &deps()).unwrap();
        assert_eq!(config.title, "Crie seu cadastro");

        let names: Vec<&str> = config.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["nomeCompleto", "cpf", "estado", "cidade", "email", "senha", "repitaSenha"]
        );

        let cpf = config.get("cpf").unwrap();
        assert_eq!(cpf.placeholder, "123.456.789-00");
        assert_eq!(cpf.message_for(ErrorKind::ChecksumInvalid), "CPF inválido");
        assert_eq!(cpf.message_for(ErrorKind::PatternMismatch), FALLBACK_MESSAGE);

        assert_eq!(config.get("estado").unwrap().width, LayoutWidth::Half);
        assert_eq!(config.get("email").unwrap().async_validators.len(), 1);
    }

    #[test]
    fn test_profile_patterns() {
        let config = profile_form().unwrap();
        let mut group = FormBuilder::new().build(&config);

        group.set_value("portfolio", "ftp://example.com").unwrap();
        assert_eq!(group.errors_of("portfolio"), vec![ErrorKind::PatternMismatch]);
        group.set_value("portfolio", "https://ana.dev").unwrap();
        assert!(group.errors_of("portfolio").is_empty());

        group.set_value("linkedin", "https://example.com/ana").unwrap();
        assert_eq!(group.errors_of("linkedin"), vec![ErrorKind::PatternMismatch]);
        group.set_value("linkedin", "https://www.linkedin.com/in/ana").unwrap();
        assert!(group.errors_of("linkedin").is_empty());

        assert_eq!(
            group.errors_of("habilidadesSelecionadas"),
            vec![ErrorKind::Required]
        );
        group
            .set_value("habilidadesSelecionadas", json!(["React"]))
            .unwrap();
        assert!(group.errors_of("habilidadesSelecionadas").is_empty());
    }

    #[test]
    fn test_area_choices() {
        let config = area_form();
        assert_eq!(config.get("areaAtuacao").unwrap().choices.len(), 6);
        assert_eq!(config.get("nivelExperiencia").unwrap().choices.len(), 3);
    }
}
