//! Bootstrap 5 rendering of live form groups.
//!
//! Errors render inline under each field, and only once the user has
//! interacted with it (see [`FormGroup::visible_errors`]).

use std::collections::HashMap;

use ironhtml::html;
use ironhtml::typed::Element;
use ironhtml_elements::{Div, H2, P};
use serde_json::Value;

use crate::group::{Control, FormGroup};
use crate::schema::{Choice, FieldKind, FormConfiguration, LayoutWidth};

/// Bootstrap grid class for a layout width.
pub const fn column_class(width: LayoutWidth) -> &'static str {
    match width {
        LayoutWidth::Full => "col-12",
        LayoutWidth::Half => "col-md-6",
    }
}

/// Renders one control with its label and inline errors.
///
/// `options` replaces the schema's fixed choices when it is not empty, which
/// is how dependent selects receive the options loaded for them.
pub fn render_control(control: &Control, options: &[Choice], errors: &[String]) -> String {
    let schema = control.schema();
    let id = format!("id_{}", schema.name);

    let required_marker = if schema.required { " *" } else { "" };
    let label_text = format!("{}{}", schema.label, required_marker);

    let mut class = match schema.kind {
        FieldKind::Select | FieldKind::MultiSelect => "form-select".to_string(),
        FieldKind::Radio => "form-check-input".to_string(),
        _ => "form-control".to_string(),
    };
    if !errors.is_empty() {
        class.push_str(" is-invalid");
    }

    let mut extra = String::new();
    if control.is_disabled() {
        extra.push_str(" disabled");
    }
    if schema.required {
        extra.push_str(" required");
    }

    let choices = if options.is_empty() {
        schema.choices.as_slice()
    } else {
        options
    };

    let widget_html = match schema.kind {
        FieldKind::Select | FieldKind::MultiSelect => {
            render_select(&schema.name, &id, &class, &extra, &schema.placeholder, choices, control.value())
        }
        FieldKind::Radio => render_radios(&schema.name, &class, &extra, choices, control.value()),
        FieldKind::Textarea => format!(
            r#"<textarea class="{class}" id="{id}" name="{}" placeholder="{}"{extra}>{}</textarea>"#,
            schema.name,
            html_escape(&schema.placeholder),
            html_escape(control.value().as_str().unwrap_or(""))
        ),
        FieldKind::File => format!(
            r#"<input type="file" accept="image/*" class="{class}" id="{id}" name="{}"{extra}>"#,
            schema.name
        ),
        FieldKind::List => format!(
            r#"<input type="hidden" id="{id}" name="{}" value="{}">"#,
            schema.name,
            html_escape(&control.value().to_string())
        ),
        FieldKind::Text | FieldKind::Email | FieldKind::Password => {
            let value = if schema.kind == FieldKind::Password {
                ""
            } else {
                control.value().as_str().unwrap_or("")
            };
            format!(
                r#"<input type="{}" class="{class}" id="{id}" name="{}" value="{}" placeholder="{}"{extra}>"#,
                schema.kind.input_type(),
                schema.name,
                html_escape(value),
                html_escape(&schema.placeholder)
            )
        }
    };

    let label_el = html! {
        label.for_(#id).class("form-label") { #label_text }
    };

    html! { div.class("mb-3") }
        .raw(label_el.render())
        .raw(&widget_html)
        .children(errors, |error, div: Element<Div>| {
            div.class("invalid-feedback").text(error)
        })
        .render()
}

fn render_select(
    name: &str,
    id: &str,
    class: &str,
    extra: &str,
    placeholder: &str,
    choices: &[Choice],
    value: &Value,
) -> String {
    let blank = if placeholder.is_empty() {
        "---------"
    } else {
        placeholder
    };
    let mut options = format!(r#"<option value="">{}</option>"#, html_escape(blank));
    for choice in choices {
        let selected = is_selected(value, &choice.value);
        let selected_attr = if selected { " selected" } else { "" };
        options.push_str(&format!(
            r#"<option value="{}"{selected_attr}>{}</option>"#,
            html_escape(&choice.value),
            html_escape(&choice.label)
        ));
    }
    let multiple = if value.is_array() { " multiple" } else { "" };
    format!(r#"<select class="{class}" id="{id}" name="{name}"{multiple}{extra}>{options}</select>"#)
}

fn render_radios(name: &str, class: &str, extra: &str, choices: &[Choice], value: &Value) -> String {
    choices
        .iter()
        .map(|choice| {
            let id = format!("id_{name}_{}", choice.value);
            let checked = if is_selected(value, &choice.value) {
                " checked"
            } else {
                ""
            };
            format!(
                r#"<div class="form-check"><input type="radio" class="{class}" id="{id}" name="{name}" value="{}"{checked}{extra}><label class="form-check-label" for="{id}">{}</label></div>"#,
                html_escape(&choice.value),
                html_escape(&choice.label)
            )
        })
        .collect()
}

fn is_selected(value: &Value, candidate: &str) -> bool {
    match value {
        Value::String(s) => s == candidate,
        Value::Array(items) => items.iter().any(|v| v.as_str() == Some(candidate)),
        _ => false,
    }
}

/// Renders a whole step: title, description and every field in a grid.
pub fn render_form(
    config: &FormConfiguration,
    group: &FormGroup,
    options: &HashMap<String, Vec<Choice>>,
    action: &str,
) -> String {
    let mut form = html! {
        form.action(#action).method("post")
    };

    form = form
        .child::<H2, _>(|h| h.class("mb-2").text(&config.title))
        .child::<P, _>(|p| p.class("text-muted").text(&config.description));

    let mut row = Element::<Div>::new().class("row g-3");
    for control in group.controls() {
        let dynamic = options
            .get(control.name())
            .map_or(&[][..], Vec::as_slice);
        let errors = group.visible_errors(control.name());
        let field_html = render_control(control, dynamic, &errors);
        let column = column_class(control.schema().width);
        row = row.child::<Div, _>(|d| d.class(column).raw(&field_html));
    }
    let row_html = row.render();

    form.child::<Div, _>(|d| d.raw(&row_html))
        .child::<Div, _>(|d| {
            let btn = html! {
                button.type_("submit").class("btn btn-primary") {
                    "Próximo"
                }
            };
            d.class("mt-3").raw(btn.render())
        })
        .render()
}

/// Escapes HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::FormBuilder;
    use crate::schema::FieldSchema;
    use crate::validation::{ErrorKind, ValidatorSpec};

    fn config() -> FormConfiguration {
        FormConfiguration::new("Crie seu cadastro")
            .description("Comece agora")
            .field(
                FieldSchema::new("nomeCompleto", "Nome Completo", FieldKind::Text)
                    .required()
                    .message(ErrorKind::Required, "Nome completo é obrigatório")
                    .validator(ValidatorSpec::Required),
            )
            .field(
                FieldSchema::new("estado", "Estado", FieldKind::Select)
                    .placeholder("Selecione")
                    .width(LayoutWidth::Half)
                    .choices([Choice::new("SP", "São Paulo"), Choice::new("AC", "Acre")]),
            )
    }

    #[test]
    fn test_render_control_without_errors() {
        let group = FormBuilder::new().build(&config());
        let html = render_control(group.get("nomeCompleto").unwrap(), &[], &[]);
        assert!(html.contains("form-label"));
        assert!(html.contains("Nome Completo *"));
        assert!(!html.contains("is-invalid"));
    }

    #[test]
    fn test_render_control_with_errors() {
        let mut group = FormBuilder::new().build(&config());
        group.mark_all_as_touched();
        let errors = group.visible_errors("nomeCompleto");
        let html = render_control(group.get("nomeCompleto").unwrap(), &[], &errors);
        assert!(html.contains("is-invalid"));
        assert!(html.contains("Nome completo é obrigatório"));

        let row = html.find("row g-3").unwrap();
        let submit = html.find("btn btn-primary").unwrap();
        let end = html.find("</form>").unwrap();
        assert!(html.starts_with("<form"));
        assert!(row < submit && submit < end);
    }

    #[test]
    fn test_select_uses_loaded_options() {
        let mut group = FormBuilder::new().build(&config());
        group.set_value("estado", "SP").unwrap();
        let html = render_control(group.get("estado").unwrap(), &[], &[]);
        assert!(html.contains(r#"<option value="SP" selected>São Paulo</option>"#));
        assert!(html.contains("Selecione"));

        let loaded = [Choice::new("RJ", "Rio de Janeiro")];
        let html = render_control(group.get("estado").unwrap(), &loaded, &[]);
        assert!(html.contains("Rio de Janeiro"));
        assert!(!html.contains("Acre"));
    }

    #[test]
    fn test_disabled_control() {
        let mut group = FormBuilder::new().build(&config());
        group.disable("estado").unwrap();
        let html = render_control(group.get("estado").unwrap(), &[], &[]);
        assert!(html.contains(" disabled"));
    }

    #[test]
    fn test_render_form_layout() {
        let mut group = FormBuilder::new().build(&config());
        group.mark_all_as_touched();
        let html = render_form(&config(), &group, &HashMap::new(), "/cadastro/dados-pessoais");
        assert!(html.contains("Crie seu cadastro"));
        assert!(html.contains("col-12"));
        assert!(html.contains("col-md-6"));
        assert!(html.contains("Nome completo é obrigatório"));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("\"test\""), "&quot;test&quot;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
    }
}
