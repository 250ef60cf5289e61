use crate::error::{EnrichError, Result};

pub const ENTITY_PLACEHOLDER: &str = "{entity}";

/// Substitute `entity` for every `{entity}` in `template`. Literal replacement,
/// nothing is escaped.
pub fn render(template: &str, entity: &str) -> String {
    template.replace(ENTITY_PLACEHOLDER, entity)
}

pub fn validate_template(template: &str) -> Result<()> {
    if template.trim().is_empty() {
        return Err(EnrichError::Validation("template is empty".to_string()));
    }
    if !template.contains(ENTITY_PLACEHOLDER) {
        return Err(EnrichError::Validation(format!(
            "template must contain the {ENTITY_PLACEHOLDER} placeholder: {template:?}"
        )));
    }
    Ok(())
}
