use tera::{Context, Tera};
use thiserror::Error;

use crate::domain::Token;

const TEMPLATE_NAME: &str = "dispense_message";
const SAMPLE_TOKEN: &str = "SAMPLE0042";

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Rendered message does not contain the token; reference it as {{{{ token }}}}")]
    MissingToken,
}

/// Renders the success message shown to whoever received a code.
///
/// The template is checked when the renderer is built, so rendering a
/// dispensed token cannot fail: a token that has already left the pool is
/// always delivered, at worst as the bare value.
pub struct MessageRenderer {
    tera: Tera,
}

impl MessageRenderer {
    pub fn new(template: &str) -> Result<Self, MessageError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, template)?;

        let renderer = Self { tera };
        let sample = renderer.try_render(SAMPLE_TOKEN)?;
        if !sample.contains(SAMPLE_TOKEN) {
            return Err(MessageError::MissingToken);
        }

        Ok(renderer)
    }

    fn try_render(&self, token: &str) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("token", token);
        self.tera.render(TEMPLATE_NAME, &context)
    }

    pub fn render(&self, token: &Token) -> String {
        match self.try_render(token.as_str()) {
            Ok(message) if message.contains(token.as_str()) => message,
            Ok(_) => {
                tracing::warn!("Rendered message dropped the token, sending it bare");
                token.to_string()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to render message, sending token bare");
                token.to_string()
            }
        }
    }
}
