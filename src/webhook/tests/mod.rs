//! Unit tests for the webhook module.


use crate::webhook::WebhookSecret;
use rstest::fixture;

#[fixture]
pub(super) fn secret() -> WebhookSecret {
    WebhookSecret::new("It's a Secret to Everybody").expect("non-empty secret")
}
