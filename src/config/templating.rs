use minijinja::{Environment, UndefinedBehavior, context};

use crate::errors::Result;

/// Request path of the scheduled-changes sub-resource, keyed by the parent id.
pub const SCHEDULED_CHANGES_PATH: &str =
    "subscriptions/{{ parent_id }}/retrieve_with_scheduled_changes";

/// Templating env for request paths. Undefined variables are an error so a
/// missing partition key never produces a half-rendered URL.
pub fn build_env() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env
}

/// Render a path template against one parent partition.
pub fn render_path(env: &Environment, template: &str, parent_id: &str) -> Result<String> {
    let path = env.render_str(template, context! { parent_id => parent_id })?;
    Ok(path)
}
