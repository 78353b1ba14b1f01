use bevy_ecs::prelude::Component;

/// Where an object is in its life.
///
/// Only `Active` objects take part in moves, collisions and `update`
/// callbacks. `Dying` objects stay visible (and keep their cell unless the
/// collision detached them) until their death animation has played.
/// `TearingDown` is set while a destroy is being completed.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Active,
    Dying,
    TearingDown,
}

impl Lifecycle {
    pub fn is_active(&self) -> bool {
        matches!(self, Lifecycle::Active)
    }
}

/// Template the object was spawned from.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef(pub std::sync::Arc<str>);

impl TemplateRef {
    pub fn id(&self) -> &str {
        &self.0
    }
}
