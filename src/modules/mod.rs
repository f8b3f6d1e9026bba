pub mod auth;
pub mod books;
pub mod reviews;
pub mod users;

use bookreview_kernel::ModuleRegistry;

use crate::state::AppState;

/// Register all feature modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, state: &AppState) -> anyhow::Result<()> {
    registry.register(auth::create_module(state.clone()))?;
    registry.register(users::create_module(state.clone()))?;
    registry.register(books::create_module(state.clone()))?;
    registry.register(reviews::create_module(state.clone()))?;
    Ok(())
}
