use std::sync::Arc;

use inventory_sync::auth::InMemoryIdentityProvider;
use inventory_sync::{InventoryApp, InventoryConfig, InventoryResult};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn print_items(app: &InventoryApp) {
    for item in app.visible_items() {
        println!("  {:<12} {:<10} x{}", item.name, item.category, item.quantity);
    }
}

fn run_inmemory_demo() -> InventoryResult<()> {
    println!("== In-memory inventory demo ==");
    let provider = Arc::new(InMemoryIdentityProvider::new());
    provider.register("demo@example.com", "demo-password")?;

    let app = InventoryApp::from_config(InventoryConfig::default(), provider)?;
    app.sign_in("demo@example.com", "demo-password")?;

    app.add_item("apple", "Food", None)?;
    app.add_item("apple", "Food", None)?;
    app.add_item("cola", "Drinks", None)?;
    app.add_item("desk", "Furniture", None)?;
    println!("After adding:");
    print_items(&app);

    app.decrease_quantity("apple")?;
    app.decrease_quantity("cola")?;
    println!("After decrementing apple and cola:");
    print_items(&app);

    app.set_search_term("de");
    println!("Search \"de\":");
    print_items(&app);

    app.shutdown()
}

fn main() -> InventoryResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    run_inmemory_demo()
}
