//! `marquee functions` — List the registered movie functions.

use marquee_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = marquee_functions::default_registry(&config);

    println!();
    println!("  Registered functions:");
    println!();

    for spec in registry.specs() {
        match registry.resolve(&spec.name) {
            Some(function) => {
                println!("  {}", spec.signature());
                println!("      {}", function.description());
            }
            // Pseudo-functions are handled by the dispatcher itself
            None => println!("  {}  (dispatcher built-in)", spec.signature()),
        }
        println!();
    }

    Ok(())
}
