//! `marquee onboard` — Initialize the config file.

use marquee_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;

    println!("Wrote default config to {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set OPENAI_API_KEY (or add it under [openai] in the config)");
    println!("  2. Set TMDB_API_ACCESS_TOKEN for now-playing listings and reviews");
    println!("  3. Set SERP_API_KEY for showtime search");
    println!("  4. Run: marquee chat");

    Ok(())
}
