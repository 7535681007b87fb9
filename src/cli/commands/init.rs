use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("✓ Config file created. Set [database].name and [youtube].api_key, then run again.");
    } else {
        println!("config.toml already exists, leaving it untouched.");
    }
    Ok(())
}
