//! `handover config`

use anyhow::Result;
use handover_coordinator::CoordinatorConfig;

/// Print the effective configuration as TOML
pub fn run(config: &CoordinatorConfig) -> Result<()> {
    print!("{}", render(config)?);
    Ok(())
}

fn render(config: &CoordinatorConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_config_round_trips() {
        let config = CoordinatorConfig::for_app("https://app.example.com/", "2.4.1");
        let rendered = render(&config).unwrap();
        assert!(rendered.contains("app_version = \"2.4.1\""));
        assert_eq!(CoordinatorConfig::from_toml_str(&rendered).unwrap(), config);
    }
}
