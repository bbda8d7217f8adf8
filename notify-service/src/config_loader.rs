use billing_core::config::NotifyConfig;

pub fn load_config() -> anyhow::Result<NotifyConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false))
        .add_source(config::Environment::with_prefix("NOTIFY").separator("__"))
        .build()?;
    Ok(settings.try_deserialize()?)
}
